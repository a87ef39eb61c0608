use std::{
    io::{self, Write},
    process::ExitCode,
};

use krait::{ReplSession, StdPrint};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        // File execution mode: the whole file runs as one chunk.
        let path = &args[1];
        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                eprintln!("Error reading {path}: {err}");
                return ExitCode::FAILURE;
            }
        };
        let mut session = ReplSession::new(path);
        match session.execute(&source, &mut StdPrint) {
            Ok(Some(repr)) => println!("{repr}"),
            Ok(None) => {}
            Err(err) => {
                eprintln!("{err}");
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    // Interactive mode.
    let mut session = ReplSession::new("<stdin>");
    let mut source = String::new();

    loop {
        let prompt = if source.is_empty() { ">>> " } else { "... " };
        let Some(line) = read_line(prompt) else {
            println!();
            break;
        };

        if source.is_empty() {
            if line.trim().is_empty() {
                continue;
            }
            source.push_str(&line);
        } else if line.trim().is_empty() {
            // A blank line ends an open block.
            run_chunk(&mut session, &source);
            source.clear();
            continue;
        } else {
            source.push('\n');
            source.push_str(&line);
        }

        if needs_more_input(&source) {
            continue;
        }
        run_chunk(&mut session, &source);
        source.clear();
    }

    ExitCode::SUCCESS
}

fn run_chunk(session: &mut ReplSession, source: &str) {
    match session.execute(source, &mut StdPrint) {
        Ok(Some(repr)) => println!("{repr}"),
        Ok(None) => {}
        Err(err) => eprintln!("{err}"),
    }
}

/// Multiline detector: an incomplete chunk (open bracket, trailing `:` or
/// backslash) always continues, and an opened block stays open until a blank
/// line ends it.
fn needs_more_input(source: &str) -> bool {
    if !krait::chunk_is_complete(source) {
        return true;
    }
    source.lines().any(|line| line.trim_end().ends_with(':'))
}

/// Reads one line from stdin after printing a prompt.
///
/// Returns `None` on EOF (Ctrl+D).
fn read_line(prompt: &str) -> Option<String> {
    print!("{prompt}");
    if io::stdout().flush().is_err() {
        return None;
    }
    let mut input = String::new();
    let read = io::stdin().read_line(&mut input).ok()?;
    if read == 0 {
        return None;
    }
    Some(input.trim_end_matches(['\r', '\n']).to_owned())
}
