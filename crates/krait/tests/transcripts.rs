//! Replays interactive-session transcripts against a persistent session.
//!
//! Fixture format, one file per area under `tests/transcripts/`:
//! - `>>> ` begins a chunk, `... ` continues it (whitespace after the prefix
//!   is preserved, so indented bodies survive).
//! - The lines that follow a chunk, up to the next chunk, blank line, or
//!   `#` comment, are the expected output: anything `print()`ed, then the
//!   repr of the last top-level expression statement or the rendered error.
//! - A chunk with no trailing lines expects no output.

use krait::{CollectStringPrint, ReplSession};
use pretty_assertions::assert_eq;

fn run_transcript(name: &str, text: &str) {
    let mut session = ReplSession::new(name);
    let mut lines = text.lines().enumerate().peekable();
    while let Some((idx, line)) = lines.next() {
        let Some(first) = line.strip_prefix(">>> ") else {
            continue;
        };
        let chunk_line = idx + 1;
        let mut source = first.to_owned();
        while let Some((_, next)) = lines.peek() {
            if let Some(continuation) = next.strip_prefix("... ") {
                source.push('\n');
                source.push_str(continuation);
                lines.next();
            } else if *next == "..." {
                source.push('\n');
                lines.next();
            } else {
                break;
            }
        }

        let mut expected: Vec<&str> = Vec::new();
        while let Some((_, next)) = lines.peek() {
            if next.starts_with(">>> ") || next.is_empty() || next.starts_with('#') {
                break;
            }
            expected.push(*next);
            lines.next();
        }

        let mut print = CollectStringPrint::new();
        let mut actual: Vec<String> = Vec::new();
        match session.execute(&source, &mut print) {
            Ok(result) => {
                actual.extend(print.output().lines().map(str::to_owned));
                if let Some(repr) = result {
                    actual.push(repr);
                }
            }
            Err(err) => {
                actual.extend(print.output().lines().map(str::to_owned));
                actual.push(err.to_string());
            }
        }
        assert_eq!(
            actual.join("\n"),
            expected.join("\n"),
            "{name}: chunk starting at line {chunk_line}:\n{source}"
        );
    }
}

macro_rules! transcript_test {
    ($test_name:ident, $file:literal) => {
        #[test]
        fn $test_name() {
            run_transcript($file, include_str!(concat!("transcripts/", $file)));
        }
    };
}

transcript_test!(basics, "basics.txt");
transcript_test!(control_flow, "control_flow.txt");
transcript_test!(collections, "collections.txt");
transcript_test!(classes, "classes.txt");
transcript_test!(errors, "errors.txt");
