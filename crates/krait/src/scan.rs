use num_bigint::BigInt;

use crate::parse::ParseError;

/// Reserved words recognized by the scanner.
///
/// `True`, `False`, and `None` are deliberately absent: they tokenize as
/// names and resolve through the root environment. `del` is a soft keyword
/// handled by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Keyword {
    If,
    Elif,
    Else,
    While,
    For,
    In,
    Break,
    Continue,
    Return,
    Def,
    Class,
    Pass,
    And,
    Or,
    Not,
    Try,
    Except,
    Finally,
    Raise,
    Assert,
    Import,
    From,
    As,
    Global,
}

/// Operator and punctuation tokens, longest-match first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Punct {
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    AmpAssign,
    PipeAssign,
    Amp,
    Pipe,
    Tilde,
    Comma,
    Colon,
    Semi,
    Dot,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Name(String),
    Keyword(Keyword),
    Int(i64),
    /// Integer literal exceeding the i64 range.
    LongInt(BigInt),
    Float(f64),
    /// Decoded string value; adjacent literals are already concatenated.
    Str(String),
    Op(Punct),
    Newline,
    Indent,
    Dedent,
    EndMarker,
}

/// A token with its raw source text and starting line.
///
/// The lexeme is kept verbatim (string literals include their quotes) so
/// syntax errors can echo the offending token as written.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: u32,
}

impl Token {
    /// How this token reads in an `expected ... but found ...` diagnostic.
    pub(crate) fn found_display(&self) -> String {
        match &self.kind {
            TokenKind::Newline => "NEWLINE".to_owned(),
            TokenKind::Indent => "INDENT".to_owned(),
            TokenKind::Dedent => "DEDENT".to_owned(),
            TokenKind::EndMarker => "EOF".to_owned(),
            _ => self.lexeme.clone(),
        }
    }
}

fn keyword(name: &str) -> Option<Keyword> {
    let kw = match name {
        "if" => Keyword::If,
        "elif" => Keyword::Elif,
        "else" => Keyword::Else,
        "while" => Keyword::While,
        "for" => Keyword::For,
        "in" => Keyword::In,
        "break" => Keyword::Break,
        "continue" => Keyword::Continue,
        "return" => Keyword::Return,
        "def" => Keyword::Def,
        "class" => Keyword::Class,
        "pass" => Keyword::Pass,
        "and" => Keyword::And,
        "or" => Keyword::Or,
        "not" => Keyword::Not,
        "try" => Keyword::Try,
        "except" => Keyword::Except,
        "finally" => Keyword::Finally,
        "raise" => Keyword::Raise,
        "assert" => Keyword::Assert,
        "import" => Keyword::Import,
        "from" => Keyword::From,
        "as" => Keyword::As,
        "global" => Keyword::Global,
        _ => return None,
    };
    Some(kw)
}

/// Tokenizes a source chunk into a stream ending in `EndMarker`.
///
/// Owns the indentation stack and bracket-depth counter: block structure is
/// emitted as `Indent`/`Dedent` tokens, physical newlines inside brackets
/// produce no `Newline`, and a trailing backslash joins lines. Blank and
/// comment-only lines are structurally invisible.
pub(crate) fn scan(source: &str) -> Result<Vec<Token>, ParseError> {
    Scanner::new(source).run()
}

struct Scanner<'a> {
    lines: Vec<&'a str>,
    tokens: Vec<Token>,
    /// Stack of indentation column widths; always starts with 0.
    indents: Vec<usize>,
    /// Net count of open brackets; newlines are suppressed while positive.
    bracket_depth: usize,
    /// Previous physical line ended with a joining backslash.
    joined: bool,
    line_no: u32,
}

impl<'a> Scanner<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines().collect(),
            tokens: Vec::new(),
            indents: vec![0],
            bracket_depth: 0,
            joined: false,
            line_no: 1,
        }
    }

    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        for idx in 0..self.lines.len() {
            self.line_no = u32::try_from(idx + 1).unwrap_or(u32::MAX);
            self.scan_line(self.lines[idx])?;
        }
        let last_line = u32::try_from(self.lines.len().max(1)).unwrap_or(u32::MAX);
        if self.bracket_depth > 0 || self.joined {
            return Err(ParseError::message("unexpected end of input", last_line));
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(TokenKind::Dedent, String::new(), last_line);
        }
        self.push(TokenKind::EndMarker, String::new(), last_line);
        Ok(self.tokens)
    }

    fn push(&mut self, kind: TokenKind, lexeme: String, line: u32) {
        self.tokens.push(Token { kind, lexeme, line });
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::message(message, self.line_no)
    }

    fn scan_line(&mut self, line: &str) -> Result<(), ParseError> {
        let chars: Vec<char> = line.chars().collect();
        let mut pos = 0;

        if self.bracket_depth == 0 && !self.joined {
            // Measure leading whitespace as a column count; tabs expand to
            // the next multiple of 8.
            let mut col = 0usize;
            while pos < chars.len() {
                match chars[pos] {
                    ' ' => col += 1,
                    '\t' => col = (col / 8 + 1) * 8,
                    _ => break,
                }
                pos += 1;
            }
            // Blank and comment-only lines carry no structure at all.
            if pos >= chars.len() || chars[pos] == '#' {
                return Ok(());
            }
            let top = *self.indents.last().unwrap_or(&0);
            if col > top {
                self.indents.push(col);
                self.push(TokenKind::Indent, String::new(), self.line_no);
            } else if col < top {
                while col < *self.indents.last().unwrap_or(&0) {
                    self.indents.pop();
                    self.push(TokenKind::Dedent, String::new(), self.line_no);
                }
                if col != *self.indents.last().unwrap_or(&0) {
                    return Err(self.error("unindent does not match any outer indentation level"));
                }
            }
        }
        self.joined = false;

        let mut backslash_join = false;
        while pos < chars.len() {
            let c = chars[pos];
            match c {
                ' ' | '\t' => pos += 1,
                '#' => break,
                '\\' if pos + 1 == chars.len() => {
                    backslash_join = true;
                    pos += 1;
                }
                '\'' | '"' => pos = self.scan_string(&chars, pos)?,
                '0'..='9' => pos = self.scan_number(&chars, pos)?,
                c if c.is_ascii_alphabetic() || c == '_' => pos = self.scan_name(&chars, pos),
                _ => pos = self.scan_operator(&chars, pos)?,
            }
        }

        if backslash_join {
            self.joined = true;
        } else if self.bracket_depth == 0 {
            self.push(TokenKind::Newline, String::new(), self.line_no);
        }
        Ok(())
    }

    fn scan_string(&mut self, chars: &[char], start: usize) -> Result<usize, ParseError> {
        let quote = chars[start];
        let mut pos = start + 1;
        let mut value = String::new();
        loop {
            let Some(&c) = chars.get(pos) else {
                return Err(self.error("unterminated string literal"));
            };
            if c == quote {
                pos += 1;
                break;
            }
            if c == '\\' {
                let Some(&escape) = chars.get(pos + 1) else {
                    return Err(self.error("unterminated string literal"));
                };
                let decoded = match escape {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '\\' => '\\',
                    '\'' => '\'',
                    '"' => '"',
                    other => return Err(self.error(format!("invalid escape sequence '\\{other}'"))),
                };
                value.push(decoded);
                pos += 2;
            } else {
                value.push(c);
                pos += 1;
            }
        }
        let lexeme: String = chars[start..pos].iter().collect();
        // Adjacent string literals concatenate at lex time: `"a" "b"` -> "ab".
        if let Some(last) = self.tokens.last_mut()
            && let TokenKind::Str(existing) = &mut last.kind
        {
            existing.push_str(&value);
            last.lexeme.push(' ');
            last.lexeme.push_str(&lexeme);
            return Ok(pos);
        }
        self.push(TokenKind::Str(value), lexeme, self.line_no);
        Ok(pos)
    }

    fn scan_number(&mut self, chars: &[char], start: usize) -> Result<usize, ParseError> {
        let mut pos = start;
        while pos < chars.len() && chars[pos].is_ascii_digit() {
            pos += 1;
        }
        // A digit run followed by `.` and more digits is a float.
        let is_float = chars.get(pos) == Some(&'.') && chars.get(pos + 1).is_some_and(char::is_ascii_digit);
        if is_float {
            pos += 1;
            while pos < chars.len() && chars[pos].is_ascii_digit() {
                pos += 1;
            }
        }
        let lexeme: String = chars[start..pos].iter().collect();
        let kind = if is_float {
            let value: f64 = lexeme
                .parse()
                .map_err(|_| self.error(format!("invalid number literal '{lexeme}'")))?;
            TokenKind::Float(value)
        } else if let Ok(value) = lexeme.parse::<i64>() {
            TokenKind::Int(value)
        } else {
            let value: BigInt = lexeme
                .parse()
                .map_err(|_| self.error(format!("invalid number literal '{lexeme}'")))?;
            TokenKind::LongInt(value)
        };
        self.push(kind, lexeme, self.line_no);
        Ok(pos)
    }

    fn scan_name(&mut self, chars: &[char], start: usize) -> usize {
        let mut pos = start;
        while pos < chars.len() && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_') {
            pos += 1;
        }
        let lexeme: String = chars[start..pos].iter().collect();
        let kind = match keyword(&lexeme) {
            Some(kw) => TokenKind::Keyword(kw),
            None => TokenKind::Name(lexeme.clone()),
        };
        self.push(kind, lexeme, self.line_no);
        pos
    }

    fn scan_operator(&mut self, chars: &[char], start: usize) -> Result<usize, ParseError> {
        // Two-character operators take precedence over their prefixes.
        if start + 1 < chars.len() {
            let pair: String = chars[start..start + 2].iter().collect();
            let two = match pair.as_str() {
                "==" => Some(Punct::EqEq),
                "!=" => Some(Punct::NotEq),
                "<=" => Some(Punct::LtE),
                ">=" => Some(Punct::GtE),
                "+=" => Some(Punct::PlusAssign),
                "-=" => Some(Punct::MinusAssign),
                "*=" => Some(Punct::StarAssign),
                "/=" => Some(Punct::SlashAssign),
                "%=" => Some(Punct::PercentAssign),
                "&=" => Some(Punct::AmpAssign),
                "|=" => Some(Punct::PipeAssign),
                _ => None,
            };
            if let Some(op) = two {
                self.push(TokenKind::Op(op), pair, self.line_no);
                return Ok(start + 2);
            }
        }
        let c = chars[start];
        let op = match c {
            '+' => Punct::Plus,
            '-' => Punct::Minus,
            '*' => Punct::Star,
            '/' => Punct::Slash,
            '%' => Punct::Percent,
            '<' => Punct::Lt,
            '>' => Punct::Gt,
            '=' => Punct::Assign,
            '&' => Punct::Amp,
            '|' => Punct::Pipe,
            '~' => Punct::Tilde,
            ',' => Punct::Comma,
            ':' => Punct::Colon,
            ';' => Punct::Semi,
            '.' => Punct::Dot,
            '(' => Punct::LParen,
            '[' => Punct::LBracket,
            '{' => Punct::LBrace,
            ')' => Punct::RParen,
            ']' => Punct::RBracket,
            '}' => Punct::RBrace,
            other => return Err(self.error(format!("unexpected character '{other}'"))),
        };
        match op {
            Punct::LParen | Punct::LBracket | Punct::LBrace => self.bracket_depth += 1,
            Punct::RParen | Punct::RBracket | Punct::RBrace => {
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
            }
            _ => {}
        }
        self.push(TokenKind::Op(op), c.to_string(), self.line_no);
        Ok(start + 1)
    }
}

/// Reports whether a source chunk forms a complete statement.
///
/// A chunk needs continuation when the last logical line ends with a `:`
/// (compound header), the bracket depth is positive, or the line ends with a
/// joining backslash. This is the scanner-side half of the interactive
/// driver's read loop.
#[must_use]
pub fn chunk_is_complete(source: &str) -> bool {
    if source.trim_end().ends_with('\\') {
        return false;
    }

    // Count bracket depth, skipping string literals and comments, and keep
    // the comment-stripped text of the last physical line.
    let mut depth = 0i64;
    let mut string_quote: Option<char> = None;
    let mut escaped = false;
    let mut in_comment = false;
    let mut code_line = String::new();
    for c in source.chars() {
        if c == '\n' {
            string_quote = None;
            in_comment = false;
            code_line.clear();
            continue;
        }
        if in_comment {
            continue;
        }
        if let Some(quote) = string_quote {
            code_line.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == quote {
                string_quote = None;
            }
            continue;
        }
        if c == '#' {
            in_comment = true;
            continue;
        }
        code_line.push(c);
        match c {
            '\'' | '"' => string_quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            _ => {}
        }
    }
    if depth > 0 {
        return false;
    }

    // A compound header keeps the chunk open for its suite.
    !code_line.trim_end().ends_with(':')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        scan(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn block_structure_emits_indent_and_dedent() {
        let kinds = kinds("while a:\n    b\nc");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Keyword(Keyword::While),
                TokenKind::Name("a".to_owned()),
                TokenKind::Op(Punct::Colon),
                TokenKind::Newline,
                TokenKind::Indent,
                TokenKind::Name("b".to_owned()),
                TokenKind::Newline,
                TokenKind::Dedent,
                TokenKind::Name("c".to_owned()),
                TokenKind::Newline,
                TokenKind::EndMarker,
            ]
        );
    }

    #[test]
    fn scanning_twice_is_deterministic() {
        let source = "def f(x=2):\n    return x + 1\nf(3)";
        assert_eq!(scan(source).unwrap(), scan(source).unwrap());
    }

    #[test]
    fn newlines_are_suppressed_inside_brackets() {
        let kinds = kinds("a = [1,\n     2]");
        assert!(!kinds[..kinds.len() - 2].contains(&TokenKind::Newline));
        assert_eq!(kinds[kinds.len() - 2], TokenKind::Newline);
    }

    #[test]
    fn adjacent_string_literals_concatenate() {
        assert_eq!(
            kinds("\"a\" 'b'"),
            vec![
                TokenKind::Str("ab".to_owned()),
                TokenKind::Newline,
                TokenKind::EndMarker,
            ]
        );
    }

    #[test]
    fn string_escapes_decode() {
        assert_eq!(
            kinds(r#""\n\t\\\'""#),
            vec![
                TokenKind::Str("\n\t\\'".to_owned()),
                TokenKind::Newline,
                TokenKind::EndMarker,
            ]
        );
    }

    #[test]
    fn string_lexeme_keeps_quotes() {
        let tokens = scan("\"A\"").unwrap();
        assert_eq!(tokens[0].lexeme, "\"A\"");
        assert_eq!(tokens[0].found_display(), "\"A\"");
    }

    #[test]
    fn tabs_expand_to_multiples_of_eight() {
        // A tab and eight spaces indent to the same column, so the second
        // body line produces no extra structure tokens.
        let kinds = kinds("if a:\n\tb\n        c");
        let dedents = kinds.iter().filter(|k| **k == TokenKind::Dedent).count();
        let indents = kinds.iter().filter(|k| **k == TokenKind::Indent).count();
        assert_eq!((indents, dedents), (1, 1));
    }

    #[test]
    fn long_integer_literals_lex_as_bigint() {
        let tokens = scan("15511210043330985984000000").unwrap();
        assert!(matches!(tokens[0].kind, TokenKind::LongInt(_)));
    }

    #[test]
    fn comment_only_lines_are_invisible() {
        assert_eq!(
            kinds("a\n# comment\nb"),
            vec![
                TokenKind::Name("a".to_owned()),
                TokenKind::Newline,
                TokenKind::Name("b".to_owned()),
                TokenKind::Newline,
                TokenKind::EndMarker,
            ]
        );
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = scan("'abc").unwrap_err();
        assert_eq!(err.to_string(), "unterminated string literal at line 1");
    }

    #[test]
    fn bad_escape_is_an_error() {
        let err = scan(r"'\q'").unwrap_err();
        assert_eq!(err.to_string(), "invalid escape sequence '\\q' at line 1");
    }

    #[test]
    fn inconsistent_dedent_is_an_error() {
        let err = scan("if a:\n        b\n    c").unwrap_err();
        assert_eq!(
            err.to_string(),
            "unindent does not match any outer indentation level at line 3"
        );
    }

    #[test]
    fn chunk_completion_follows_continuation_rules() {
        assert!(chunk_is_complete("a = 1"));
        assert!(chunk_is_complete("while a < 3:\n    a = a + 1"));
        assert!(!chunk_is_complete("while a < 3:"));
        assert!(!chunk_is_complete("a = [1,"));
        assert!(!chunk_is_complete("a = 1 + \\"));
        assert!(chunk_is_complete("a = ':'"));
    }
}
