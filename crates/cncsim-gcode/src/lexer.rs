//! Line-oriented program lexer.
//!
//! Each physical line is upper-cased and scanned character by character:
//! - Letters and digits accumulate into the current word (`G01`, `X-10.5`)
//! - A `-` or `.` is accepted inside a word, including at its start
//! - Whitespace ends the current word
//! - `(` starts a comment that runs to the matching `)`
//! - `;` starts a comment that runs to the end of the line
//! - `%` is the program delimiter
//!
//! After each line a [`TokenKind::LineBreak`] token is emitted so the command
//! builder can tell end-of-line from end-of-word.

use log::{trace, warn};

use crate::command::Word;
use crate::error::{GcodeError, Result};

/// Letters that start a code word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeLetter {
    /// Preparatory / motion codes.
    G,
    /// Miscellaneous codes.
    M,
    /// Tool select.
    T,
    /// Spindle speed.
    S,
    /// Sequence number (ignored).
    N,
    /// Program number (ignored).
    O,
}

/// Classification of a token, derived from its first character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A bare numeric literal (`10`, `-2.5`).
    Number,
    /// A `( ... )` or `; ...` comment.
    Comment,
    /// X, Y, Z, A, B or C.
    Axis(Word),
    /// F, H, I, J, K or R.
    Parameter(Word),
    /// G, M, T, S, N or O.
    Code(CodeLetter),
    /// P, Q, L, D or E: accepted and ignored.
    Auxiliary(char),
    /// `%` program delimiter.
    Percent,
    /// End of a physical line.
    LineBreak,
    /// Anything else.
    Unknown,
}

impl TokenKind {
    /// Derive the kind from the first character of a token's text.
    pub fn from_text(text: &str) -> Self {
        let Some(first) = text.chars().next() else {
            return TokenKind::LineBreak;
        };
        match first {
            '(' | ';' => TokenKind::Comment,
            '%' => TokenKind::Percent,
            '0'..='9' | '-' | '.' => TokenKind::Number,
            'G' => TokenKind::Code(CodeLetter::G),
            'M' => TokenKind::Code(CodeLetter::M),
            'T' => TokenKind::Code(CodeLetter::T),
            'S' => TokenKind::Code(CodeLetter::S),
            'N' => TokenKind::Code(CodeLetter::N),
            'O' => TokenKind::Code(CodeLetter::O),
            'P' | 'Q' | 'L' | 'D' | 'E' => TokenKind::Auxiliary(first),
            c => match Word::from_letter(c) {
                Some(w) if w.is_axis() => TokenKind::Axis(w),
                Some(w) => TokenKind::Parameter(w),
                None => TokenKind::Unknown,
            },
        }
    }
}

/// A classified token with its source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Raw (upper-cased) text; empty for line breaks.
    pub text: String,
    /// Token kind.
    pub kind: TokenKind,
    /// Line number (1-indexed).
    pub line: usize,
    /// Column of the first character (1-indexed).
    pub col: usize,
}

impl Token {
    /// Create a token, deriving its kind from the text.
    pub fn new(text: impl Into<String>, line: usize, col: usize) -> Self {
        let text = text.into();
        let kind = TokenKind::from_text(&text);
        Self {
            text,
            kind,
            line,
            col,
        }
    }

    fn line_break(line: usize, col: usize) -> Self {
        Self {
            text: String::new(),
            kind: TokenKind::LineBreak,
            line,
            col,
        }
    }

    /// Text after the leading letter (`"-10.5"` for `X-10.5`).
    pub fn suffix(&self) -> &str {
        let mut chars = self.text.chars();
        chars.next();
        chars.as_str()
    }
}

/// Character classes used while scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Whitespace,
    Digit,
    Letter,
    Punct,
    Symbol,
    Unknown,
}

fn char_class(c: char) -> CharClass {
    if c.is_whitespace() {
        CharClass::Whitespace
    } else if c.is_ascii_digit() {
        CharClass::Digit
    } else if c.is_alphabetic() {
        CharClass::Letter
    } else if matches!(c, '$' | '+' | '<' | '=' | '>' | '^' | '`' | '|' | '~') {
        CharClass::Symbol
    } else if c.is_ascii_punctuation() {
        CharClass::Punct
    } else {
        CharClass::Unknown
    }
}

/// Lexer for instruction programs.
#[derive(Debug, Clone, Default)]
pub struct Lexer {
    trace_tokens: bool,
}

/// Per-line scanning state.
struct LineScan<'a> {
    line: usize,
    tokens: &'a mut Vec<Token>,
    word: String,
    word_col: usize,
    trace: bool,
}

impl LineScan<'_> {
    fn push_char(&mut self, c: char, col: usize) {
        if self.word.is_empty() {
            self.word_col = col;
        }
        self.word.push(c);
    }

    fn emit(&mut self, text: String, col: usize) {
        let token = Token::new(text, self.line, col);
        if self.trace {
            trace!(
                "token {:?} {:?} at {}:{}",
                token.kind,
                token.text,
                token.line,
                token.col
            );
        }
        self.tokens.push(token);
    }

    fn flush(&mut self) {
        if !self.word.is_empty() {
            let text = std::mem::take(&mut self.word);
            self.emit(text, self.word_col);
        }
    }
}

impl Lexer {
    /// Create a lexer. With `trace_tokens` every token is logged at trace level.
    pub fn new(trace_tokens: bool) -> Self {
        Self { trace_tokens }
    }

    /// Tokenize a complete program, line by line.
    pub fn tokenize(&self, source: &str) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        for (i, line) in source.lines().enumerate() {
            self.tokenize_line(line, i + 1, &mut tokens)?;
        }
        Ok(tokens)
    }

    /// Tokenize one physical line, appending to `tokens`.
    ///
    /// Always finishes with a line-break token on success.
    pub fn tokenize_line(&self, line: &str, line_no: usize, tokens: &mut Vec<Token>) -> Result<()> {
        let upper = line.to_uppercase();
        let mut scan = LineScan {
            line: line_no,
            tokens,
            word: String::new(),
            word_col: 0,
            trace: self.trace_tokens,
        };

        // Open comment: text so far, start column, nesting depth.
        let mut comment: Option<(String, usize, usize)> = None;
        let mut last_col = 0;

        for (i, c) in upper.chars().enumerate() {
            let col = i + 1;
            last_col = col;

            if let Some((text, start, depth)) = comment.as_mut() {
                text.push(c);
                match c {
                    '(' => *depth += 1,
                    ')' => {
                        *depth -= 1;
                        if *depth == 0 {
                            let (text, start) = (std::mem::take(text), *start);
                            comment = None;
                            scan.emit(text, start);
                        }
                    }
                    _ => {}
                }
                continue;
            }

            match char_class(c) {
                CharClass::Whitespace => scan.flush(),
                CharClass::Digit | CharClass::Letter => scan.push_char(c, col),
                CharClass::Punct => match c {
                    '-' | '.' => scan.push_char(c, col),
                    '(' => {
                        scan.flush();
                        comment = Some((String::from("("), col, 1));
                    }
                    ';' => {
                        scan.flush();
                        let rest: String = upper.chars().skip(i).collect();
                        scan.emit(rest, col);
                        last_col = upper.chars().count();
                        break;
                    }
                    '%' => {
                        scan.flush();
                        scan.emit(String::from("%"), col);
                    }
                    _ => {
                        return Err(GcodeError::lex(
                            line_no,
                            col,
                            format!("unexpected punctuation '{c}'"),
                        ));
                    }
                },
                CharClass::Symbol => {
                    return Err(GcodeError::lex(
                        line_no,
                        col,
                        format!("unexpected symbol '{c}'"),
                    ));
                }
                CharClass::Unknown => {
                    return Err(GcodeError::lex(
                        line_no,
                        col,
                        format!("unrecognized character {c:?}"),
                    ));
                }
            }
        }

        if let Some((text, start, _)) = comment.take() {
            warn!("unterminated comment at line {line_no}, column {start}");
            scan.emit(text, start);
        }
        scan.flush();
        scan.tokens.push(Token::line_break(line_no, last_col + 1));
        Ok(())
    }
}
