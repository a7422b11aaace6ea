//! Modal command builder.
//!
//! Consumes the token stream one line at a time. Word values are assigned
//! into a coordinate snapshot that carries forward from line to line; the
//! codes found on a line are held as pending commands and committed together
//! when the line break arrives, so axis words written after a line's motion
//! code still belong to that command.

use std::path::Path;

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use crate::command::{Command, CommandKind, Coordinate, FeedMode, Plane, Program, Units, Word, Words};
use crate::error::{GcodeError, Result};
use crate::lexer::{CodeLetter, Lexer, Token, TokenKind};

/// Highest tool number accepted by `T`.
pub const MAX_TOOL: u32 = 99;

/// Options for [`parse_program`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Log every token at trace level.
    pub trace_tokens: bool,
}

/// How a code word is treated by the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Code {
    /// Appended to the program when the line ends.
    Commit(CommandKind),
    /// Recognized, no effect on the simulation.
    Inert,
}

fn classify_g(n: u32) -> Option<Code> {
    use CommandKind as K;
    Some(match n {
        0 => Code::Commit(K::Rapid),
        1 => Code::Commit(K::Linear),
        2 => Code::Commit(K::ArcCw),
        3 => Code::Commit(K::ArcCcw),
        17 => Code::Commit(K::Plane(Plane::Xy)),
        18 => Code::Commit(K::Plane(Plane::Xz)),
        19 => Code::Commit(K::Plane(Plane::Yz)),
        20 => Code::Commit(K::Units(Units::Inch)),
        21 => Code::Commit(K::Units(Units::Millimeter)),
        90 => Code::Commit(K::Absolute),
        93 => Code::Commit(K::FeedMode(FeedMode::InverseTime)),
        94 => Code::Commit(K::FeedMode(FeedMode::PerMinute)),
        95 => Code::Commit(K::FeedMode(FeedMode::PerRevolution)),
        4 | 8 | 9 | 40..=44 | 53..=59 | 61 | 80..=89 | 96 | 97 => Code::Inert,
        _ => return None,
    })
}

fn classify_m(n: u32) -> Option<Code> {
    use CommandKind as K;
    Some(match n {
        2 | 30 => Code::Commit(K::ProgramEnd),
        3 => Code::Commit(K::SpindleOn { clockwise: true }),
        4 => Code::Commit(K::SpindleOn { clockwise: false }),
        5 => Code::Commit(K::SpindleOff),
        6 => Code::Commit(K::ToolChange),
        0 | 1 | 7..=11 | 19 | 40 | 98 | 99 => Code::Inert,
        _ => return None,
    })
}

/// Execution rank of a command within its line: settings first, then
/// motion, then program end.
fn rank(kind: CommandKind) -> u8 {
    match kind {
        CommandKind::ProgramEnd => 2,
        k if k.is_motion() => 1,
        _ => 0,
    }
}

fn is_numeric_text(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '-')
}

/// Parse the value of an axis or parameter word.
fn word_value(token: &Token) -> Result<f64> {
    let suffix = token.suffix();
    let fail = |message: &str| GcodeError::argument(&token.text, token.line, token.col, message);
    if suffix.is_empty() {
        return Err(fail("missing value"));
    }
    if !is_numeric_text(suffix) {
        return Err(fail("malformed number"));
    }
    match suffix.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(fail("malformed number")),
    }
}

/// Parse the number of a G or M code. Fractional codes (`G17.1`) are
/// well-formed but unsupported.
fn code_number(token: &Token) -> Result<u32> {
    let suffix = token.suffix();
    if suffix.is_empty() {
        return Err(GcodeError::argument(
            &token.text,
            token.line,
            token.col,
            "missing code number",
        ));
    }
    if let Ok(n) = suffix.parse::<u32>() {
        return Ok(n);
    }
    if is_numeric_text(suffix) && suffix.parse::<f64>().is_ok() {
        return Err(GcodeError::unknown_code(&token.text, token.line, token.col));
    }
    Err(GcodeError::argument(
        &token.text,
        token.line,
        token.col,
        "malformed code number",
    ))
}

/// Where the builder is relative to the `%` program delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    /// No `%` seen yet.
    None,
    /// Opened on the given line.
    Open(usize),
    /// Closed; the rest of the input is ignored.
    Closed,
}

/// Builds a [`Program`] from tokens.
#[derive(Debug)]
pub struct CommandBuilder {
    commands: Vec<Command>,
    coords: Coordinate,
    /// Last motion code, repeated by lines that carry only axis words.
    motion: Option<(CommandKind, Token)>,
    pending: Vec<(CommandKind, Token)>,
    line_words: Words,
    /// First axis word of the current line, for modal motion positions.
    first_axis: Option<Token>,
    /// Feed word of the current line.
    feed: Option<Token>,
    delimiter: Delimiter,
    token_count: usize,
}

impl Default for CommandBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            coords: Coordinate::new(),
            motion: None,
            pending: Vec::new(),
            line_words: Words::empty(),
            first_axis: None,
            feed: None,
            delimiter: Delimiter::None,
            token_count: 0,
        }
    }

    /// True once a closing `%` has been consumed.
    pub fn is_closed(&self) -> bool {
        self.delimiter == Delimiter::Closed
    }

    /// Feed one token.
    pub fn push(&mut self, token: &Token) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }
        self.token_count += 1;

        match token.kind {
            TokenKind::LineBreak => self.finish_line(),
            TokenKind::Comment | TokenKind::Auxiliary(_) => {}
            TokenKind::Axis(word) | TokenKind::Parameter(word) => {
                let value = word_value(token)?;
                self.coords.set(word, value);
                self.line_words.insert(word);
                if word.is_axis() && self.first_axis.is_none() {
                    self.first_axis = Some(token.clone());
                }
                if word == Word::F {
                    self.feed = Some(token.clone());
                }
            }
            TokenKind::Code(letter) => self.push_code(letter, token)?,
            TokenKind::Percent => self.push_percent(token)?,
            TokenKind::Number => {
                return Err(GcodeError::argument(
                    &token.text,
                    token.line,
                    token.col,
                    "number without a word letter",
                ));
            }
            TokenKind::Unknown => {
                return Err(GcodeError::unknown_code(&token.text, token.line, token.col));
            }
        }
        Ok(())
    }

    fn push_code(&mut self, letter: CodeLetter, token: &Token) -> Result<()> {
        let code = match letter {
            CodeLetter::N | CodeLetter::O => return Ok(()),
            CodeLetter::G => classify_g(code_number(token)?),
            CodeLetter::M => classify_m(code_number(token)?),
            CodeLetter::T => {
                let suffix = token.suffix();
                if suffix.is_empty() || !is_numeric_text(suffix) {
                    return Err(GcodeError::argument(
                        &token.text,
                        token.line,
                        token.col,
                        "malformed tool number",
                    ));
                }
                // Non-integer suffixes are reported by the simulator.
                match suffix.parse::<u32>() {
                    Ok(n) if n > MAX_TOOL => None,
                    _ => Some(Code::Commit(CommandKind::ToolSelect)),
                }
            }
            CodeLetter::S => {
                let suffix = token.suffix();
                if suffix.is_empty() || !is_numeric_text(suffix) {
                    return Err(GcodeError::argument(
                        &token.text,
                        token.line,
                        token.col,
                        "malformed spindle speed",
                    ));
                }
                Some(Code::Commit(CommandKind::SpindleSpeed))
            }
        };

        match code {
            Some(Code::Commit(kind)) => {
                self.pending.push((kind, token.clone()));
                Ok(())
            }
            Some(Code::Inert) => {
                trace!("line {}: {} has no effect", token.line, token.text);
                Ok(())
            }
            None => Err(GcodeError::unknown_code(&token.text, token.line, token.col)),
        }
    }

    fn push_percent(&mut self, token: &Token) -> Result<()> {
        match self.delimiter {
            Delimiter::None if self.commands.is_empty() && self.pending.is_empty() => {
                self.delimiter = Delimiter::Open(token.line);
            }
            Delimiter::Open(_) => {
                self.finish_line();
                self.delimiter = Delimiter::Closed;
                debug!("program closed by % at line {}", token.line);
            }
            _ => return Err(GcodeError::UnbalancedDelimiter { line: token.line }),
        }
        Ok(())
    }

    /// Commit everything pending on the current line.
    fn finish_line(&mut self) {
        let has_motion = self.pending.iter().any(|(k, _)| k.is_motion());
        if !has_motion && self.line_words.has_axis() {
            match (&self.motion, &self.first_axis) {
                (Some((kind, carried)), Some(axis)) => {
                    let token = Token {
                        line: axis.line,
                        col: axis.col,
                        ..carried.clone()
                    };
                    self.pending.push((*kind, token));
                }
                _ => warn!(
                    "line {}: axis words without an active motion mode are ignored",
                    self.first_axis.as_ref().map_or(0, |t| t.line)
                ),
            }
        }

        // A feed given on a line of its own still sets the modal rate.
        if self.pending.is_empty() {
            if let Some(feed) = self.feed.take() {
                self.pending.push((CommandKind::NoOp, feed));
            }
        }

        self.pending.sort_by_key(|(kind, _)| rank(*kind));
        for (kind, token) in self.pending.drain(..) {
            if kind.is_motion() {
                self.motion = Some((kind, token.clone()));
            }
            self.commands.push(Command {
                kind,
                token,
                coords: self.coords,
                words: self.line_words,
            });
        }
        self.line_words = Words::empty();
        self.first_axis = None;
        self.feed = None;
    }

    /// Finish building. Fails if a `%` was opened but never closed.
    pub fn finish(mut self) -> Result<Program> {
        if !self.pending.is_empty() || self.line_words.has_axis() || self.feed.is_some() {
            self.finish_line();
        }
        if let Delimiter::Open(line) = self.delimiter {
            return Err(GcodeError::UnbalancedDelimiter { line });
        }
        Ok(Program::new(self.commands, self.token_count))
    }
}

/// Tokenize and build a program from source text.
pub fn parse_program(source: &str, options: &ParseOptions) -> Result<Program> {
    let tokens = Lexer::new(options.trace_tokens).tokenize(source)?;
    let mut builder = CommandBuilder::new();
    for token in &tokens {
        builder.push(token)?;
        if builder.is_closed() {
            break;
        }
    }
    let program = builder.finish()?;
    debug!(
        "built {} commands from {} tokens",
        program.len(),
        program.token_count()
    );
    Ok(program)
}

/// Read and parse a program file.
pub fn parse_file(path: impl AsRef<Path>, options: &ParseOptions) -> Result<Program> {
    let source = std::fs::read_to_string(path)?;
    parse_program(&source, options)
}
