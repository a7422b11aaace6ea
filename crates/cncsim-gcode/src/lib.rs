#![warn(missing_docs)]

//! Instruction-program front end for the cncsim machining simulator.
//!
//! Turns program text into an ordered list of modal [`Command`]s. Each
//! command carries the full coordinate snapshot in effect when it was
//! committed, so later stages never need to look backwards.
//!
//! # Example
//!
//! ```
//! use cncsim_gcode::{parse_program, CommandKind, ParseOptions, Word};
//!
//! let program = parse_program("G90\nG1 X10 F100\nG1 Y5\n", &ParseOptions::default()).unwrap();
//! let last = program.commands().last().unwrap();
//! assert_eq!(last.kind, CommandKind::Linear);
//! assert_eq!(last.coords.get(Word::X), Some(10.0));
//! assert_eq!(last.coords.get(Word::Y), Some(5.0));
//! ```

mod builder;
mod command;
mod error;
mod lexer;
mod writer;

pub use builder::{parse_file, parse_program, CommandBuilder, ParseOptions, MAX_TOOL};
pub use command::{
    Command, CommandKind, Coordinate, FeedMode, Plane, Program, Units, Word, Words,
};
pub use error::{GcodeError, Result};
pub use lexer::{CodeLetter, Lexer, Token, TokenKind};
pub use writer::{format_move, write_path};
