//! A faithful-in-spirit Rust port of UNIX V7 `grep`: a single-pattern,
//! line-oriented matcher over a small backtracking regex engine with
//! bracketed capture groups and backreferences.
//!
//! The crate is split the way the original source is, component for
//! component: [`bitmap`] is the character-class set, [`opcode`] is the
//! shared instruction vocabulary, [`compiler`] turns a pattern string into
//! a compiled [`compiler::Pattern`], [`matcher`] backtracks a compiled
//! program against a line, and [`driver`]/[`cli`] are the line-by-line
//! scanning loop and its command-line front end.

mod bitmap;
mod buffer;
mod cli;
mod compiler;
mod driver;
mod errors;
mod matcher;
mod opcode;

pub use crate::cli::{fold_case, parse, run, ParsedArgs};
pub use crate::compiler::Pattern;
pub use crate::driver::{Driver, GrepOptions, BLOCK_SIZE};
pub use crate::errors::{
    ArgTooLongError, CliError, GrepError, MatchError, PatternError, PatternErrorKind, UsageError,
};
pub use crate::matcher::{advance, MatchState};
