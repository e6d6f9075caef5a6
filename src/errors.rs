use std::{
    fmt::{self, Debug, Display, Formatter},
    io,
};

/// Every way command-line processing can fail before a line is ever read.
#[derive(Debug)]
pub enum CliError {
    Usage(UsageError),
    Pattern(PatternError),
    ArgTooLong(ArgTooLongError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UsageError {
    UnknownFlag { flag: u8 },
    NoPattern,
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PatternError {
    pub kind: PatternErrorKind,
    pub source: Vec<u8>,
    pub offset: usize,
}

/// A single *regex error*, raised for any malformed pattern (spec.md §7).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PatternErrorKind {
    /// `[` with no matching `]`.
    UnterminatedClass,
    /// More than [`crate::opcode::MAX_GROUPS`] groups opened with `\(`.
    TooManyGroups,
    /// `\)` with no matching open `\(`.
    UnbalancedClose,
    /// `\d` backreference to a group that has not yet been closed.
    UnclosedGroupBackref,
    /// The compiled program would exceed [`crate::opcode::PROGRAM_LIMIT`].
    ProgramTooLong,
}

/// The case-fold rewrite would overflow the pattern buffer (spec.md §4.D).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ArgTooLongError;

/// A defensive, should-never-happen matcher fault: the compiler is expected
/// to emit only opcodes the matcher understands, within program bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MatchError {
    BadOpcode { op: u8 },
    PatternOverrun,
    LineOverrun,
}

/// Every way the per-file driver loop can fail once scanning has begun.
#[derive(Debug)]
pub enum GrepError {
    Match(MatchError),
    Io { path: Option<String>, source: io::Error },
}

impl UsageError {
    /// Returns the error message matching grep.c's `errexit` calls.
    pub fn message(&self) -> String {
        match *self {
            UsageError::UnknownFlag { flag } => {
                format!("unknown flag {:?}", DebugByteChar(flag))
            }
            UsageError::NoPattern => "no pattern".to_string(),
        }
    }
}

impl PatternErrorKind {
    pub fn message(self) -> &'static str {
        match self {
            PatternErrorKind::UnterminatedClass => "unterminated character class",
            PatternErrorKind::TooManyGroups => "too many \\( groups",
            PatternErrorKind::UnbalancedClose => "unbalanced \\)",
            PatternErrorKind::UnclosedGroupBackref => "backreference to unclosed group",
            PatternErrorKind::ProgramTooLong => "regular expression too long",
        }
    }
}

impl From<UsageError> for CliError {
    fn from(err: UsageError) -> Self {
        CliError::Usage(err)
    }
}

impl From<PatternError> for CliError {
    fn from(err: PatternError) -> Self {
        CliError::Pattern(err)
    }
}

impl From<ArgTooLongError> for CliError {
    fn from(err: ArgTooLongError) -> Self {
        CliError::ArgTooLong(err)
    }
}

impl From<MatchError> for GrepError {
    fn from(err: MatchError) -> Self {
        GrepError::Match(err)
    }
}

impl From<io::Error> for GrepError {
    fn from(err: io::Error) -> Self {
        GrepError::Io { path: None, source: err }
    }
}

impl std::error::Error for CliError {}
impl std::error::Error for UsageError {}
impl std::error::Error for PatternError {}
impl std::error::Error for ArgTooLongError {}
impl std::error::Error for MatchError {}
impl std::error::Error for GrepError {}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Usage(err) => Display::fmt(err, f),
            CliError::Pattern(err) => Display::fmt(err, f),
            CliError::ArgTooLong(err) => Display::fmt(err, f),
        }
    }
}

impl Display for UsageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "grep: {}", self.message())
    }
}

impl Display for ArgTooLongError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "grep: argument too long")
    }
}

impl Display for PatternError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "grep: RE error: {} at byte {} ({:?}) in {:?}",
            self.kind,
            self.offset,
            DebugByteChar(self.source.get(self.offset.wrapping_sub(1)).copied().unwrap_or(0)),
            DebugByteString(&self.source),
        )
    }
}

impl Display for PatternErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl Display for MatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            MatchError::BadOpcode { op } => write!(f, "grep RE botch: bad opcode {:?}", DebugByteChar(op)),
            MatchError::PatternOverrun => write!(f, "grep RE botch: overran pattern buffer"),
            MatchError::LineOverrun => write!(f, "grep RE botch: overran line buffer"),
        }
    }
}

impl Display for GrepError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("grep: ")?;
        match self {
            GrepError::Match(err) => Display::fmt(err, f),
            GrepError::Io { path: Some(path), source } => write!(f, "can't open {path}: {source}"),
            GrepError::Io { path: None, source } => Display::fmt(source, f),
        }
    }
}

impl Debug for PatternError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternError")
            .field("kind", &self.kind)
            .field("source", &DebugByteString(&self.source))
            .field("offset", &self.offset)
            .finish()
    }
}

struct DebugByteString<'a>(&'a [u8]);

struct DebugByteChar(u8);

impl Debug for DebugByteString<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "\"")?;
        debug_bytes(f, self.0)?;
        write!(f, "\"")
    }
}

impl Debug for DebugByteChar {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "'")?;
        debug_bytes(f, &[self.0])?;
        write!(f, "'")
    }
}

/// Formats a byte slice using C escapes.
fn debug_bytes(f: &mut Formatter<'_>, s: &[u8]) -> fmt::Result {
    for (i, &c) in s.iter().enumerate() {
        match c {
            b'"' => write!(f, "\\\""),
            b'\\' => write!(f, "\\\\"),
            0x07 => write!(f, "\\a"),
            0x08 => write!(f, "\\b"),
            0x0c => write!(f, "\\f"),
            b'\n' => write!(f, "\\n"),
            b'\r' => write!(f, "\\r"),
            b'\t' => write!(f, "\\t"),
            0x0b => write!(f, "\\v"),
            0x00..=0x1f | 0x7f.. => {
                if s.get(i + 1).is_some_and(u8::is_ascii_digit) {
                    write!(f, "\\{:03o}", c)
                } else {
                    write!(f, "\\{:o}", c)
                }
            }
            _ => write!(f, "{}", char::from(c)),
        }?;
    }
    Ok(())
}
