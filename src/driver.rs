//! Component D — the line driver.
//!
//! Ground truth: grep-v7.c's `execute(file)` and `succeed(f)`. This port
//! collects the process-wide `lnum`/`tln`/`nsucc` globals into an owned
//! [`Driver`] value per spec.md §9, and replaces the raw `FILE *` with any
//! [`Read`], so the same loop drives a real file, stdin, or an in-memory
//! buffer in tests.

use std::io::{self, Read, Write};

use crate::compiler::Pattern;
use crate::errors::GrepError;
use crate::matcher::{advance, MatchState};
use crate::opcode;

/// `BSIZE` from `<sys/param.h>` on the systems grep-v7.c ran on, used to
/// scale the `-b` block number.
pub const BLOCK_SIZE: u64 = 512;

/// `LBSIZE-1` in grep.c: the largest number of content bytes read into the
/// line buffer before it is treated as a complete (if synthetic) line.
const LINE_CONTENT_LIMIT: usize = opcode::LINE_LIMIT - 1;

/// The boolean flags that shape matching and output, gathered from the
/// command line (spec.md §6). `show_filenames` defaults to `true` to match
/// grep.c's `hflag = 1`; `-h` clears it.
#[derive(Clone, Debug)]
pub struct GrepOptions {
    pub invert: bool,
    pub count_only: bool,
    pub list_only: bool,
    pub line_numbers: bool,
    pub block_numbers: bool,
    pub silent: bool,
    pub show_filenames: bool,
    pub fold_case: bool,
}

impl Default for GrepOptions {
    fn default() -> Self {
        GrepOptions {
            invert: false,
            count_only: false,
            list_only: false,
            line_numbers: false,
            block_numbers: false,
            silent: false,
            show_filenames: true,
            fold_case: false,
        }
    }
}

/// Drives one compiled pattern against any number of input streams.
pub struct Driver<'p> {
    pattern: &'p Pattern,
    options: &'p GrepOptions,
}

/// What one chunk of input produced: either a line (possibly a synthetic
/// one, if the buffer filled before a real newline arrived) along with how
/// many stream bytes it consumed, or end of file with nothing left to
/// match (grep.c discards a trailing partial line on EOF).
enum Chunk {
    Line { consumed: usize },
    Eof,
}

impl<'p> Driver<'p> {
    pub fn new(pattern: &'p Pattern, options: &'p GrepOptions) -> Self {
        Driver { pattern, options }
    }

    /// Processes one input stream to completion. `label` is the filename
    /// used for prefixes (`None` for stdin); `multi_file` is whether more
    /// than one file is being scanned in this run (grep.c's `nfile > 1`).
    /// Returns whether at least one line was reported as matching in this
    /// file, for the caller to fold into the overall exit status.
    pub fn execute<R: Read, W: Write>(
        &self,
        label: Option<&str>,
        multi_file: bool,
        input: R,
        mut out: W,
    ) -> Result<bool, GrepError> {
        let mut bytes = input.bytes();
        let mut buf = Vec::with_capacity(LINE_CONTENT_LIMIT);
        let mut line_num: u64 = 0;
        let mut matched_count: u64 = 0;
        let mut any_matched = false;
        let mut stream_pos: u64 = 0;

        loop {
            line_num += 1;
            let chunk = match read_chunk(&mut bytes, &mut buf) {
                Ok(chunk) => chunk,
                Err(_) => Chunk::Eof,
            };
            let consumed = match chunk {
                Chunk::Line { consumed } => consumed,
                Chunk::Eof => {
                    if self.options.count_only && !self.options.silent {
                        if multi_file {
                            write!(out, "{}:", label.unwrap_or(""))?;
                        }
                        writeln!(out, "{matched_count}")?;
                    }
                    return Ok(any_matched);
                }
            };
            stream_pos += consumed as u64;

            let matched = line_matches(self.pattern, &buf)?;
            let report = matched != self.options.invert;
            if !report {
                continue;
            }
            any_matched = true;
            matched_count += 1;

            if self.options.count_only {
                continue;
            }
            if self.options.list_only {
                if !self.options.silent {
                    writeln!(out, "{}", label.unwrap_or(""))?;
                }
                return Ok(true);
            }
            if self.options.silent {
                continue;
            }
            if multi_file && self.options.show_filenames {
                write!(out, "{}:", label.unwrap_or(""))?;
            }
            if self.options.block_numbers {
                write!(out, "{}:", (stream_pos - 1) / BLOCK_SIZE)?;
            }
            if self.options.line_numbers {
                write!(out, "{line_num}:")?;
            }
            out.write_all(&buf)?;
            out.write_all(b"\n")?;
        }
    }
}

/// Reads one chunk of input: content bytes up to (and consuming) the next
/// `\n`, or up to [`LINE_CONTENT_LIMIT`] bytes, whichever comes first.
/// `buf` is cleared and filled with the content, excluding any newline.
fn read_chunk<R: Read>(bytes: &mut io::Bytes<R>, buf: &mut Vec<u8>) -> io::Result<Chunk> {
    buf.clear();
    loop {
        match bytes.next() {
            None => return Ok(Chunk::Eof),
            Some(Err(err)) => return Err(err),
            Some(Ok(b'\n')) => return Ok(Chunk::Line { consumed: buf.len() + 1 }),
            Some(Ok(c)) => {
                buf.push(c);
                if buf.len() >= LINE_CONTENT_LIMIT {
                    return Ok(Chunk::Line { consumed: buf.len() });
                }
            }
        }
    }
}

/// Decides whether `pattern` matches `line`, trying `advance` at position 0
/// only when anchored, and otherwise either the fast literal-first-byte
/// scan or every position in turn (spec.md §4.C/§4.D).
fn line_matches(pattern: &Pattern, line: &[u8]) -> Result<bool, GrepError> {
    let program = pattern.program();
    if pattern.anchored() {
        let mut state = MatchState::new();
        return Ok(advance(line, 0, program, 0, &mut state)?);
    }

    if program.first().copied() == Some(opcode::CHAR) {
        let want = program[1];
        for pos in 0..=line.len() {
            let c = line.get(pos).copied().unwrap_or(0);
            if c != want {
                continue;
            }
            let mut state = MatchState::new();
            if advance(line, pos, program, 0, &mut state)? {
                return Ok(true);
            }
        }
        return Ok(false);
    }

    for pos in 0..=line.len() {
        let mut state = MatchState::new();
        if advance(line, pos, program, 0, &mut state)? {
            return Ok(true);
        }
    }
    Ok(false)
}
