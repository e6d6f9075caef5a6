//! Component C — the backtracking matcher.
//!
//! Ground truth: grep-v7.c's `advance(lp, ep)`, a `for (;;) switch (*ep++)`
//! dispatch with goto-based greedy star loops. This port keeps the
//! recursive-over-program-position shape spec.md §9 calls out, replacing
//! gotos with ordinary loops and raw pointers with the bounds-checked
//! cursors in [`crate::buffer`].

use crate::buffer::{LineCursor, PatternCursor};
use crate::errors::MatchError;
use crate::opcode::{self, MAX_GROUPS};

/// Capture state for a single match attempt: the input positions recorded
/// by `BRA`/`KET` for each of the up to [`MAX_GROUPS`] groups.
///
/// Reset at the start of every `advance` call initiated by the driver, per
/// spec.md §9's recommended simplest-robust strategy — this also keeps
/// `BACKREF`'s "group not yet closed" test correct across backtracks within
/// one line, without needing to save/restore the tables on every retry.
#[derive(Clone, Copy, Debug)]
pub struct MatchState {
    group_start: [Option<usize>; MAX_GROUPS],
    group_end: [Option<usize>; MAX_GROUPS],
}

impl MatchState {
    pub fn new() -> Self {
        MatchState {
            group_start: [None; MAX_GROUPS],
            group_end: [None; MAX_GROUPS],
        }
    }

    pub fn group(&self, index: usize) -> Option<(usize, usize)> {
        match (self.group_start.get(index)?, self.group_end.get(index)?) {
            (Some(s), Some(e)) => Some((*s, *e)),
            _ => None,
        }
    }
}

impl Default for MatchState {
    fn default() -> Self {
        Self::new()
    }
}

/// Tries to match `program` starting at `prog_pos` against `line` starting
/// at `line_pos`. Returns whether the remainder of the program accepts the
/// tail of the line, recording capture positions into `state` along the
/// way.
pub fn advance(
    line: &[u8],
    line_pos: usize,
    program: &[u8],
    prog_pos: usize,
    state: &mut MatchState,
) -> Result<bool, MatchError> {
    let mut lp = LineCursor::new(line, line_pos);
    let mut pp = PatternCursor::new(program, prog_pos);

    loop {
        let op = pp.next()?;
        let base = opcode::base_op(op);
        let starred = opcode::has_star(op);

        match (base, starred) {
            (opcode::CHAR, false) => {
                let want = pp.next()?;
                if lp.next()? != want {
                    return Ok(false);
                }
            }
            (opcode::ANY, false) => {
                if lp.at_terminator() {
                    return Ok(false);
                }
                lp.next()?;
            }
            (opcode::DOLLAR, false) => {
                if !lp.at_terminator() {
                    return Ok(false);
                }
            }
            (opcode::END, false) => return Ok(true),
            (opcode::CCL, false) => {
                let bitmap = pp.next_bytes(crate::bitmap::BITMAP_LEN)?;
                let c = lp.next()?;
                if !crate::bitmap::ClassBitmap::from_bytes(bitmap.try_into().unwrap()).contains(c) {
                    return Ok(false);
                }
            }
            (opcode::BRA, false) => {
                let index = pp.next()? as usize;
                if index < MAX_GROUPS {
                    state.group_start[index] = Some(lp.pos());
                }
            }
            (opcode::KET, false) => {
                let index = pp.next()? as usize;
                if index < MAX_GROUPS {
                    state.group_end[index] = Some(lp.pos());
                }
            }
            (opcode::BACKREF, false) => {
                let index = pp.next()? as usize;
                match backref_span(state, index) {
                    None => return Ok(false),
                    Some(span) if matches_span(line, span, lp.pos()) => {
                        lp.set_pos(lp.pos() + (span.1 - span.0));
                    }
                    Some(_) => return Ok(false),
                }
            }
            (opcode::CHAR, true) => {
                let want = pp.next()?;
                let start = lp.pos();
                while lp.peek()? == want {
                    lp.next()?;
                }
                return star_backtrack(line, start, lp.pos(), program, pp.pos(), state);
            }
            (opcode::ANY, true) => {
                let start = lp.pos();
                while !lp.at_terminator() {
                    lp.next()?;
                }
                return star_backtrack(line, start, lp.pos(), program, pp.pos(), state);
            }
            (opcode::CCL, true) => {
                let bitmap = crate::bitmap::ClassBitmap::from_bytes(
                    pp.next_bytes(crate::bitmap::BITMAP_LEN)?.try_into().unwrap(),
                );
                let start = lp.pos();
                while !lp.at_terminator() && bitmap.contains(lp.peek()?) {
                    lp.next()?;
                }
                return star_backtrack(line, start, lp.pos(), program, pp.pos(), state);
            }
            (opcode::BACKREF, true) => {
                let index = pp.next()? as usize;
                let Some(span) = backref_span(state, index) else {
                    return Ok(false);
                };
                let span_len = span.1 - span.0;
                let start = lp.pos();
                if span_len == 0 {
                    return star_backtrack_span(line, start, start, span_len, program, pp.pos(), state);
                }
                while matches_span(line, span, lp.pos()) {
                    lp.set_pos(lp.pos() + span_len);
                }
                return star_backtrack_span(line, start, lp.pos(), span_len, program, pp.pos(), state);
            }
            (bad, _) => return Err(MatchError::BadOpcode { op: bad }),
        }
    }
}

fn backref_span(state: &MatchState, index: usize) -> Option<(usize, usize)> {
    state.group(index)
}

fn matches_span(line: &[u8], (start, end): (usize, usize), at: usize) -> bool {
    let len = end - start;
    let Some(stop) = at.checked_add(len) else {
        return false;
    };
    match line.get(at..stop) {
        Some(candidate) => candidate == &line[start..end],
        None => false,
    }
}

/// Greedy backtracking shared by `CHAR*`, `ANY*`, and `CCL*`: try the
/// longest consumed prefix first, then shrink by one byte at a time until
/// the remainder of the program matches or the prefix is exhausted.
fn star_backtrack(
    line: &[u8],
    start: usize,
    mut end: usize,
    program: &[u8],
    rest_pos: usize,
    state: &mut MatchState,
) -> Result<bool, MatchError> {
    loop {
        if advance(line, end, program, rest_pos, state)? {
            return Ok(true);
        }
        if end == start {
            return Ok(false);
        }
        end -= 1;
    }
}

/// The same greedy-then-shrink search as [`star_backtrack`], but for
/// `BACKREF*`, which must shrink by a whole span length at a time rather
/// than one byte.
fn star_backtrack_span(
    line: &[u8],
    start: usize,
    mut end: usize,
    span_len: usize,
    program: &[u8],
    rest_pos: usize,
    state: &mut MatchState,
) -> Result<bool, MatchError> {
    if span_len == 0 {
        return advance(line, start, program, rest_pos, state);
    }
    loop {
        if advance(line, end, program, rest_pos, state)? {
            return Ok(true);
        }
        if end == start {
            return Ok(false);
        }
        end -= span_len;
    }
}
