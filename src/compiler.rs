//! Component B — the regex compiler: translates a pattern string into the
//! linear opcode program described in spec.md §3/§4.B.
//!
//! Ground truth: grep-v7.c's `compile(astr)`, adapted from the `CBRA`/
//! `CCHR`/`CDOT`/`CCL`/`CDOL`/`CEOF`/`CKET`/`CBACK`/`STAR` opcode set to
//! this crate's [`crate::opcode`] constants, and generalized from the
//! teacher's DECUS-grep compiler shape (a `Compiler` struct walking a byte
//! cursor, reserving space and then backfilling a class bitmap).

use std::io::{self, Write};

use crate::bitmap::{ClassBitmap, BITMAP_LEN};
use crate::errors::{PatternError, PatternErrorKind};
use crate::opcode::{self, MAX_GROUPS, PROGRAM_LIMIT};

/// A compiled pattern: an opcode program plus the `^`-anchor flag, which is
/// stored outside the program (spec.md §3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
    program: Vec<u8>,
    anchored: bool,
}

impl Pattern {
    /// The original value for `ESIZE` in grep.c, bounding the compiled
    /// program to at most this many bytes.
    pub const DEFAULT_LIMIT: usize = PROGRAM_LIMIT;

    /// Compiles `source` with the default program-size limit.
    pub fn compile(source: &[u8]) -> Result<Self, PatternError> {
        Self::compile_with_limit(source, Self::DEFAULT_LIMIT)
    }

    /// Compiles `source` to a [`Pattern`], bounding the compiled program to
    /// at most `limit` bytes (0 means unbounded; tests use this to check
    /// program shape without tripping the size limit).
    pub fn compile_with_limit(source: &[u8], limit: usize) -> Result<Self, PatternError> {
        let mut compiler = Compiler::new(source, limit);
        compiler.compile()?;
        Ok(Pattern {
            program: compiler.program,
            anchored: compiler.anchored,
        })
    }

    pub fn program(&self) -> &[u8] {
        &self.program
    }

    pub fn anchored(&self) -> bool {
        self.anchored
    }

    /// Writes the program as a space-separated sequence of bytes, escaping
    /// control characters, for debugging.
    pub fn debug<W: Write>(&self, mut w: W) -> io::Result<()> {
        for &b in &self.program {
            if b < b' ' || b >= 0x7f {
                write!(w, "\\{b:03o}")?;
            } else {
                w.write_all(&[b])?;
            }
            w.write_all(b" ")?;
        }
        w.write_all(b"\n")
    }
}

struct Compiler<'s> {
    source: &'s [u8],
    offset: usize,
    program: Vec<u8>,
    limit: usize,
    anchored: bool,
    /// Indices of currently-open `\(` groups, innermost last.
    open_groups: Vec<u8>,
    next_group: u8,
    /// Number of `\)` seen so far, matching grep.c's `closed` counter.
    closed_count: u8,
}

impl<'s> Compiler<'s> {
    fn new(source: &'s [u8], limit: usize) -> Self {
        let capacity = if limit != 0 { limit } else { source.len() * 2 + 1 };
        Compiler {
            source,
            offset: 0,
            program: Vec::with_capacity(capacity),
            limit,
            anchored: false,
            open_groups: Vec::with_capacity(MAX_GROUPS),
            next_group: 0,
            closed_count: 0,
        }
    }

    fn compile(&mut self) -> Result<(), PatternError> {
        if self.peek() == Some(b'^') {
            self.anchored = true;
            self.bump();
        }

        // Position in `program` of the last atom's opcode byte, updated only
        // on iterations that do not consume a `*`. `None` until the first
        // non-star atom has been emitted — matches grep.c's `lastep`, which
        // starts at 0 and is left untouched across a run of `*`s.
        let mut last_atom: Option<usize> = None;

        while let Some(c) = self.bump() {
            if c == b'*' {
                match last_atom {
                    Some(pos) if opcode::can_star(opcode::base_op(self.program[pos])) => {
                        self.program[pos] |= opcode::STAR;
                    }
                    _ => {
                        // Literal '*': BRA/KET cannot repeat, nor can the
                        // very start of the pattern. `last_atom` is
                        // deliberately left untouched, matching grep.c's
                        // `lastep`.
                        self.store(opcode::CHAR)?;
                        self.store(b'*')?;
                    }
                }
                continue;
            }

            let atom_start = self.program.len();
            match c {
                b'$' if self.peek().is_none() => self.store(opcode::DOLLAR)?,
                b'.' => self.store(opcode::ANY)?,
                b'[' => self.compile_class()?,
                b'\\' => self.compile_escape()?,
                other => {
                    self.store(opcode::CHAR)?;
                    self.store(other)?;
                }
            }
            last_atom = Some(atom_start);
        }

        self.store(opcode::END)
    }

    fn compile_escape(&mut self) -> Result<(), PatternError> {
        let Some(c) = self.bump() else {
            // A trailing backslash with nothing to escape: store a literal
            // NUL, mirroring grep.c reading the string's terminating NUL.
            self.store(opcode::CHAR)?;
            return self.store(0);
        };
        match c {
            b'(' => {
                if self.next_group as usize >= MAX_GROUPS {
                    return Err(self.err(PatternErrorKind::TooManyGroups));
                }
                let index = self.next_group;
                self.open_groups.push(index);
                self.next_group += 1;
                self.store(opcode::BRA)?;
                self.store(index)
            }
            b')' => {
                let Some(index) = self.open_groups.pop() else {
                    return Err(self.err(PatternErrorKind::UnbalancedClose));
                };
                self.closed_count += 1;
                self.store(opcode::KET)?;
                self.store(index)
            }
            b'1'..=b'9' => {
                let index = c - b'1';
                if index >= self.closed_count {
                    return Err(self.err(PatternErrorKind::UnclosedGroupBackref));
                }
                self.store(opcode::BACKREF)?;
                self.store(index)
            }
            other => {
                self.store(opcode::CHAR)?;
                self.store(other)
            }
        }
    }

    /// Parses `[...]` / `[^...]`, reserving the 16-byte bitmap eagerly
    /// (spec.md §4.B) before scanning its contents.
    fn compile_class(&mut self) -> Result<(), PatternError> {
        self.store(opcode::CCL)?;
        let bitmap_pos = self.program.len();
        self.store_bytes(&[0u8; BITMAP_LEN])?;

        let negate = if self.peek() == Some(b'^') {
            self.bump();
            true
        } else {
            false
        };

        let mut bitmap = ClassBitmap::new();
        // The first byte of a class is always a literal member, even ']' —
        // grep.c reads it before the `while (.. != ']')` loop begins.
        let mut prev = self.bump().ok_or_else(|| self.err(PatternErrorKind::UnterminatedClass))?;
        bitmap.set(prev);

        loop {
            let c = self.bump().ok_or_else(|| self.err(PatternErrorKind::UnterminatedClass))?;
            if c == b']' {
                break;
            }
            if c == b'-' && self.peek().is_some_and(|n| n != b']') {
                let high = self.bump().expect("peeked Some above");
                bitmap.set_range(prev, high);
                prev = high;
            } else {
                bitmap.set(c);
                prev = c;
            }
        }

        if negate {
            bitmap.negate();
        }
        self.program[bitmap_pos..bitmap_pos + BITMAP_LEN].copy_from_slice(bitmap.as_bytes());
        Ok(())
    }

    fn store(&mut self, byte: u8) -> Result<(), PatternError> {
        if self.limit != 0 && self.program.len() >= self.limit {
            return Err(self.err(PatternErrorKind::ProgramTooLong));
        }
        self.program.push(byte);
        Ok(())
    }

    fn store_bytes(&mut self, bytes: &[u8]) -> Result<(), PatternError> {
        if self.limit != 0 && self.program.len() + bytes.len() > self.limit {
            return Err(self.err(PatternErrorKind::ProgramTooLong));
        }
        self.program.extend_from_slice(bytes);
        Ok(())
    }

    #[inline]
    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.offset += 1;
        Some(c)
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.source.get(self.offset).copied()
    }

    fn err(&self, kind: PatternErrorKind) -> PatternError {
        PatternError {
            kind,
            source: self.source.to_vec(),
            offset: self.offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::*;

    fn prog(pattern: &[u8]) -> Vec<u8> {
        Pattern::compile(pattern).unwrap().program().to_vec()
    }

    #[test]
    fn literal_is_char_pairs_then_end() {
        assert_eq!(
            prog(b"cas"),
            vec![CHAR, b'c', CHAR, b'a', CHAR, b's', END]
        );
    }

    #[test]
    fn literal_program_size_matches_formula() {
        // Compiling a literal pattern `s` produces 2*|s| + 1 bytes.
        for s in [b"".as_slice(), b"a", b"hello world"] {
            let p = Pattern::compile(s).unwrap();
            assert_eq!(p.program().len(), 2 * s.len() + 1);
        }
    }

    #[test]
    fn anchor_does_not_emit_opcode() {
        let p = Pattern::compile(b"^abc").unwrap();
        assert!(p.anchored());
        assert_eq!(p.program(), &[CHAR, b'a', CHAR, b'b', CHAR, b'c', END]);
    }

    #[test]
    fn caret_elsewhere_is_literal() {
        let p = Pattern::compile(b"a^b").unwrap();
        assert!(!p.anchored());
        assert_eq!(p.program(), &[CHAR, b'a', CHAR, b'^', CHAR, b'b', END]);
    }

    #[test]
    fn dollar_at_end_is_opcode() {
        assert_eq!(prog(b"ab$"), vec![CHAR, b'a', CHAR, b'b', DOLLAR, END]);
    }

    #[test]
    fn dollar_not_at_end_is_literal() {
        assert_eq!(
            prog(b"a$b"),
            vec![CHAR, b'a', CHAR, b'$', CHAR, b'b', END]
        );
    }

    #[test]
    fn dot_emits_any() {
        assert_eq!(prog(b"a.b"), vec![CHAR, b'a', ANY, CHAR, b'b', END]);
    }

    #[test]
    fn star_sets_flag_on_previous_opcode() {
        assert_eq!(prog(b"a*"), vec![CHAR | STAR, b'a', END]);
        assert_eq!(prog(b".*"), vec![ANY | STAR, END]);
    }

    #[test]
    fn leading_star_is_literal() {
        assert_eq!(prog(b"*a"), vec![CHAR, b'*', CHAR, b'a', END]);
    }

    #[test]
    fn double_star_stays_starred_not_literal() {
        // grep.c's `lastep` is untouched across a run of `*`s, so `a**`
        // re-applies STAR to the same opcode rather than emitting a second
        // literal `*`.
        assert_eq!(prog(b"a**"), vec![CHAR | STAR, b'a', END]);
    }

    #[test]
    fn star_after_group_open_is_literal() {
        assert_eq!(prog(b"\\(*"), vec![BRA, 0, CHAR, b'*', END]);
    }

    #[test]
    fn group_and_backreference() {
        assert_eq!(
            prog(b"\\(a\\)\\1"),
            vec![BRA, 0, CHAR, b'a', KET, 0, BACKREF, 0, END]
        );
    }

    #[test]
    fn star_after_group_close_is_literal() {
        assert_eq!(
            prog(b"\\(a\\)*"),
            vec![BRA, 0, CHAR, b'a', KET, 0, CHAR, b'*', END]
        );
    }

    #[test]
    fn too_many_groups() {
        // 10 sequential (non-nested) groups: the count must be cumulative
        // across the whole pattern, not just the currently-open nesting
        // depth, which never exceeds 1 here.
        let mut pat = Vec::new();
        for _ in 0..10 {
            pat.extend_from_slice(b"\\(a\\)");
        }
        let err = Pattern::compile(&pat).unwrap_err();
        assert_eq!(err.kind, PatternErrorKind::TooManyGroups);
    }

    #[test]
    fn nine_sequential_groups_is_the_exact_limit() {
        let mut pat = Vec::new();
        for _ in 0..9 {
            pat.extend_from_slice(b"\\(a\\)");
        }
        assert!(Pattern::compile(&pat).is_ok());
    }

    #[test]
    fn unbalanced_close() {
        let err = Pattern::compile(b"a\\)").unwrap_err();
        assert_eq!(err.kind, PatternErrorKind::UnbalancedClose);
    }

    #[test]
    fn unterminated_group_is_not_an_error_itself() {
        // An unclosed `\(` alone is only detected if referenced or simply
        // leaves the group open; grep.c does not error at end-of-pattern for
        // a dangling `\(`, so compiling succeeds.
        assert!(Pattern::compile(b"\\(a").is_ok());
    }

    #[test]
    fn backreference_before_close_is_error() {
        let err = Pattern::compile(b"\\(\\1\\)").unwrap_err();
        assert_eq!(err.kind, PatternErrorKind::UnclosedGroupBackref);
    }

    #[test]
    fn class_basic() {
        let p = Pattern::compile(b"[abc]").unwrap();
        assert_eq!(p.program().len(), 1 + BITMAP_LEN + 1);
        assert_eq!(p.program()[0], CCL);
        assert_eq!(p.program()[BITMAP_LEN + 1], END);
    }

    #[test]
    fn class_range() {
        let p = Pattern::compile(b"[A-Ca]").unwrap();
        let bitmap = ClassBitmap::from_bytes(p.program()[1..1 + BITMAP_LEN].try_into().unwrap());
        assert!(bitmap.contains(b'A'));
        assert!(bitmap.contains(b'B'));
        assert!(bitmap.contains(b'C'));
        assert!(bitmap.contains(b'a'));
        assert!(!bitmap.contains(b'D'));
    }

    #[test]
    fn class_leading_bracket_is_literal_member() {
        // `[]]` is a class containing only ']'.
        let p = Pattern::compile(b"[]]").unwrap();
        let bitmap = ClassBitmap::from_bytes(p.program()[1..1 + BITMAP_LEN].try_into().unwrap());
        assert!(bitmap.contains(b']'));
        assert!(!bitmap.contains(b'a'));
    }

    #[test]
    fn class_negated() {
        let p = Pattern::compile(b"[^a]").unwrap();
        let bitmap = ClassBitmap::from_bytes(p.program()[1..1 + BITMAP_LEN].try_into().unwrap());
        assert!(!bitmap.contains(b'a'));
        assert!(!bitmap.contains(0)); // NUL never a member
        assert!(bitmap.contains(b'b'));
    }

    #[test]
    fn unterminated_class_errors() {
        let err = Pattern::compile(b"[abc").unwrap_err();
        assert_eq!(err.kind, PatternErrorKind::UnterminatedClass);
    }

    #[test]
    fn too_long_program_errors() {
        let pat = vec![b'a'; 200];
        let err = Pattern::compile_with_limit(&pat, 10).unwrap_err();
        assert_eq!(err.kind, PatternErrorKind::ProgramTooLong);
    }
}
