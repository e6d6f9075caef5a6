//! Opcode vocabulary for the compiled pattern byte code.
//!
//! Ground truth: grep-v7.c's `#define CBRA 1`, `CCHR 2`, `CDOT 4`, `CCL 6`,
//! `CDOL 10`, `CEOF 11`, `CKET 12`, `CBACK 18`, `STAR 01`. This port keeps
//! the same idea (a tagged byte with a repetition bit folded in) but
//! reassigns values so every opcode that can carry the star flag is even,
//! leaving bit 0 free as a pure "repeat" flag with no accidental aliasing.

/// Bit 0 of an opcode byte: "repeat the preceding match zero or more times,
/// greedy, with backtracking." Valid only on [`CHAR`], [`ANY`], [`CCL`] and
/// [`BACKREF`].
pub const STAR: u8 = 0x01;

/// Consume one input byte equal to the following literal byte operand.
pub const CHAR: u8 = 0x02;
/// Consume one input byte, provided it is not the line terminator.
pub const ANY: u8 = 0x04;
/// Succeed only at end-of-line; consumes nothing.
pub const DOLLAR: u8 = 0x06;
/// The whole attempt succeeds.
pub const END: u8 = 0x08;
/// Consume one input byte whose masked value is a member of the following
/// 16-byte bitmap operand.
pub const CCL: u8 = 0x0a;
/// Record the start of capture group `index` (1-byte operand) at the
/// current input position.
pub const BRA: u8 = 0x0c;
/// Record the end of capture group `index` (1-byte operand).
pub const KET: u8 = 0x0e;
/// Consume a run of bytes equal to the span previously captured by group
/// `index` (1-byte operand).
pub const BACKREF: u8 = 0x10;

/// Maximum number of capture groups (`\(` … `\)` pairs), matching grep.c's
/// `NBRA`.
pub const MAX_GROUPS: usize = 9;

/// Maximum size in bytes of a compiled program, matching grep.c's `ESIZE`.
pub const PROGRAM_LIMIT: usize = 256;

/// Maximum usable length of a line, matching grep.c's `LBSIZE`.
pub const LINE_LIMIT: usize = 512;

/// Strips the star flag, returning the base opcode.
pub fn base_op(op: u8) -> u8 {
    op & !STAR
}

/// True if `op` carries the star (repeat) flag.
pub fn has_star(op: u8) -> bool {
    op & STAR != 0
}

/// True if `base` may legally carry the star flag.
pub fn can_star(base: u8) -> bool {
    matches!(base, CHAR | ANY | CCL | BACKREF)
}
