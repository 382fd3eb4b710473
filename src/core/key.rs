//! Variable keys.
//!
//! Every primal variable and every Lagrange multiplier in a QP is identified by
//! a [`Key`]. Keys are plain 64-bit integers; [`Symbol`] packs a character and
//! an index into one so that keys stay readable (`x1`, `l3`, ...).

use std::fmt;

/// Identifier of a variable (primal or dual) in a factor graph.
pub type Key = u64;

const CHR_BITS: u32 = 8;
const INDEX_BITS: u32 = Key::BITS - CHR_BITS;
const INDEX_MASK: Key = (1 << INDEX_BITS) - 1;

/// A human-readable key made of an ASCII character and an index.
///
/// The character occupies the top byte of the key and the index the
/// remaining 56 bits.
///
/// ```
/// use apex_qp::Symbol;
///
/// let x1 = Symbol::new('x', 1);
/// assert_eq!(x1.to_string(), "x1");
/// assert_eq!(Symbol::from_key(x1.key()), x1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol {
    chr: u8,
    index: u64,
}

impl Symbol {
    /// Create a symbol; non-ASCII characters are replaced by `?` and the index
    /// is truncated to 56 bits.
    pub fn new(chr: char, index: u64) -> Self {
        let chr = if chr.is_ascii() { chr as u8 } else { b'?' };
        Self {
            chr,
            index: index & INDEX_MASK,
        }
    }

    /// Decode a key produced by [`Symbol::key`].
    pub fn from_key(key: Key) -> Self {
        Self {
            chr: (key >> INDEX_BITS) as u8,
            index: key & INDEX_MASK,
        }
    }

    /// The encoded key.
    pub fn key(&self) -> Key {
        ((self.chr as Key) << INDEX_BITS) | self.index
    }

    pub fn chr(&self) -> char {
        self.chr as char
    }

    pub fn index(&self) -> u64 {
        self.index
    }
}

impl From<Symbol> for Key {
    fn from(symbol: Symbol) -> Self {
        symbol.key()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.chr(), self.index)
    }
}

/// Format a key as a symbol when it looks like one, otherwise as a number.
pub(crate) fn format_key(key: Key) -> String {
    let symbol = Symbol::from_key(key);
    if symbol.chr.is_ascii_graphic() {
        symbol.to_string()
    } else {
        key.to_string()
    }
}
