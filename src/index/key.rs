//! Index keys and attribute types.

use std::cmp::Ordering;
use std::fmt;

/// Declared type of the indexed attributes.
///
/// Only [`AttrType::Int`] can be indexed; the others exist so the catalog
/// can describe its columns and get a clear rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
    Int,
    Float,
    Varchar,
}

impl AttrType {
    pub(crate) fn to_u8(self) -> u8 {
        match self {
            AttrType::Int => 1,
            AttrType::Float => 2,
            AttrType::Varchar => 3,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(AttrType::Int),
            2 => Some(AttrType::Float),
            3 => Some(AttrType::Varchar),
            _ => None,
        }
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttrType::Int => "INT",
            AttrType::Float => "FLOAT",
            AttrType::Varchar => "VARCHAR",
        };
        f.write_str(name)
    }
}

/// A composite index key: a fixed-length tuple of `i32` attributes.
///
/// Keys order lexicographically, first differing attribute decides.
///
/// # Example
/// ```
/// use minirel::Key;
///
/// assert!(Key::from([1, 9]) < Key::from([2, 0]));
/// assert!(Key::from([2, 0]) < Key::from([2, 1]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key(Vec<i32>);

impl Key {
    pub fn new(values: Vec<i32>) -> Self {
        Key(values)
    }

    /// Number of attributes in the key.
    #[inline]
    pub fn arity(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn values(&self) -> &[i32] {
        &self.0
    }
}

/// Three-way comparison of two keys in ascending lexicographic order.
pub fn compare(k1: &Key, k2: &Key) -> Ordering {
    for (a, b) in k1.0.iter().zip(&k2.0) {
        match a.cmp(b) {
            Ordering::Equal => continue,
            ord => return ord,
        }
    }
    k1.0.len().cmp(&k2.0.len())
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(self, other)
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<Vec<i32>> for Key {
    fn from(values: Vec<i32>) -> Self {
        Key(values)
    }
}

impl From<&[i32]> for Key {
    fn from(values: &[i32]) -> Self {
        Key(values.to_vec())
    }
}

impl<const N: usize> From<[i32; N]> for Key {
    fn from(values: [i32; N]) -> Self {
        Key(values.to_vec())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}
