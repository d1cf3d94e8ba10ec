//! Deterministic hash-based identity for types and member signatures.
//!
//! [`TypeHash`] is a 64-bit XXHash64 of a resolved name, mixed with a
//! domain constant so that a type and a method with the same spelling never
//! collide. Class types hash through this value, which is what makes every
//! encoding of the same qualified name hash identically.
//!
//! # Examples
//!
//! ```
//! use classgen_core::TypeHash;
//!
//! let a = TypeHash::from_name("java.lang.String");
//! let b = TypeHash::from_name("java.lang.String");
//! assert_eq!(a, b);
//!
//! let raw = TypeHash::from_name("java.util.List");
//! let list_of_string = TypeHash::from_parameterized(raw, &[a]);
//! assert_ne!(raw, list_of_string);
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain-specific mixing constants for hash computation.
pub mod hash_constants {
    /// Separator constant between hashed components
    pub const SEP: u64 = 0x4bc94d6bd06053ad;

    /// Domain marker for type hashes
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for parameterized type hashes
    pub const PARAMETERIZED: u64 = 0x6c1f9d24a3b87e05;

    /// Domain marker for method signature hashes
    pub const METHOD: u64 = 0x7d3c8b4a92e15f6d;

    /// Domain marker for array types
    pub const ARRAY: u64 = 0x1a095090689d4647;

    /// Parameter position mixing constants.
    pub const PARAM_MARKERS: [u64; 8] = [
        0x9e3779b97f4a7c15,
        0xbf58476d1ce4e5b9,
        0x94d049bb133111eb,
        0xd6e8feb86659fd93,
        0xe7037ed1a0b428db,
        0xc6a4a7935bd1e995,
        0x8648dbbc94d49b8d,
        0xa2b48b2c69e0d657,
    ];
}

/// A deterministic 64-bit hash identifying a type or a member signature.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Hash of a resolved type name.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(hash_constants::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Hash of a parameterized type. Never equal to the raw hash, even for
    /// an empty argument list.
    #[inline]
    pub fn from_parameterized(raw: TypeHash, arguments: &[TypeHash]) -> Self {
        mix(hash_constants::PARAMETERIZED ^ raw.0, arguments)
    }

    /// Hash of an array type with the given component.
    #[inline]
    pub fn from_array(component: TypeHash) -> Self {
        TypeHash(component.0.wrapping_mul(hash_constants::SEP) ^ hash_constants::ARRAY)
    }

    /// Hash of a method signature (name and ordered parameter types).
    #[inline]
    pub fn from_method(name: &str, param_hashes: &[TypeHash]) -> Self {
        mix(hash_constants::METHOD ^ xxh64(name.as_bytes(), 0), param_hashes)
    }
}

/// Fold ordered component hashes into a seed. Order matters.
fn mix(seed: u64, parts: &[TypeHash]) -> TypeHash {
    let mut hash = seed;
    for (i, part) in parts.iter().enumerate() {
        let marker = hash_constants::PARAM_MARKERS
            .get(i)
            .copied()
            .unwrap_or_else(|| hash_constants::PARAM_MARKERS[0].wrapping_add(i as u64));
        hash = hash.wrapping_mul(hash_constants::SEP).wrapping_add(marker ^ part.0);
    }
    TypeHash(hash)
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}
