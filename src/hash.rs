//! Stable identifier hashing
//!
//! Identifiers must hash to the same value across runs and across
//! regeneration cycles, so this uses a fixed FNV-1a 32-bit hash rather
//! than the standard library's seed-randomized hasher.

const FNV_OFFSET_BASIS: u32 = 0x811c9dc5;
const FNV_PRIME: u32 = 0x01000193;

/// Hash value reserved for the canonical empty-string entry.
///
/// `loc_hash` never produces this value for any input.
pub const EMPTY_HASH: i32 = 0;

/// Hash an identifier to its stable 32-bit value.
///
/// FNV-1a over the UTF-8 bytes of the identity. An all-zero result is
/// remapped to the offset basis so that 0 stays reserved for the
/// empty-string sentinel.
pub fn loc_hash(identity: &str) -> i32 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in identity.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    if hash == 0 {
        hash = FNV_OFFSET_BASIS;
    }
    hash as i32
}

/// A hashed localization identifier.
///
/// Tagged newtype only - conversion to the raw hash is always explicit
/// via [`LocId::to_hash`], never implicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocId(i32);

impl LocId {
    /// The reserved empty-string id.
    pub const EMPTY: LocId = LocId(EMPTY_HASH);

    /// Create an id from an identity string.
    pub fn from_identity(identity: &str) -> Self {
        LocId(loc_hash(identity))
    }

    /// Wrap a raw hash value (e.g. one read back from a generated module).
    pub fn from_hash(hash: i32) -> Self {
        LocId(hash)
    }

    /// Explicit, total conversion to the raw hash value.
    pub fn to_hash(self) -> i32 {
        self.0
    }

    /// Whether this is the reserved empty-string id.
    pub fn is_empty(self) -> bool {
        self.0 == EMPTY_HASH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        let a = loc_hash("Hello_World");
        let b = loc_hash("Hello_World");
        assert_eq!(a, b);
    }

    #[test]
    fn test_hash_differs_between_identities() {
        assert_ne!(loc_hash("Menu_Start"), loc_hash("Menu_Quit"));
    }

    #[test]
    fn test_hash_never_zero() {
        // Empty string hashes to the offset basis, not the sentinel.
        assert_ne!(loc_hash(""), EMPTY_HASH);
        for identity in ["a", "A", "Foo", "Hello_World", "0", "\u{00e9}"] {
            assert_ne!(loc_hash(identity), EMPTY_HASH, "hash of {:?} was 0", identity);
        }
    }

    #[test]
    fn test_known_fnv_vector() {
        // FNV-1a("a") = 0xe40c292c
        assert_eq!(loc_hash("a"), 0xe40c292cu32 as i32);
    }

    #[test]
    fn test_loc_id_round_trip() {
        let id = LocId::from_identity("Hello_World");
        assert_eq!(id.to_hash(), loc_hash("Hello_World"));
        assert_eq!(LocId::from_hash(id.to_hash()), id);
        assert!(!id.is_empty());
    }

    #[test]
    fn test_empty_id() {
        assert!(LocId::EMPTY.is_empty());
        assert_eq!(LocId::EMPTY.to_hash(), 0);
    }
}
