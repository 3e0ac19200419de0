//! Stable blake3 hashing for split fingerprints and encoded block checksums.

use blake3::Hasher;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub fn to_hex(&self) -> String {
        let mut s = String::with_capacity(64);
        for b in &self.0 {
            use std::fmt::Write as _;
            let _ = write!(&mut s, "{:02x}", b);
        }
        s
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

pub fn hash_bytes(bytes: &[u8]) -> Hash256 {
    let mut h = Hasher::new();
    h.update(bytes);
    Hash256(h.finalize().into())
}

/// Hash any serde-serializable value deterministically (via JSON).
pub fn hash_serde<T: Serialize>(v: &T) -> Result<Hash256, crate::error::Error> {
    let bytes = serde_json::to_vec(v)?;
    Ok(hash_bytes(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_bytes_is_plain_blake3() {
        let h = hash_bytes(b"colscan");
        assert_eq!(h.0, *blake3::hash(b"colscan").as_bytes());
        assert_eq!(h.to_hex().len(), 64);
    }

    #[test]
    fn test_hash_is_stable() {
        let a = hash_bytes(b"split");
        let b = hash_bytes(b"split");
        assert_eq!(a, b);
        assert_eq!(a.to_hex().len(), 64);
        assert_ne!(a, hash_bytes(b"split2"));
    }

    #[test]
    fn test_hash_serde_matches_json_bytes() {
        let v = vec![1u32, 2, 3];
        let expected = hash_bytes(&serde_json::to_vec(&v).unwrap());
        assert_eq!(hash_serde(&v).unwrap(), expected);
    }
}
