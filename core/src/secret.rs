//! Secret generation and hashing (spec §4.9).
//!
//! The original implementation this engine descends from seeded its secret
//! generator from wall-clock time; that is the one behavior this rewrite
//! does not carry forward; a probed timestamp narrows the secret-space
//! enough to brute-force. [`generate_secret`] draws from the OS CSPRNG.
use bitcoin::hashes::{sha256, Hash};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::script::SECRET_SIZE;

/// 32 cryptographically random bytes, the preimage side of the HTLC.
pub fn generate_secret() -> [u8; SECRET_SIZE] {
    let mut secret = [0u8; SECRET_SIZE];
    OsRng.fill_bytes(&mut secret);
    secret
}

/// `SHA256(secret)`, the value locked into the redeem script.
pub fn hash_secret(secret: &[u8; SECRET_SIZE]) -> [u8; 32] {
    sha256::Hash::hash(secret).to_byte_array()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_not_trivially_repeated() {
        let a = generate_secret();
        let b = generate_secret();
        assert_ne!(a, b);
    }

    #[test]
    fn hash_is_deterministic() {
        let secret = [7u8; SECRET_SIZE];
        assert_eq!(hash_secret(&secret), hash_secret(&secret));
    }
}
