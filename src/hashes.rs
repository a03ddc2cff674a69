//! Hash primitives used throughout transaction construction and signing.
//!
//! Bitcoin's wire format commits to two distinct digests: `sha256d` (double
//! SHA-256), used for transaction ids and signature-hash preimages, and
//! `hash160` (SHA-256 followed by RIPEMD-160), used wherever a pubkey or
//! script is committed to a short fixed-width fingerprint (P2PKH, P2WPKH,
//! P2SH).

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Double SHA-256 of `data`.
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut out = [0u8; 32];
    out.copy_from_slice(&second);
    out
}

/// SHA-256 then RIPEMD-160 of `data`.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let first = Sha256::digest(data);
    let second = Ripemd160::digest(first);
    let mut out = [0u8; 20];
    out.copy_from_slice(&second);
    out
}

/// The null / coinbase txid: 32 zero bytes (spec.md §6 "Coinbase hash").
pub const COINBASE_TXID: [u8; 32] = [0u8; 32];

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sha256d_is_sha256_applied_twice() {
        let data = b"transaction builder";
        let once = Sha256::digest(data);
        let twice = Sha256::digest(once);
        assert_eq!(&sha256d(data)[..], &twice[..]);
    }

    #[test]
    fn sha256d_is_deterministic_and_differs_on_input() {
        assert_eq!(sha256d(b"a"), sha256d(b"a"));
        assert_ne!(sha256d(b"a"), sha256d(b"b"));
    }

    #[test]
    fn hash160_is_twenty_bytes() {
        let out = hash160(b"hello");
        assert_eq!(out.len(), 20);
        assert_eq!(hash160(b"hello"), hash160(b"hello"));
    }
}
