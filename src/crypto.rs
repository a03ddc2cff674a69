//! Elliptic-curve key pair operations: loading a private key from WIF and
//! signing a 32-byte digest, per spec.md §6 "Key pair".

use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};

use crate::hashes::sha256d;

/// Errors arising from key material handling.
#[derive(thiserror::Error, Debug)]
pub enum CryptoError {
    /// The WIF string was not valid base58check.
    #[error("Invalid WIF: bad base58check encoding")]
    BadEncoding,
    /// The WIF checksum did not match its payload.
    #[error("Invalid WIF: checksum mismatch")]
    BadChecksum,
    /// The decoded payload was not a recognized WIF length.
    #[error("Invalid WIF: unexpected payload length")]
    BadLength,
    /// The 32-byte payload was not a valid secp256k1 scalar.
    #[error("Invalid private key")]
    BadPrivateKey,
}

/// WIF version byte for mainnet private keys.
pub const WIF_MAINNET: u8 = 0x80;
/// WIF version byte for testnet/signet private keys.
pub const WIF_TESTNET: u8 = 0xef;

/// A secp256k1 key pair capable of signing pre-hashed 32-byte digests.
///
/// `network`, when set, records which WIF version byte the key was loaded
/// under (mainnet or testnet/signet); the builder checks this against its
/// own network before signing (spec.md §4.5 "Inconsistent network").
pub struct KeyPair {
    signing_key: SigningKey,
    /// Compressed SEC1 public key, 33 bytes.
    pub public_key: [u8; 33],
    /// WIF version byte the key was loaded from, if loaded from WIF.
    pub network: Option<u8>,
}

impl KeyPair {
    /// Construct a key pair directly from a 32-byte scalar. Always
    /// compressed, network-agnostic (`network = None`).
    pub fn from_secret_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        let key_bytes: k256::FieldBytes = bytes.into();
        let signing_key =
            SigningKey::from_bytes(&key_bytes).map_err(|_| CryptoError::BadPrivateKey)?;
        let verifying_key = VerifyingKey::from(&signing_key);
        let mut public_key = [0u8; 33];
        public_key.copy_from_slice(verifying_key.to_encoded_point(true).as_bytes());
        Ok(KeyPair {
            signing_key,
            public_key,
            network: None,
        })
    }

    /// Decode a WIF-encoded private key. Supports only compressed-pubkey
    /// WIF (the uncompressed form is not produced by any template this
    /// crate assembles).
    pub fn from_wif(wif: &str) -> Result<Self, CryptoError> {
        let raw = bs58::decode(wif)
            .into_vec()
            .map_err(|_| CryptoError::BadEncoding)?;
        if raw.len() < 5 {
            return Err(CryptoError::BadLength);
        }
        let (payload, checksum) = raw.split_at(raw.len() - 4);
        let expect = sha256d(payload);
        if &expect[..4] != checksum {
            return Err(CryptoError::BadChecksum);
        }
        let version = payload[0];
        let body = &payload[1..];
        // 32-byte key + trailing 0x01 compression marker == 33 bytes.
        if body.len() != 33 || body[32] != 0x01 {
            return Err(CryptoError::BadLength);
        }
        let mut secret = [0u8; 32];
        secret.copy_from_slice(&body[..32]);
        let mut pair = Self::from_secret_bytes(secret)?;
        pair.network = Some(version);
        Ok(pair)
    }

    /// Sign a 32-byte sighash digest, returning a raw (not DER-encoded)
    /// signature suitable for the script codec's `encode_signature`.
    pub fn sign(&self, digest: &[u8; 32]) -> Signature {
        // The digest is already the output of a double-SHA256 commitment;
        // sign it directly rather than hashing again.
        self.signing_key
            .sign_prehash(digest)
            .expect("prehash signing over a 32-byte digest cannot fail")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn it_round_trips_a_known_wif_key() {
        // priv = 0x00...01, compressed mainnet WIF, address
        // 1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH (spec.md §8 seed case).
        let wif = "KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn";
        let kp = KeyPair::from_wif(wif).expect("valid WIF");
        assert_eq!(kp.network, Some(WIF_MAINNET));
        assert_eq!(
            hex::encode(kp.public_key),
            "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
        );
    }

    #[test]
    fn it_rejects_bad_checksum() {
        let mut wif = "KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWm".to_string();
        wif.push('x');
        assert!(KeyPair::from_wif(&wif).is_err());
    }

    #[test]
    fn it_signs_a_digest() {
        let kp = KeyPair::from_secret_bytes([1u8; 32]).unwrap();
        let digest = sha256d(b"message");
        let sig = kp.sign(&digest);
        assert!(!sig.to_der().as_bytes().is_empty());
    }
}
