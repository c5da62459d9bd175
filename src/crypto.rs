//! Cryptographic primitives for StarChain
//!
//! Wallet addresses are the hex SHA-256 of a compressed secp256k1 public key.
//! Signatures are recoverable ECDSA signatures, transported as base64 of a
//! header byte followed by the 64-byte compact form, so a verifier only needs
//! the message, the claimed address and the signature.

use crate::error::CryptoError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::{COMPACT_SIGNATURE_SIZE, PUBLIC_KEY_SIZE},
    ecdsa::{RecoverableSignature, RecoveryId},
    All, Message, PublicKey, Secp256k1, SecretKey,
};
use sha2::{Digest, Sha256};

/// A thread-safe, lazily initialized Secp256k1 context.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// Domain separator mixed into every signed message digest.
const MESSAGE_MAGIC: &[u8] = b"StarChain Signed Message:\n";

/// Header byte base for compressed-key recoverable signatures.
const COMPRESSED_HEADER_BASE: u8 = 27 + 4;

/// Header byte plus the compact signature.
pub const ENCODED_SIGNATURE_SIZE: usize = COMPACT_SIGNATURE_SIZE + 1;

/// Hex-encoded wallet address.
pub type Address = String;

/// Canonical form of a user-supplied address: hex is compared lowercase.
pub fn normalize_address(address: &str) -> Address {
    address.trim().to_ascii_lowercase()
}

/// Derive the wallet address of a public key.
pub fn address_from_public_key(public_key: &PublicKey) -> Address {
    let pubkey_bytes: [u8; PUBLIC_KEY_SIZE] = public_key.serialize();
    hex::encode(Sha256::digest(pubkey_bytes))
}

/// Digest that gets signed for a text message: double SHA-256 over the
/// magic prefix, the message length and the message bytes.
pub fn message_digest(message: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(MESSAGE_MAGIC);
    hasher.update((message.len() as u64).to_le_bytes());
    hasher.update(message.as_bytes());
    let first = hasher.finalize();
    Sha256::digest(first).into()
}

/// Client-side key material. The ledger never holds one of these; it exists
/// so wallets and tests can produce signatures the ledger accepts.
#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generates a new random KeyPair using the OS random number generator.
    pub fn generate() -> Self {
        let secret_key = SecretKey::new(&mut OsRng);
        Self::from_secret_key(secret_key)
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    /// Wallet address owned by this key.
    pub fn address(&self) -> Address {
        address_from_public_key(&self.public_key)
    }

    /// Signs a text message and returns the base64 recoverable signature.
    pub fn sign_message(&self, message: &str) -> String {
        let message = Message::from_digest(message_digest(message));
        let signature = SECP256K1_CONTEXT.sign_ecdsa_recoverable(&message, &self.secret_key);
        let (recovery_id, compact) = signature.serialize_compact();

        let mut encoded = [0u8; ENCODED_SIGNATURE_SIZE];
        encoded[0] = COMPRESSED_HEADER_BASE + recovery_id.to_i32() as u8;
        encoded[1..].copy_from_slice(&compact);
        STANDARD.encode(encoded)
    }
}

/// Recovers the address that produced `signature` over `message`.
pub fn recover_address(message: &str, signature: &str) -> Result<Address, CryptoError> {
    let bytes = STANDARD
        .decode(signature.trim())
        .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;
    if bytes.len() != ENCODED_SIGNATURE_SIZE {
        return Err(CryptoError::InvalidLength {
            expected: ENCODED_SIGNATURE_SIZE,
            actual: bytes.len(),
        });
    }

    let header = bytes[0];
    if !(27..=34).contains(&header) {
        return Err(CryptoError::InvalidHeader(header));
    }
    let recovery_id = RecoveryId::from_i32(((header - 27) & 3) as i32)
        .map_err(|e| CryptoError::Recovery(e.to_string()))?;
    let signature = RecoverableSignature::from_compact(&bytes[1..], recovery_id)
        .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;

    let message = Message::from_digest(message_digest(message));
    let public_key = SECP256K1_CONTEXT
        .recover_ecdsa(&message, &signature)
        .map_err(|e| CryptoError::Recovery(e.to_string()))?;

    Ok(address_from_public_key(&public_key))
}

/// Returns whether `signature` was produced over exactly `message` by the key
/// owning `address`. Malformed signatures are simply not valid.
pub fn verify_message(message: &str, address: &str, signature: &str) -> bool {
    match recover_address(message, signature) {
        Ok(recovered) => recovered.eq_ignore_ascii_case(address.trim()),
        Err(e) => {
            tracing::debug!(error = %e, "signature rejected");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_generation() {
        let keypair = KeyPair::generate();
        let address = keypair.address();
        // Address is a hex SHA-256 hash
        assert_eq!(address.len(), 64);
        assert!(address.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_signing_and_verification() {
        let keypair = KeyPair::generate();
        let message = "Hello, StarChain!";

        let signature = keypair.sign_message(message);

        assert!(verify_message(message, &keypair.address(), &signature));
        assert_eq!(recover_address(message, &signature).unwrap(), keypair.address());
    }

    #[test]
    fn test_address_comparison_ignores_case() {
        let keypair = KeyPair::generate();
        let signature = keypair.sign_message("case");
        assert!(verify_message("case", &keypair.address().to_uppercase(), &signature));
    }

    #[test]
    fn test_wrong_address() {
        let keypair1 = KeyPair::generate();
        let keypair2 = KeyPair::generate();

        let signature = keypair1.sign_message("Test message");
        assert!(!verify_message("Test message", &keypair2.address(), &signature));
    }

    #[test]
    fn test_normalize_address() {
        let keypair = KeyPair::generate();
        let address = keypair.address();
        assert_eq!(normalize_address(&format!("  {}\n", address.to_uppercase())), address);
        assert_eq!(normalize_address(&address), address);
    }

    #[test]
    fn test_tampered_message() {
        let keypair = KeyPair::generate();
        let signature = keypair.sign_message("Original message");

        assert!(!verify_message("Tampered message", &keypair.address(), &signature));
    }

    #[test]
    fn test_malformed_signatures() {
        let keypair = KeyPair::generate();
        let address = keypair.address();

        assert!(matches!(
            recover_address("m", "not base64!"),
            Err(CryptoError::InvalidEncoding(_))
        ));
        assert_eq!(
            recover_address("m", &STANDARD.encode([0u8; 10])),
            Err(CryptoError::InvalidLength {
                expected: ENCODED_SIGNATURE_SIZE,
                actual: 10
            })
        );
        assert_eq!(
            recover_address("m", &STANDARD.encode([0u8; ENCODED_SIGNATURE_SIZE])),
            Err(CryptoError::InvalidHeader(0))
        );
        assert!(!verify_message("m", &address, ""));
    }

    #[test]
    fn test_digest_binds_message_length() {
        assert_ne!(message_digest("ab"), message_digest("a"));
        assert_eq!(message_digest("abc"), message_digest("abc"));
    }
}
