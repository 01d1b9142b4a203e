//! Happy Crypto - Cryptographic primitives for the Happy wire protocol.
//!
//! This crate provides:
//! - Ed25519 key pairs with secure memory handling (runtime identity,
//!   audit-chain signing)
//! - BLAKE3 content hashing for audit chains and verification
//! - AES-256-GCM envelope encryption for relay-blind update and ephemeral
//!   payloads, with HKDF-SHA256 key derivation from the account master
//!   secret
//!
//! # Security Philosophy
//!
//! **Cryptography over trust in the relay.** The relay routes and stores
//! opaque ciphertext; it never holds a key capable of reading session
//! content. Authorization within a session comes from ed25519 signatures
//! and capability tokens, not from the transport layer.
//!
//! # Example
//!
//! ```
//! use happy_crypto::{KeyPair, ContentHash};
//!
//! // Generate a new key pair
//! let keypair = KeyPair::generate();
//!
//! // Sign a message
//! let message = b"important data";
//! let signature = keypair.sign(message);
//!
//! // Verify the signature
//! assert!(keypair.verify(message, &signature).is_ok());
//!
//! // Hash content
//! let hash = ContentHash::hash(message);
//! println!("Hash: {}", hash.to_hex());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod envelope;
mod error;
mod hash;
mod keypair;
mod signature;
mod verifier;

pub use envelope::{ENVELOPE_VERSION, EnvelopeKey, derive_envelope_key};
pub use error::{CryptoError, CryptoResult};
pub use hash::ContentHash;
pub use keypair::{KeyPair, PublicKey};
pub use signature::Signature;
pub use verifier::{KeyId, SignatureVerifier};
