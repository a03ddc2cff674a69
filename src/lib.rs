//! A staged, safety-preserving construction engine for Bitcoin-compatible
//! transactions: accepts inputs and outputs incrementally, tracks partial
//! signing state, refuses mutations that would invalidate a previously
//! computed signature, and emits a fully-signed or incomplete transaction
//! for multi-party workflows.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(unused_extern_crates)]

pub mod address;
pub mod builder;
pub mod crypto;
pub mod error;
pub mod hashes;
pub mod script;
pub mod tx;

pub use address::{Mainnet, NetworkParams, Signet, Testnet};
pub use builder::{OutputTarget, SignOptions, TransactionBuilder, TxRef};
pub use crypto::KeyPair;
pub use error::BuilderError;
pub use tx::Transaction;
