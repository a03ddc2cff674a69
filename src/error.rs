//! `BuilderError`: the six-kind error taxonomy from spec.md §7, carrying
//! the exact message strings the spec's tests assert on. Grounded on the
//! teacher's one-`thiserror`-enum-per-concern convention
//! (`TxError`/`SignerError`/`EncodingError`).

use crate::{address::AddressError, crypto::CryptoError, script::ScriptError, tx::TxError};

/// All ways a `TransactionBuilder` operation can fail.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BuilderError {
    /// Out-of-range integers, unknown address network, unrecognized input
    /// reference, unsupported redeem script type, no matching pubkey slot.
    #[error("{0}")]
    InvalidArgument(String),
    /// A mutation refused because it would invalidate signatures; signing
    /// with missing outputs; building with no inputs/outputs.
    #[error("{0}")]
    InvalidState(String),
    /// Outpoint already present; signature slot already filled.
    #[error("{0}")]
    Duplicate(String),
    /// `build()` invoked before all inputs are fully signed.
    #[error("{0}")]
    Incomplete(String),
    /// Computed fee rate exceeds `maximum_fee_rate`.
    #[error("{0}")]
    AbsurdFee(String),
    /// A path explicitly left for future work (bare witness script,
    /// unknown prev-out type).
    #[error("{0}")]
    Unimplemented(String),
}

impl BuilderError {
    /// "No, this would invalidate signatures" — the Mutation Gate's single
    /// refusal message (spec.md §4.4).
    pub fn would_invalidate_signatures() -> Self {
        BuilderError::InvalidState("No, this would invalidate signatures".to_string())
    }

    /// "Expected Uint32" — `setLockTime`/`setVersion` range check.
    pub fn expected_uint32() -> Self {
        BuilderError::InvalidArgument("Expected Uint32".to_string())
    }

    /// "Inconsistent network" — signer's keyPair-vs-builder network check.
    pub fn inconsistent_network() -> Self {
        BuilderError::InvalidArgument("Inconsistent network".to_string())
    }

    /// "No input at index: $vin".
    pub fn no_input_at_index(vin: usize) -> Self {
        BuilderError::InvalidArgument(format!("No input at index: {}", vin))
    }

    /// "Transaction needs outputs".
    pub fn needs_outputs() -> Self {
        BuilderError::InvalidState("Transaction needs outputs".to_string())
    }

    /// "Inconsistent redeemScript".
    pub fn inconsistent_redeem_script() -> Self {
        BuilderError::InvalidArgument("Inconsistent redeemScript".to_string())
    }

    /// "PrevOutScript must be P2SH".
    pub fn prevout_must_be_p2sh() -> Self {
        BuilderError::InvalidState("PrevOutScript must be P2SH".to_string())
    }

    /// "Redeem script inconsistent with prevOutScript".
    pub fn redeem_script_inconsistent() -> Self {
        BuilderError::InvalidState("Redeem script inconsistent with prevOutScript".to_string())
    }

    /// "<type> not supported as redeemScript (<asm>)".
    pub fn redeem_script_unsupported(type_name: &str, asm: &str) -> Self {
        BuilderError::Unimplemented(format!("{} not supported as redeemScript ({})", type_name, asm))
    }

    /// "Signature already exists".
    pub fn signature_already_exists() -> Self {
        BuilderError::Duplicate("Signature already exists".to_string())
    }

    /// "Key pair cannot sign for this input".
    pub fn key_cannot_sign() -> Self {
        BuilderError::InvalidArgument("Key pair cannot sign for this input".to_string())
    }

    /// "Not enough information".
    pub fn not_enough_information() -> Self {
        BuilderError::Incomplete("Not enough information".to_string())
    }

    /// "Unknown input type".
    pub fn unknown_input_type() -> Self {
        BuilderError::Incomplete("Unknown input type".to_string())
    }

    /// "Transaction is not complete".
    pub fn transaction_not_complete() -> Self {
        BuilderError::Incomplete("Transaction is not complete".to_string())
    }

    /// "Transaction has absurd fees".
    pub fn absurd_fee() -> Self {
        BuilderError::AbsurdFee("Transaction has absurd fees".to_string())
    }

    /// "Invalid version or Network mismatch".
    pub fn invalid_network() -> Self {
        BuilderError::InvalidArgument("Invalid version or Network mismatch".to_string())
    }

    /// "Duplicate TxOut: <txid>:<vout>".
    pub fn duplicate_outpoint(txid_hex: &str, vout: u32) -> Self {
        BuilderError::Duplicate(format!("Duplicate TxOut: {}:{}", txid_hex, vout))
    }

    /// "Transaction needs inputs and outputs" — `build`'s precondition.
    pub fn needs_inputs_and_outputs() -> Self {
        BuilderError::InvalidState("Transaction needs inputs and outputs".to_string())
    }
}

impl From<CryptoError> for BuilderError {
    fn from(e: CryptoError) -> Self {
        BuilderError::InvalidArgument(e.to_string())
    }
}

impl From<ScriptError> for BuilderError {
    fn from(e: ScriptError) -> Self {
        BuilderError::InvalidArgument(e.to_string())
    }
}

impl From<AddressError> for BuilderError {
    fn from(_: AddressError) -> Self {
        BuilderError::invalid_network()
    }
}

impl From<TxError> for BuilderError {
    fn from(e: TxError) -> Self {
        match e {
            TxError::NoInputAtIndex(i) => BuilderError::no_input_at_index(i),
            other => BuilderError::InvalidArgument(other.to_string()),
        }
    }
}
