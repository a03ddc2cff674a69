//! `TransactionBuilder`: the staged, safety-preserving construction engine
//! (spec.md §2–§4, §7). Holds the nascent `Transaction`, the parallel
//! per-input signing state list, the duplicate-outpoint set, and the
//! network/fee-rate configuration (spec.md §3).
//!
//! The façade's shape — a struct owning a `Transaction` plus per-input
//! metadata, mutated through checked methods — is grounded on
//! `core::builder::TxBuilder` and `bitcoin::builder::{LegacyBuilder,
//! WitnessBuilder}`; unlike the teacher's consuming fluent builder, this
//! type mutates through `&mut self`, matching the signer/gate pattern in
//! `psbt::roles::signer::PSTSigner` (`can_sign_input`/`sign_input` take
//! `&mut self`) since the spec requires rejecting some mutations outright
//! rather than always producing a new value.

mod assemble;
mod state;

pub use state::{expand_input, expand_output, ExpandedInput, ExpandedOutput, InputSigningState};

use std::collections::HashSet;
use std::marker::PhantomData;

use crate::{
    address::{to_output_script, NetworkParams},
    crypto::KeyPair,
    error::BuilderError,
    hashes::hash160,
    script::{classify_output, p2pkh_script, p2sh_script, p2wpkh_pubkey_hash, Script, ScriptType},
    tx::{Outpoint, SighashFlag, SighashMode, Transaction, SIGHASH_ALL},
};

/// Default safety ceiling on satoshis-per-virtual-byte (spec.md §3).
pub const DEFAULT_MAX_FEE_RATE: u64 = 2500;

/// How a caller identifies the prior transaction an input spends
/// (spec.md §4.2, §9 "Dynamic input reference").
pub enum TxRef {
    /// The prior transaction's internal (little-endian) txid.
    Hash([u8; 32]),
    /// A 64-character big-endian (block-explorer order) hex txid.
    HashHex(String),
    /// A full transaction; its referenced output's script and value are
    /// harvested automatically.
    Transaction(Transaction),
}

/// How a caller identifies a new output's destination (spec.md §4.3).
pub enum OutputTarget {
    /// An address string, resolved against the builder's network.
    Address(String),
    /// A raw output script.
    Script(Script),
}

/// Optional context for `sign` beyond the required `vin` and `key_pair`
/// (spec.md §4.5).
#[derive(Default, Clone)]
pub struct SignOptions {
    /// Overrides classification of `prev_out_script` when it is already
    /// known by the caller but not yet recorded.
    pub prev_out_script_type: Option<ScriptType>,
    /// A P2SH redeem script to construct/verify the wrapper from.
    pub redeem_script: Option<Script>,
    /// The input's committed value, required for witness-hashed inputs.
    pub witness_value: Option<u64>,
    /// Reserved for bare witness-script signing (`Unimplemented`,
    /// spec.md §1 Non-goals, §4.5 step 3).
    pub witness_script: Option<Script>,
    /// The SIGHASH flag byte; defaults to `SIGHASH_ALL`.
    pub hash_type: Option<u8>,
}

/// The staged transaction construction engine (spec.md §1–§4).
pub struct TransactionBuilder<N: NetworkParams> {
    /// The nascent transaction.
    pub tx: Transaction,
    /// One signing state per `tx.ins` entry, same index (spec.md §3
    /// Invariant 1).
    pub inputs: Vec<InputSigningState>,
    /// `"txid_hex:vout"` set guaranteeing outpoint uniqueness.
    pub prev_tx_set: HashSet<String>,
    /// Safety ceiling on fee rate, consulted only by `build`.
    pub maximum_fee_rate: u64,
    _network: PhantomData<N>,
}

impl<N: NetworkParams> Default for TransactionBuilder<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: NetworkParams> TransactionBuilder<N> {
    /// An empty builder: version 2, locktime 0, no inputs or outputs
    /// (spec.md §3 "Lifecycle").
    pub fn new() -> Self {
        TransactionBuilder {
            tx: Transaction::new(),
            inputs: vec![],
            prev_tx_set: HashSet::new(),
            maximum_fee_rate: DEFAULT_MAX_FEE_RATE,
            _network: PhantomData,
        }
    }

    // ---- Mutation Gate (spec.md §4.4) ----

    /// True unless some existing signature lacks `SIGHASH_ANYONECANPAY`.
    pub fn can_modify_inputs(&self) -> bool {
        self.all_signature_flags()
            .iter()
            .all(|flag| flag.anyone_can_pay)
    }

    /// True unless some existing signature's mode forbids the addition
    /// given the current input/output counts.
    pub fn can_modify_outputs(&self) -> bool {
        let n_inputs = self.tx.ins.len();
        let n_outputs = self.tx.outs.len();
        self.all_signature_flags().iter().all(|flag| match flag.mode {
            SighashMode::None => true,
            SighashMode::Single => n_outputs <= n_inputs,
            SighashMode::All => false,
        })
    }

    fn all_signature_flags(&self) -> Vec<SighashFlag> {
        self.inputs
            .iter()
            .flat_map(|state| state.signatures.iter())
            .filter_map(|sig| sig.as_ref())
            .filter_map(|sig| sig.last().map(|b| SighashFlag::from_u8(*b)))
            .collect()
    }

    fn any_signature_exists(&self) -> bool {
        self.inputs
            .iter()
            .any(|state| state.signatures.iter().any(|s| s.is_some()))
    }

    /// `setVersion(v)` (spec.md §4.4). Accepts `i64` so out-of-`u32`-range
    /// values (negative, or `>= 2^32`) can be rejected rather than
    /// silently truncated.
    pub fn set_version(&mut self, version: i64) -> Result<(), BuilderError> {
        let version = check_uint32(version)?;
        self.tx.version = version;
        Ok(())
    }

    /// `setLockTime(v)` (spec.md §4.4). Refuses if any signature exists
    /// on any input.
    pub fn set_lock_time(&mut self, locktime: i64) -> Result<(), BuilderError> {
        let locktime = check_uint32(locktime)?;
        if self.any_signature_exists() {
            return Err(BuilderError::would_invalidate_signatures());
        }
        self.tx.locktime = locktime;
        Ok(())
    }

    // ---- addInput / addOutput (spec.md §4.2, §4.3) ----

    /// `addInput(txRef, vout, sequence?, prevOutScript?)` (spec.md §4.2).
    pub fn add_input(
        &mut self,
        tx_ref: TxRef,
        vout: u32,
        sequence: Option<u32>,
        prev_out_script: Option<Script>,
    ) -> Result<usize, BuilderError> {
        if !self.can_modify_inputs() {
            return Err(BuilderError::would_invalidate_signatures());
        }

        let (txid, harvested_script, harvested_value) = match tx_ref {
            TxRef::Hash(h) => (h, None, None),
            TxRef::HashHex(hex) => (parse_be_txid(&hex)?, None, None),
            TxRef::Transaction(prior) => {
                let txid = prior.txid();
                let out = prior.outs.get(vout as usize);
                (
                    txid,
                    out.map(|o| o.script_pubkey.clone()),
                    out.map(|o| o.value),
                )
            }
        };

        if txid == [0u8; 32] {
            return Err(BuilderError::InvalidArgument(
                "Coinbase inputs are not supported".to_string(),
            ));
        }

        let key = outpoint_key(&txid, vout);
        if self.prev_tx_set.contains(&key) {
            return Err(BuilderError::duplicate_outpoint(&be_hex(&txid), vout));
        }

        let idx = self
            .tx
            .add_input(Outpoint::new(txid, vout), sequence.unwrap_or(0xffff_ffff));
        self.prev_tx_set.insert(key);

        let mut state = InputSigningState::new(sequence.unwrap_or(0xffff_ffff));
        if let Some(script) = prev_out_script.or(harvested_script) {
            state.adopt_prev_out_script(script);
        }
        if let Some(value) = harvested_value {
            state.value = Some(value);
        }
        self.inputs.push(state);

        debug_assert_eq!(self.inputs.len(), self.tx.ins.len());
        log::debug!("added input {} ({}: {})", idx, be_hex(&txid), vout);
        Ok(idx)
    }

    /// `addOutput(target, value)` (spec.md §4.3).
    pub fn add_output(&mut self, target: OutputTarget, value: u64) -> Result<usize, BuilderError> {
        if !self.can_modify_outputs() {
            return Err(BuilderError::would_invalidate_signatures());
        }
        let script = match target {
            OutputTarget::Script(s) => s,
            OutputTarget::Address(addr) => to_output_script::<N>(&addr)?,
        };
        let idx = self.tx.add_output(script, value);
        log::debug!("added output {} (value {})", idx, value);
        Ok(idx)
    }

    // ---- Signer (spec.md §4.5) ----

    fn needs_outputs(&self, vin: usize, hash_type: u8) -> bool {
        let flag = SighashFlag::from_u8(hash_type);
        if flag.mode == SighashMode::All && self.tx.outs.is_empty() {
            return true;
        }
        let carries_non_none_signature = self.inputs[vin].signatures.iter().any(|sig| {
            sig.as_ref().is_some_and(|s| {
                s.last()
                    .map(|b| SighashFlag::from_u8(*b).mode != SighashMode::None)
                    .unwrap_or(false)
            })
        });
        carries_non_none_signature && self.tx.outs.is_empty()
    }

    /// `sign(vin, keyPair, ...)` (spec.md §4.5).
    pub fn sign(
        &mut self,
        vin: usize,
        key_pair: &KeyPair,
        opts: SignOptions,
    ) -> Result<(), BuilderError> {
        if let Some(wif_version) = key_pair.network {
            if wif_version != N::WIF_VERSION {
                return Err(BuilderError::inconsistent_network());
            }
        }
        if vin >= self.inputs.len() {
            return Err(BuilderError::no_input_at_index(vin));
        }
        let hash_type = opts.hash_type.unwrap_or(SIGHASH_ALL);
        if self.needs_outputs(vin, hash_type) {
            return Err(BuilderError::needs_outputs());
        }
        if let (Some(new_rs), Some(existing_rs)) =
            (&opts.redeem_script, &self.inputs[vin].redeem_script)
        {
            if new_rs.as_bytes() != existing_rs.as_bytes() {
                return Err(BuilderError::inconsistent_redeem_script());
            }
        }

        if !self.inputs[vin].can_sign() {
            self.infer_signing_context(vin, key_pair, &opts)?;
        }

        let flag = SighashFlag::from_u8(hash_type);
        let sign_script = self.inputs[vin]
            .sign_script
            .clone()
            .expect("context inference populates sign_script");
        let digest = if self.inputs[vin].has_witness {
            let value = self.inputs[vin]
                .value
                .ok_or_else(|| BuilderError::InvalidState("Witness value is required".to_string()))?;
            self.tx
                .witness_v0_sighash(vin, &sign_script, value, flag)?
        } else {
            self.tx.legacy_sighash(vin, &sign_script, flag)?
        };

        let raw_sig = key_pair.sign(&digest);
        let encoded = crate::script::encode_signature(&raw_sig, hash_type);

        let slot = self.inputs[vin]
            .pubkeys
            .iter()
            .position(|pk| pk == &Some(key_pair.public_key));
        match slot {
            Some(i) => {
                if self.inputs[vin].signatures[i].is_some() {
                    return Err(BuilderError::signature_already_exists());
                }
                self.inputs[vin].signatures[i] = Some(encoded);
                log::trace!("signed input {} at slot {}", vin, i);
                Ok(())
            }
            None => Err(BuilderError::key_cannot_sign()),
        }
    }

    fn infer_signing_context(
        &mut self,
        vin: usize,
        key_pair: &KeyPair,
        opts: &SignOptions,
    ) -> Result<(), BuilderError> {
        if let Some(witness_value) = opts.witness_value {
            if let Some(existing) = self.inputs[vin].value {
                if existing != witness_value {
                    return Err(BuilderError::InvalidArgument(
                        "witnessValue does not match the input's known value".to_string(),
                    ));
                }
            }
            self.inputs[vin].value = Some(witness_value);
        }

        if let Some(redeem_script) = &opts.redeem_script {
            self.infer_from_redeem_script(vin, key_pair, redeem_script)?;
        } else if opts.witness_script.is_some() {
            return Err(BuilderError::Unimplemented(
                "bare witness script signing is not supported".to_string(),
            ));
        } else {
            self.infer_from_prev_out(vin, key_pair, opts.prev_out_script_type)?;
        }
        Ok(())
    }

    fn infer_from_redeem_script(
        &mut self,
        vin: usize,
        key_pair: &KeyPair,
        redeem_script: &Script,
    ) -> Result<(), BuilderError> {
        let script_hash = hash160(redeem_script.as_bytes());
        if let Some(prev_out_script) = self.inputs[vin].prev_out_script.clone() {
            if classify_output(&prev_out_script) != ScriptType::P2sh {
                return Err(BuilderError::prevout_must_be_p2sh());
            }
            if crate::script::p2sh_script_hash(&prev_out_script) != script_hash {
                return Err(BuilderError::redeem_script_inconsistent());
            }
        }

        let redeem_type = classify_output(redeem_script);
        let expanded = expand_output(redeem_script, Some(key_pair.public_key));
        if expanded.pubkeys.is_empty() {
            return Err(BuilderError::redeem_script_unsupported(
                &redeem_type.to_string(),
                &redeem_script.to_asm(),
            ));
        }

        let state = &mut self.inputs[vin];
        state.redeem_script = Some(redeem_script.clone());
        state.redeem_script_type = Some(redeem_type);
        state.prev_out_type = Some(ScriptType::P2sh);
        state.prev_out_script.get_or_insert_with(|| p2sh_script(&script_hash));
        state.pubkeys = expanded.pubkeys;
        state.signatures = expanded.signatures;
        state.max_signatures = expanded.max_signatures;

        match redeem_type {
            ScriptType::P2wpkh => {
                let hash = p2wpkh_pubkey_hash(redeem_script);
                state.sign_script = Some(p2pkh_script(&hash));
                state.has_witness = true;
            }
            ScriptType::P2pkh => {
                state.sign_script = Some(redeem_script.clone());
                state.has_witness = false;
            }
            other => {
                return Err(BuilderError::redeem_script_unsupported(
                    &other.to_string(),
                    &redeem_script.to_asm(),
                ))
            }
        }
        Ok(())
    }

    fn infer_from_prev_out(
        &mut self,
        vin: usize,
        key_pair: &KeyPair,
        prev_out_script_type: Option<ScriptType>,
    ) -> Result<(), BuilderError> {
        let effective_type = prev_out_script_type.or(self.inputs[vin].prev_out_type);
        let state = &mut self.inputs[vin];
        match effective_type {
            Some(ScriptType::P2wpkh) => {
                let hash = state
                    .prev_out_script
                    .as_ref()
                    .map(p2wpkh_pubkey_hash)
                    .unwrap_or_else(|| hash160(&key_pair.public_key));
                state.sign_script = Some(p2pkh_script(&hash));
                state.prev_out_type = Some(ScriptType::P2wpkh);
                state.has_witness = true;
                state.pubkeys = vec![Some(key_pair.public_key)];
                state.signatures = vec![None];
                state.max_signatures = 1;
            }
            Some(ScriptType::P2pkh) | None => {
                let sign_script = state
                    .prev_out_script
                    .clone()
                    .unwrap_or_else(|| p2pkh_script(&hash160(&key_pair.public_key)));
                state.sign_script = Some(sign_script);
                state.prev_out_type = Some(ScriptType::P2pkh);
                state.has_witness = false;
                state.pubkeys = vec![Some(key_pair.public_key)];
                state.signatures = vec![None];
                state.max_signatures = 1;
            }
            Some(other) => {
                return Err(BuilderError::Unimplemented(format!(
                    "{} prev-out scripts are not supported by the signer",
                    other
                )))
            }
        }
        Ok(())
    }

    // ---- build / buildIncomplete (spec.md §4.6) ----

    fn build_internal(&self, allow_incomplete: bool) -> Result<Transaction, BuilderError> {
        if !allow_incomplete && (self.tx.ins.is_empty() || self.tx.outs.is_empty()) {
            return Err(BuilderError::needs_inputs_and_outputs());
        }
        if !allow_incomplete && self.inputs.iter().any(|s| !s.is_fully_signed()) {
            return Err(BuilderError::transaction_not_complete());
        }

        let mut clone = self.tx.clone();
        for (i, state) in self.inputs.iter().enumerate() {
            let (script_sig, witness) = assemble::build_by_type(state, allow_incomplete)?;
            clone.set_input_script(i, script_sig);
            clone.set_witness(i, witness);
        }

        if !allow_incomplete {
            let total_in: u128 = self
                .inputs
                .iter()
                .filter_map(|s| s.value)
                .map(u128::from)
                .sum();
            let total_out: u128 = self.tx.outs.iter().map(|o| u128::from(o.value)).sum();
            let fee = total_in.saturating_sub(total_out);
            let vsize = clone.virtual_size().max(1) as u128;
            let fee_rate = fee / vsize;
            log::debug!("computed fee rate {} sat/vB", fee_rate);
            if fee_rate > u128::from(self.maximum_fee_rate) {
                return Err(BuilderError::absurd_fee());
            }
        }

        Ok(clone)
    }

    /// Render a fully-signed transaction; fails if any input is missing
    /// data or the fee rate is absurd.
    pub fn build(&self) -> Result<Transaction, BuilderError> {
        self.build_internal(false)
    }

    /// Render a possibly-partial transaction, leaving unsigned inputs
    /// blank rather than failing (spec.md §4.6, §7).
    pub fn build_incomplete(&self) -> Result<Transaction, BuilderError> {
        self.build_internal(true)
    }

    // ---- fromTransaction (spec.md §4.7) ----

    /// Reconstruct a builder from an existing transaction, replaying
    /// outputs first so adding inputs does not reject them via the
    /// Mutation Gate, then appending each input with its observed
    /// scriptSig/witness recovered by the Input Expander.
    pub fn from_transaction(tx: &Transaction) -> Self {
        let mut builder = Self::new();
        builder.tx.version = tx.version;
        builder.tx.locktime = tx.locktime;

        for out in &tx.outs {
            builder.tx.add_output(out.script_pubkey.clone(), out.value);
        }

        for (i, txin) in tx.ins.iter().enumerate() {
            let witness = tx.witnesses.get(i).cloned().unwrap_or_default();
            builder
                .tx
                .add_input(txin.outpoint, txin.sequence);
            builder.prev_tx_set.insert(outpoint_key(
                &txin.outpoint.txid,
                txin.outpoint.vout,
            ));

            let expanded = expand_input(&txin.script_sig, &witness);
            let mut state = InputSigningState::new(txin.sequence);
            state.script = Some(txin.script_sig.clone());
            state.witness = Some(witness);
            state.prev_out_script = expanded.prev_out_script;
            state.prev_out_type = expanded.prev_out_type;
            state.redeem_script = expanded.redeem_script;
            state.redeem_script_type = expanded.redeem_script_type;
            state.sign_script = expanded.sign_script;
            state.has_witness = expanded.has_witness;
            state.pubkeys = expanded.pubkeys;
            state.max_signatures = state.pubkeys.len();
            state.signatures = expanded.signatures;
            builder.inputs.push(state);
        }

        builder
    }
}

fn check_uint32(v: i64) -> Result<u32, BuilderError> {
    if v < 0 || v > u32::MAX as i64 {
        Err(BuilderError::expected_uint32())
    } else {
        Ok(v as u32)
    }
}

fn outpoint_key(txid: &[u8; 32], vout: u32) -> String {
    format!("{}:{}", be_hex(txid), vout)
}

fn be_hex(txid: &[u8; 32]) -> String {
    let mut be = *txid;
    be.reverse();
    hex::encode(be)
}

fn parse_be_txid(txid_hex: &str) -> Result<[u8; 32], BuilderError> {
    let decoded: Vec<u8> = hex::decode(txid_hex)
        .map_err(|_| BuilderError::InvalidArgument("invalid txid hex".to_string()))?;
    let mut bytes: [u8; 32] = decoded
        .try_into()
        .map_err(|_| BuilderError::InvalidArgument("txid hex must be 64 characters".to_string()))?;
    bytes.reverse();
    Ok(bytes)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{address::Mainnet, crypto::KeyPair};

    fn key() -> KeyPair {
        KeyPair::from_wif("KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn").unwrap()
    }

    fn tx_hash() -> [u8; 32] {
        let mut h = [0u8; 32];
        h[0] = 1;
        h
    }

    #[test]
    fn invariant_inputs_equals_states() {
        let mut b: TransactionBuilder<Mainnet> = TransactionBuilder::new();
        b.add_input(TxRef::Hash(tx_hash()), 0, None, None).unwrap();
        assert_eq!(b.inputs.len(), b.tx.ins.len());
    }

    #[test]
    fn duplicate_outpoint_is_rejected() {
        let mut b: TransactionBuilder<Mainnet> = TransactionBuilder::new();
        b.add_input(TxRef::Hash(tx_hash()), 0, None, None).unwrap();
        let err = b
            .add_input(TxRef::Hash(tx_hash()), 0, None, None)
            .unwrap_err();
        assert!(matches!(err, BuilderError::Duplicate(_)));
    }

    #[test]
    fn coinbase_outpoint_is_rejected() {
        let mut b: TransactionBuilder<Mainnet> = TransactionBuilder::new();
        let err = b
            .add_input(TxRef::Hash([0u8; 32]), 0, None, None)
            .unwrap_err();
        assert!(matches!(err, BuilderError::InvalidArgument(_)));
    }

    #[test]
    fn set_version_rejects_out_of_range() {
        let mut b: TransactionBuilder<Mainnet> = TransactionBuilder::new();
        assert_eq!(
            b.set_version(-1).unwrap_err().to_string(),
            "Expected Uint32"
        );
        assert_eq!(
            b.set_version(1i64 << 32).unwrap_err().to_string(),
            "Expected Uint32"
        );
    }

    #[test]
    fn sign_then_add_input_gated_by_all() {
        let mut b: TransactionBuilder<Mainnet> = TransactionBuilder::new();
        b.add_input(TxRef::Hash(tx_hash()), 0, None, None).unwrap();
        b.add_output(
            OutputTarget::Script(p2pkh_script(&[0u8; 20])),
            1000,
        )
        .unwrap();
        b.sign(0, &key(), SignOptions::default()).unwrap();
        let err = b
            .add_input(TxRef::Hash(tx_hash()), 1, None, None)
            .unwrap_err();
        assert!(matches!(err, BuilderError::InvalidState(_)));
    }

    #[test]
    fn sighash_none_permits_later_outputs() {
        let mut b: TransactionBuilder<Mainnet> = TransactionBuilder::new();
        b.add_input(TxRef::Hash(tx_hash()), 0, None, None).unwrap();
        b.add_output(OutputTarget::Script(p2pkh_script(&[0u8; 20])), 1000)
            .unwrap();
        b.sign(
            0,
            &key(),
            SignOptions {
                hash_type: Some(crate::tx::SIGHASH_NONE),
                ..Default::default()
            },
        )
        .unwrap();
        let idx = b
            .add_output(OutputTarget::Script(p2pkh_script(&[1u8; 20])), 2000)
            .unwrap();
        assert_eq!(idx, 1);
    }

    #[test]
    fn sighash_single_permits_only_balanced_additions() {
        let mut b: TransactionBuilder<Mainnet> = TransactionBuilder::new();
        b.add_input(TxRef::Hash(tx_hash()), 0, None, None).unwrap();
        b.add_output(OutputTarget::Script(p2pkh_script(&[0u8; 20])), 1000)
            .unwrap();
        b.sign(
            0,
            &key(),
            SignOptions {
                hash_type: Some(crate::tx::SIGHASH_SINGLE),
                ..Default::default()
            },
        )
        .unwrap();
        let idx = b
            .add_output(OutputTarget::Script(p2pkh_script(&[1u8; 20])), 9000)
            .unwrap();
        assert_eq!(idx, 1);
        let err = b
            .add_output(OutputTarget::Script(p2pkh_script(&[2u8; 20])), 500)
            .unwrap_err();
        assert!(matches!(err, BuilderError::InvalidState(_)));
    }

    #[test]
    fn signing_twice_with_same_key_is_rejected() {
        let mut b: TransactionBuilder<Mainnet> = TransactionBuilder::new();
        b.add_input(TxRef::Hash(tx_hash()), 0, None, None).unwrap();
        b.add_output(OutputTarget::Script(p2pkh_script(&[0u8; 20])), 1000)
            .unwrap();
        b.sign(0, &key(), SignOptions::default()).unwrap();
        let err = b.sign(0, &key(), SignOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "Signature already exists");
    }

    #[test]
    fn wrong_network_address_is_rejected() {
        let mut b: TransactionBuilder<crate::address::Testnet> = TransactionBuilder::new();
        let err = b
            .add_output(
                OutputTarget::Address("1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH".to_string()),
                1000,
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid version or Network mismatch");
    }

    #[test]
    fn build_then_from_transaction_round_trips() {
        let mut b: TransactionBuilder<Mainnet> = TransactionBuilder::new();
        b.add_input(TxRef::Hash(tx_hash()), 0, None, None).unwrap();
        b.add_output(OutputTarget::Script(p2pkh_script(&[0u8; 20])), 1000)
            .unwrap();
        b.sign(0, &key(), SignOptions::default()).unwrap();
        let built = b.build().unwrap();

        let rebuilt = TransactionBuilder::<Mainnet>::from_transaction(&built);
        let round_tripped = rebuilt.build().unwrap();
        assert_eq!(built.serialize(), round_tripped.serialize());
    }

    #[test]
    fn absurd_fee_is_rejected() {
        let mut b: TransactionBuilder<Mainnet> = TransactionBuilder::new();
        b.add_input(TxRef::Hash(tx_hash()), 0, None, None).unwrap();
        b.inputs[0].value = Some(100_000_000);
        b.add_output(OutputTarget::Script(p2pkh_script(&[0u8; 20])), 0)
            .unwrap();
        b.sign(0, &key(), SignOptions::default()).unwrap();
        let err = b.build().unwrap_err();
        assert!(matches!(err, BuilderError::AbsurdFee(_)));
    }
}
