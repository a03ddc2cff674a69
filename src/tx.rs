//! The `Transaction` value object (spec.md §6): inputs, outputs, legacy and
//! BIP-143 signature-hash preimages, id, virtual size, and hex round-trip.
//!
//! Grounded on the teacher's `types::transactions::{LegacyTx, WitnessTx}`
//! sighash algorithms, collapsed into a single type (DESIGN.md Open
//! Question 6): the segwit marker/flag are emitted at serialization time
//! whenever any input carries a non-empty witness, rather than the
//! teacher's type-level Legacy/Witness split.

use crate::{hashes::sha256d, script::Script};

/// Errors raised while computing a signature hash or (de)serializing a
/// transaction.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TxError {
    /// `vin` was out of range for `tx.ins`.
    #[error("No input at index: {0}")]
    NoInputAtIndex(usize),
    /// `SIGHASH_SINGLE` was requested for an input with no matching output.
    /// Unlike the legacy Satoshi client, this is a hard error rather than
    /// the historical "SIGHASH_SINGLE bug" digest.
    #[error("SIGHASH_SINGLE requires a matching output at the same index")]
    SingleMissingOutput,
    /// The byte stream did not parse as a valid transaction.
    #[error("Malformed transaction bytes: {0}")]
    Malformed(String),
}

/// The signature-hash mode: the low 5 bits of a SIGHASH flag byte.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SighashMode {
    /// Commit to every input and every output.
    All,
    /// Commit to no outputs at all.
    None,
    /// Commit only to the output at the same index as this input.
    Single,
}

/// A full SIGHASH flag: mode plus the independent ANYONECANPAY bit
/// (spec.md §4.4, §6, GLOSSARY). Kept separate from the teacher's combined
/// six-value `Sighash` enum (DESIGN.md Open Question 4) because the
/// Mutation Gate reasons about the two components independently.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SighashFlag {
    /// The commitment mode.
    pub mode: SighashMode,
    /// Whether `SIGHASH_ANYONECANPAY` (0x80) is set.
    pub anyone_can_pay: bool,
}

/// `SIGHASH_ALL` constant (spec.md §6).
pub const SIGHASH_ALL: u8 = 0x01;
/// `SIGHASH_NONE` constant.
pub const SIGHASH_NONE: u8 = 0x02;
/// `SIGHASH_SINGLE` constant.
pub const SIGHASH_SINGLE: u8 = 0x03;
/// `SIGHASH_ANYONECANPAY` constant.
pub const SIGHASH_ANYONECANPAY: u8 = 0x80;

impl SighashFlag {
    /// The default flag used when a caller does not specify one.
    pub fn all() -> Self {
        SighashFlag {
            mode: SighashMode::All,
            anyone_can_pay: false,
        }
    }

    /// Decode a raw hashType byte into mode + ANYONECANPAY bit.
    pub fn from_u8(raw: u8) -> Self {
        let anyone_can_pay = raw & SIGHASH_ANYONECANPAY != 0;
        let mode = match raw & !SIGHASH_ANYONECANPAY {
            SIGHASH_NONE => SighashMode::None,
            SIGHASH_SINGLE => SighashMode::Single,
            _ => SighashMode::All,
        };
        SighashFlag {
            mode,
            anyone_can_pay,
        }
    }

    /// Encode back to a raw hashType byte.
    pub fn to_u8(self) -> u8 {
        let base = match self.mode {
            SighashMode::All => SIGHASH_ALL,
            SighashMode::None => SIGHASH_NONE,
            SighashMode::Single => SIGHASH_SINGLE,
        };
        if self.anyone_can_pay {
            base | SIGHASH_ANYONECANPAY
        } else {
            base
        }
    }
}

/// A unique identifier for a UTXO: a prior txid and the index of the
/// output within that transaction (GLOSSARY "Outpoint"). `txid` is stored
/// in Bitcoin's internal little-endian wire order, matching the teacher's
/// `Outpoint` convention.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Outpoint {
    /// The internal (LE) txid of the transaction that created this UTXO.
    pub txid: [u8; 32],
    /// The index of the output within that transaction.
    pub vout: u32,
}

impl Outpoint {
    /// Construct a new outpoint.
    pub fn new(txid: [u8; 32], vout: u32) -> Self {
        Outpoint { txid, vout }
    }

    /// The null / coinbase outpoint: zero txid, `0xffff_ffff` index.
    pub fn null() -> Self {
        Outpoint {
            txid: [0u8; 32],
            vout: 0xffff_ffff,
        }
    }

    /// Big-endian (block-explorer) hex of the txid, for error messages and
    /// display (spec.md §8 scenario 4: "Duplicate TxOut: 0e7cea…:0").
    pub fn txid_be_hex(&self) -> String {
        let mut be = self.txid;
        be.reverse();
        hex::encode(be)
    }

    fn serialize(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.txid);
        out.extend_from_slice(&self.vout.to_le_bytes());
    }
}

/// A transaction input: the outpoint it spends, its unlocking scriptSig
/// (empty for native witness inputs), and its sequence number.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TxIn {
    /// The outpoint being spent.
    pub outpoint: Outpoint,
    /// The unlocking script, if any (legacy or P2SH-wrapped spends).
    pub script_sig: Script,
    /// The nSequence field.
    pub sequence: u32,
}

impl TxIn {
    fn serialize(&self, out: &mut Vec<u8>) {
        self.outpoint.serialize(out);
        write_varint(out, self.script_sig.as_bytes().len() as u64);
        out.extend_from_slice(self.script_sig.as_bytes());
        out.extend_from_slice(&self.sequence.to_le_bytes());
    }
}

/// A transaction output: a value and the script that locks it.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TxOut {
    /// Value in satoshis.
    pub value: u64,
    /// The locking script.
    pub script_pubkey: Script,
}

impl TxOut {
    /// The "null" TxOut used as a placeholder in legacy `SIGHASH_SINGLE`
    /// preimages: value `0xffff_ffff_ffff_ffff`, empty script.
    pub fn null() -> Self {
        TxOut {
            value: 0xffff_ffff_ffff_ffff,
            script_pubkey: Script::from_bytes(vec![]),
        }
    }

    fn serialize(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.value.to_le_bytes());
        write_varint(out, self.script_pubkey.as_bytes().len() as u64);
        out.extend_from_slice(self.script_pubkey.as_bytes());
    }
}

/// One input's witness stack: a list of byte strings. Empty for
/// non-witness inputs (spec.md §6 "Empty witness: zero-length stack").
pub type Witness = Vec<Vec<u8>>;

/// A Bitcoin-compatible transaction: the concrete realization of spec.md
/// §6's `Transaction` interface.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Transaction {
    /// Transaction version.
    pub version: u32,
    /// Inputs.
    pub ins: Vec<TxIn>,
    /// Outputs.
    pub outs: Vec<TxOut>,
    /// Per-input witness stacks, parallel to `ins`. Empty stacks are
    /// legal and indicate a non-witness input.
    pub witnesses: Vec<Witness>,
    /// Locktime.
    pub locktime: u32,
}

impl Transaction {
    /// A fresh transaction: version 2, locktime 0, no ins/outs
    /// (spec.md §3).
    pub fn new() -> Self {
        Transaction {
            version: 2,
            ins: vec![],
            outs: vec![],
            witnesses: vec![],
            locktime: 0,
        }
    }

    /// Append an input, returning its index.
    pub fn add_input(&mut self, outpoint: Outpoint, sequence: u32) -> usize {
        self.ins.push(TxIn {
            outpoint,
            script_sig: Script::from_bytes(vec![]),
            sequence,
        });
        self.witnesses.push(vec![]);
        self.ins.len() - 1
    }

    /// Append an output, returning its index.
    pub fn add_output(&mut self, script_pubkey: Script, value: u64) -> usize {
        self.outs.push(TxOut {
            value,
            script_pubkey,
        });
        self.outs.len() - 1
    }

    /// Overwrite an input's scriptSig.
    pub fn set_input_script(&mut self, vin: usize, script: Script) {
        self.ins[vin].script_sig = script;
    }

    /// Overwrite an input's witness stack.
    pub fn set_witness(&mut self, vin: usize, witness: Witness) {
        self.witnesses[vin] = witness;
    }

    fn has_witness_data(&self) -> bool {
        self.witnesses.iter().any(|w| !w.is_empty())
    }

    fn serialize_legacy(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.version.to_le_bytes());
        write_varint(out, self.ins.len() as u64);
        for txin in &self.ins {
            txin.serialize(out);
        }
        write_varint(out, self.outs.len() as u64);
        for txout in &self.outs {
            txout.serialize(out);
        }
        out.extend_from_slice(&self.locktime.to_le_bytes());
    }

    /// Serialize with the BIP-144 segwit marker/flag and per-input witness
    /// stacks when any input carries witness data; otherwise identical to
    /// the legacy wire format.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        if self.has_witness_data() {
            out.extend_from_slice(&self.version.to_le_bytes());
            out.push(0x00); // marker
            out.push(0x01); // flag
            write_varint(&mut out, self.ins.len() as u64);
            for txin in &self.ins {
                txin.serialize(&mut out);
            }
            write_varint(&mut out, self.outs.len() as u64);
            for txout in &self.outs {
                txout.serialize(&mut out);
            }
            for witness in &self.witnesses {
                write_varint(&mut out, witness.len() as u64);
                for item in witness {
                    write_varint(&mut out, item.len() as u64);
                    out.extend_from_slice(item);
                }
            }
            out.extend_from_slice(&self.locktime.to_le_bytes());
        } else {
            self.serialize_legacy(&mut out);
        }
        out
    }

    /// The transaction id: `sha256d` of the legacy (witness-stripped)
    /// serialization, in internal little-endian order (spec.md §6
    /// "getHash").
    pub fn txid(&self) -> [u8; 32] {
        let mut legacy = Vec::new();
        self.serialize_legacy(&mut legacy);
        sha256d(&legacy)
    }

    /// Segwit-weighted virtual size, used for fee-rate arithmetic
    /// (spec.md §4.6, GLOSSARY "Virtual size").
    pub fn virtual_size(&self) -> u64 {
        let mut legacy = Vec::new();
        self.serialize_legacy(&mut legacy);
        let base_size = legacy.len() as u64;
        let total_size = self.serialize().len() as u64;
        let weight = base_size * 3 + total_size;
        (weight + 3) / 4
    }

    /// Legacy signature-hash preimage digest (spec.md §6 "hashForSignature").
    ///
    /// Implements the original (pre-segwit) Satoshi algorithm: blank every
    /// scriptSig except the signed input (set to `sign_script`); for
    /// `SIGHASH_NONE`, drop all outputs and zero every other input's
    /// sequence; for `SIGHASH_SINGLE`, truncate the outputs to `vin + 1`
    /// with null placeholders before it, and zero every other input's
    /// sequence; for `ANYONECANPAY`, truncate the inputs to just the
    /// signed one.
    pub fn legacy_sighash(
        &self,
        vin: usize,
        sign_script: &Script,
        flag: SighashFlag,
    ) -> Result<[u8; 32], TxError> {
        if vin >= self.ins.len() {
            return Err(TxError::NoInputAtIndex(vin));
        }
        if flag.mode == SighashMode::Single && vin >= self.outs.len() {
            return Err(TxError::SingleMissingOutput);
        }

        let mut ins: Vec<TxIn> = self
            .ins
            .iter()
            .enumerate()
            .map(|(i, txin)| TxIn {
                outpoint: txin.outpoint,
                script_sig: if i == vin {
                    sign_script.clone()
                } else {
                    Script::from_bytes(vec![])
                },
                sequence: txin.sequence,
            })
            .collect();

        let mut outs = self.outs.clone();

        match flag.mode {
            SighashMode::All => {}
            SighashMode::None => {
                outs = vec![];
                for (i, txin) in ins.iter_mut().enumerate() {
                    if i != vin {
                        txin.sequence = 0;
                    }
                }
            }
            SighashMode::Single => {
                outs.truncate(vin + 1);
                for out in outs.iter_mut().take(vin) {
                    *out = TxOut::null();
                }
                for (i, txin) in ins.iter_mut().enumerate() {
                    if i != vin {
                        txin.sequence = 0;
                    }
                }
            }
        }

        if flag.anyone_can_pay {
            ins = vec![ins[vin].clone()];
        }

        let pseudo = Transaction {
            version: self.version,
            ins,
            outs,
            witnesses: vec![],
            locktime: self.locktime,
        };
        let mut preimage = Vec::new();
        pseudo.serialize_legacy(&mut preimage);
        preimage.extend_from_slice(&(flag.to_u8() as u32).to_le_bytes());
        Ok(sha256d(&preimage))
    }

    fn hash_prevouts(&self, flag: SighashFlag) -> [u8; 32] {
        if flag.anyone_can_pay {
            return [0u8; 32];
        }
        let mut buf = Vec::new();
        for txin in &self.ins {
            txin.outpoint.serialize(&mut buf);
        }
        sha256d(&buf)
    }

    fn hash_sequence(&self, flag: SighashFlag) -> [u8; 32] {
        if flag.anyone_can_pay || flag.mode != SighashMode::All {
            return [0u8; 32];
        }
        let mut buf = Vec::new();
        for txin in &self.ins {
            buf.extend_from_slice(&txin.sequence.to_le_bytes());
        }
        sha256d(&buf)
    }

    fn hash_outputs(&self, vin: usize, flag: SighashFlag) -> [u8; 32] {
        match flag.mode {
            SighashMode::All => {
                let mut buf = Vec::new();
                for txout in &self.outs {
                    txout.serialize(&mut buf);
                }
                sha256d(&buf)
            }
            SighashMode::Single => {
                if vin < self.outs.len() {
                    let mut buf = Vec::new();
                    self.outs[vin].serialize(&mut buf);
                    sha256d(&buf)
                } else {
                    [0u8; 32]
                }
            }
            SighashMode::None => [0u8; 32],
        }
    }

    /// BIP-143 (segwit v0) signature-hash preimage digest (spec.md §6
    /// "hashForWitnessV0").
    pub fn witness_v0_sighash(
        &self,
        vin: usize,
        sign_script: &Script,
        value: u64,
        flag: SighashFlag,
    ) -> Result<[u8; 32], TxError> {
        if vin >= self.ins.len() {
            return Err(TxError::NoInputAtIndex(vin));
        }
        if flag.mode == SighashMode::Single && vin >= self.outs.len() {
            return Err(TxError::SingleMissingOutput);
        }

        let mut preimage = Vec::new();
        preimage.extend_from_slice(&self.version.to_le_bytes());
        preimage.extend_from_slice(&self.hash_prevouts(flag));
        preimage.extend_from_slice(&self.hash_sequence(flag));
        self.ins[vin].outpoint.serialize(&mut preimage);
        write_varint(&mut preimage, sign_script.as_bytes().len() as u64);
        preimage.extend_from_slice(sign_script.as_bytes());
        preimage.extend_from_slice(&value.to_le_bytes());
        preimage.extend_from_slice(&self.ins[vin].sequence.to_le_bytes());
        preimage.extend_from_slice(&self.hash_outputs(vin, flag));
        preimage.extend_from_slice(&self.locktime.to_le_bytes());
        preimage.extend_from_slice(&(flag.to_u8() as u32).to_le_bytes());
        Ok(sha256d(&preimage))
    }

    /// Hex-encode the serialized transaction.
    pub fn to_hex(&self) -> String {
        hex::encode(self.serialize())
    }

    /// Parse a transaction from its hex wire representation.
    pub fn from_hex(s: &str) -> Result<Self, TxError> {
        let bytes: Vec<u8> = hex::decode(s).map_err(|_| TxError::Malformed("bad hex".to_string()))?;
        Self::deserialize(&bytes)
    }

    fn deserialize(bytes: &[u8]) -> Result<Self, TxError> {
        let mut cur = Cursor { buf: bytes, pos: 0 };
        let version = cur.read_u32()?;
        let mut marker_flag = None;
        let first = cur.peek_u8()?;
        if first == 0x00 {
            cur.advance(1)?;
            let flag = cur.read_u8()?;
            marker_flag = Some(flag);
        }
        let n_ins = cur.read_varint()?;
        let mut ins = Vec::with_capacity(n_ins as usize);
        for _ in 0..n_ins {
            let mut txid = [0u8; 32];
            txid.copy_from_slice(cur.read_bytes(32)?);
            let vout = cur.read_u32()?;
            let script_len = cur.read_varint()?;
            let script = cur.read_bytes(script_len as usize)?.to_vec();
            let sequence = cur.read_u32()?;
            ins.push(TxIn {
                outpoint: Outpoint { txid, vout },
                script_sig: Script::from_bytes(script),
                sequence,
            });
        }
        let n_outs = cur.read_varint()?;
        let mut outs = Vec::with_capacity(n_outs as usize);
        for _ in 0..n_outs {
            let value = cur.read_u64()?;
            let script_len = cur.read_varint()?;
            let script = cur.read_bytes(script_len as usize)?.to_vec();
            outs.push(TxOut {
                value,
                script_pubkey: Script::from_bytes(script),
            });
        }
        let mut witnesses = vec![vec![]; ins.len()];
        if marker_flag == Some(0x01) {
            for witness in witnesses.iter_mut() {
                let n_items = cur.read_varint()?;
                let mut items = Vec::with_capacity(n_items as usize);
                for _ in 0..n_items {
                    let len = cur.read_varint()?;
                    items.push(cur.read_bytes(len as usize)?.to_vec());
                }
                *witness = items;
            }
        }
        let locktime = cur.read_u32()?;
        Ok(Transaction {
            version,
            ins,
            outs,
            witnesses,
            locktime,
        })
    }
}

fn write_varint(out: &mut Vec<u8>, n: u64) {
    if n < 0xfd {
        out.push(n as u8);
    } else if n <= 0xffff {
        out.push(0xfd);
        out.extend_from_slice(&(n as u16).to_le_bytes());
    } else if n <= 0xffff_ffff {
        out.push(0xfe);
        out.extend_from_slice(&(n as u32).to_le_bytes());
    } else {
        out.push(0xff);
        out.extend_from_slice(&n.to_le_bytes());
    }
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], TxError> {
        if self.pos + n > self.buf.len() {
            return Err(TxError::Malformed("ran out of bytes".to_string()));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn peek_u8(&self) -> Result<u8, TxError> {
        self.buf
            .get(self.pos)
            .copied()
            .ok_or_else(|| TxError::Malformed("ran out of bytes".to_string()))
    }

    fn advance(&mut self, n: usize) -> Result<(), TxError> {
        self.pos += n;
        Ok(())
    }

    fn read_u8(&mut self) -> Result<u8, TxError> {
        let b = self.read_bytes(1)?;
        Ok(b[0])
    }

    fn read_u32(&mut self) -> Result<u32, TxError> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes(b.try_into().unwrap()))
    }

    fn read_u64(&mut self) -> Result<u64, TxError> {
        let b = self.read_bytes(8)?;
        Ok(u64::from_le_bytes(b.try_into().unwrap()))
    }

    fn read_varint(&mut self) -> Result<u64, TxError> {
        let tag = self.read_u8()?;
        match tag {
            0xfd => Ok(u16::from_le_bytes(self.read_bytes(2)?.try_into().unwrap()) as u64),
            0xfe => Ok(u32::from_le_bytes(self.read_bytes(4)?.try_into().unwrap()) as u64),
            0xff => Ok(u64::from_le_bytes(self.read_bytes(8)?.try_into().unwrap())),
            n => Ok(n as u64),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::script::p2pkh_script;

    #[test]
    fn it_round_trips_through_hex() {
        let mut tx = Transaction::new();
        tx.add_input(Outpoint::null(), 0xffff_ffff);
        tx.add_output(p2pkh_script(&[0x11; 20]), 1000);
        let hex = tx.to_hex();
        let back = Transaction::from_hex(&hex).unwrap();
        assert_eq!(tx, back);
    }

    #[test]
    fn it_computes_a_stable_txid() {
        let mut tx = Transaction::new();
        tx.add_input(Outpoint::null(), 0xffff_ffff);
        tx.add_output(p2pkh_script(&[0x11; 20]), 1000);
        assert_eq!(tx.txid(), tx.txid());
    }

    #[test]
    fn legacy_sighash_rejects_out_of_range_single() {
        let mut tx = Transaction::new();
        tx.add_input(Outpoint::null(), 0xffff_ffff);
        let flag = SighashFlag {
            mode: SighashMode::Single,
            anyone_can_pay: false,
        };
        let err = tx
            .legacy_sighash(0, &p2pkh_script(&[0; 20]), flag)
            .unwrap_err();
        assert_eq!(err, TxError::SingleMissingOutput);
    }

    #[test]
    fn virtual_size_without_witness_equals_byte_size() {
        let mut tx = Transaction::new();
        tx.add_input(Outpoint::null(), 0xffff_ffff);
        tx.add_output(p2pkh_script(&[0x11; 20]), 1000);
        assert_eq!(tx.virtual_size(), tx.serialize().len() as u64);
    }

    #[test]
    fn virtual_size_with_witness_is_discounted() {
        let mut tx = Transaction::new();
        tx.add_input(Outpoint::null(), 0xffff_ffff);
        tx.add_output(p2pkh_script(&[0x11; 20]), 1000);
        tx.set_witness(0, vec![vec![0u8; 71], vec![0u8; 33]]);
        assert!(tx.virtual_size() < tx.serialize().len() as u64);
    }

    #[test]
    fn sighash_flag_bit_layout_round_trips() {
        for raw in [0x01u8, 0x02, 0x03, 0x81, 0x82, 0x83] {
            assert_eq!(SighashFlag::from_u8(raw).to_u8(), raw);
        }
    }
}
