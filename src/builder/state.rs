//! Per-Input Signing State (spec.md §3, §4.1) and the Output/Input
//! Expanders that populate it. Grounded on the teacher's `types::script`
//! classification (`ScriptType`) and `psbt::roles::signer`'s pattern of
//! inferring a pubkey/signature slot table from a prior output's script.

use crate::{
    hashes::hash160,
    script::{
        classify_output, p2pkh_pubkey_hash, p2pkh_script, p2sh_script, p2sh_script_hash,
        p2wpkh_pubkey_hash, p2wpkh_script, Script, ScriptType,
    },
    tx::Witness,
};

/// Everything known about one input's signing progress (spec.md §3).
/// `pubkeys` and `signatures` are parallel, index-aligned sequences
/// (spec.md §9 "Parallel arrays over a map") rather than a map, since the
/// multisig assembly rule requires deterministic slot ordering.
#[derive(Clone, Debug, Default)]
pub struct InputSigningState {
    /// nSequence recorded when the input was added.
    pub sequence: u32,
    /// Raw scriptSig bytes, populated only when reconstructed via
    /// `from_transaction`.
    pub script: Option<Script>,
    /// Witness stack, populated only when reconstructed.
    pub witness: Option<Witness>,
    /// The script the UTXO being spent is locked by.
    pub prev_out_script: Option<Script>,
    /// The classified type of `prev_out_script`.
    pub prev_out_type: Option<ScriptType>,
    /// The P2SH redeem script, populated only for P2SH-wrapped inputs.
    pub redeem_script: Option<Script>,
    /// The classified type of `redeem_script`.
    pub redeem_script_type: Option<ScriptType>,
    /// The script fed into the signature-hash function. Differs from
    /// `prev_out_script` for P2WPKH (synthesized P2PKH-shaped script) and
    /// P2SH-wrapped types (the redeem script, further synthesized for
    /// P2SH-P2WPKH).
    pub sign_script: Option<Script>,
    /// Whether this input is hashed with BIP-143 (segwit v0) rules and
    /// assembled with a witness stack rather than a scriptSig.
    pub has_witness: bool,
    /// The input's committed value; required once `has_witness` is true.
    pub value: Option<u64>,
    /// `pubkeys[i]` is the pubkey expected at slot `i`, or `None` if the
    /// slot's owner is not yet known.
    pub pubkeys: Vec<Option<[u8; 33]>>,
    /// `signatures[i]` is the DER-encoded signature (with trailing
    /// hashType byte) placed at slot `i`, or `None` if still empty.
    pub signatures: Vec<Option<Vec<u8>>>,
    /// Equal to `pubkeys.len()` for every type this crate supports.
    pub max_signatures: usize,
}

impl InputSigningState {
    /// A freshly-added input with no signing context yet known.
    pub fn new(sequence: u32) -> Self {
        InputSigningState {
            sequence,
            ..Default::default()
        }
    }

    /// Whether enough context is known to sign without re-inference
    /// (spec.md §9, "the source's `_canSign` tolerates a missing
    /// `signType`" — we retain the same weaker check: sign_script,
    /// pubkeys, and signatures populated with matching lengths, and
    /// `value` known iff `has_witness`).
    pub fn can_sign(&self) -> bool {
        self.sign_script.is_some()
            && !self.pubkeys.is_empty()
            && self.pubkeys.len() == self.signatures.len()
            && (self.value.is_some() == self.has_witness)
    }

    /// True once every signature slot has been filled.
    pub fn is_fully_signed(&self) -> bool {
        !self.signatures.is_empty() && self.signatures.iter().all(|s| s.is_some())
    }

    /// Populate the state from a classified prior output script, without
    /// any key material yet known — used by `add_input` (spec.md §4.2:
    /// "pre-populated pubkey slot when derivable"). Single-pubkey types
    /// reserve slot 0 even before a signer arrives; P2SH is left for
    /// `sign` to resolve once a redeem script is supplied.
    pub fn adopt_prev_out_script(&mut self, script: Script) {
        let ty = classify_output(&script);
        self.prev_out_type = Some(ty);
        match ty {
            ScriptType::P2pkh => {
                self.sign_script = Some(script.clone());
                self.has_witness = false;
                self.pubkeys = vec![None];
                self.signatures = vec![None];
                self.max_signatures = 1;
            }
            ScriptType::P2wpkh => {
                let hash = p2wpkh_pubkey_hash(&script);
                self.sign_script = Some(p2pkh_script(&hash));
                self.has_witness = true;
                self.pubkeys = vec![None];
                self.signatures = vec![None];
                self.max_signatures = 1;
            }
            _ => {}
        }
        self.prev_out_script = Some(script);
    }
}

/// Result of classifying and, when possible, expanding an output script
/// against a candidate signer's pubkey (spec.md §4.1 `expandOutput`).
#[derive(Clone, Debug)]
pub struct ExpandedOutput {
    /// The script's classified type.
    pub script_type: ScriptType,
    /// Populated only when `script_type` is single-pubkey and the
    /// supplied pubkey matches.
    pub pubkeys: Vec<Option<[u8; 33]>>,
    /// Parallel to `pubkeys`, all `None` (a fresh expansion carries no
    /// signatures yet).
    pub signatures: Vec<Option<Vec<u8>>>,
    /// Equal to `pubkeys.len()`.
    pub max_signatures: usize,
}

/// `expandOutput(script, ourPubKey?)` (spec.md §4.1).
pub fn expand_output(script: &Script, our_pubkey: Option<[u8; 33]>) -> ExpandedOutput {
    let script_type = classify_output(script);
    let slot = match script_type {
        ScriptType::P2pkh => our_pubkey.filter(|pk| hash160(pk) == p2pkh_pubkey_hash(script)),
        ScriptType::P2wpkh => our_pubkey.filter(|pk| hash160(pk) == p2wpkh_pubkey_hash(script)),
        _ => None,
    };
    match slot {
        Some(pk) => ExpandedOutput {
            script_type,
            pubkeys: vec![Some(pk)],
            signatures: vec![None],
            max_signatures: 1,
        },
        None => ExpandedOutput {
            script_type,
            pubkeys: vec![],
            signatures: vec![],
            max_signatures: 0,
        },
    }
}

/// Result of recovering signing context from an already-assembled input
/// (spec.md §4.1 `expandInput`, used by `from_transaction`).
#[derive(Clone, Debug, Default)]
pub struct ExpandedInput {
    /// Recovered pubkey slots.
    pub pubkeys: Vec<Option<[u8; 33]>>,
    /// Recovered signature slots.
    pub signatures: Vec<Option<Vec<u8>>>,
    /// The prior output's recovered type, if recognizable.
    pub prev_out_type: Option<ScriptType>,
    /// The recovered prior output script.
    pub prev_out_script: Option<Script>,
    /// The recovered redeem script (P2SH only).
    pub redeem_script: Option<Script>,
    /// The recovered redeem script's type (P2SH only).
    pub redeem_script_type: Option<ScriptType>,
    /// The recovered sign-script.
    pub sign_script: Option<Script>,
    /// Whether the input was witness-bearing.
    pub has_witness: bool,
}

fn to_pubkey(bytes: &[u8]) -> Option<[u8; 33]> {
    if bytes.len() == 33 {
        let mut out = [0u8; 33];
        out.copy_from_slice(bytes);
        Some(out)
    } else {
        None
    }
}

/// Split a scriptSig into its pushed data items. Supports direct pushes
/// (opcodes 1..=75) and `OP_PUSHDATA1`; sufficient for the templates this
/// crate assembles (DER signatures, compressed pubkeys, and redeem
/// scripts up to 255 bytes).
fn script_sig_pushes(script: &Script) -> Vec<Vec<u8>> {
    let b = script.as_bytes();
    let mut items = Vec::new();
    let mut i = 0;
    while i < b.len() {
        match b[i] {
            op @ 1..=0x4b => {
                let len = op as usize;
                if i + 1 + len > b.len() {
                    break;
                }
                items.push(b[i + 1..i + 1 + len].to_vec());
                i += 1 + len;
            }
            0x4c if i + 1 < b.len() => {
                let len = b[i + 1] as usize;
                if i + 2 + len > b.len() {
                    break;
                }
                items.push(b[i + 2..i + 2 + len].to_vec());
                i += 2 + len;
            }
            _ => break,
        }
    }
    items
}

/// `expandInput(scriptSig, witness)` (spec.md §4.1).
pub fn expand_input(script_sig: &Script, witness: &Witness) -> ExpandedInput {
    let sig_pushes = script_sig_pushes(script_sig);

    // P2SH: the last scriptSig push is the redeem script.
    if let Some(last) = sig_pushes.last() {
        let redeem = Script::from_bytes(last.clone());
        let redeem_type = classify_output(&redeem);
        let prev_out_script = Some(p2sh_script(&p2sh_script_hash_of(&redeem)));
        match redeem_type {
            ScriptType::P2wpkh => {
                let (pubkey, signature) = expand_witness_pair(witness);
                let hash = p2wpkh_pubkey_hash(&redeem);
                return ExpandedInput {
                    pubkeys: vec![pubkey],
                    signatures: vec![signature],
                    prev_out_type: Some(ScriptType::P2sh),
                    prev_out_script,
                    redeem_script: Some(redeem.clone()),
                    redeem_script_type: Some(redeem_type),
                    sign_script: Some(p2pkh_script(&hash)),
                    has_witness: true,
                };
            }
            ScriptType::P2pkh if sig_pushes.len() >= 3 => {
                let signature = Some(sig_pushes[0].clone());
                let pubkey = to_pubkey(&sig_pushes[1]);
                return ExpandedInput {
                    pubkeys: vec![pubkey],
                    signatures: vec![signature],
                    prev_out_type: Some(ScriptType::P2sh),
                    prev_out_script,
                    redeem_script: Some(redeem.clone()),
                    redeem_script_type: Some(redeem_type),
                    sign_script: Some(redeem),
                    has_witness: false,
                };
            }
            _ => {}
        }
    }

    // Native P2WPKH: witness carries [sig, pubkey].
    if witness.len() == 2 {
        let (pubkey, signature) = expand_witness_pair(witness);
        if let Some(pk) = pubkey {
            let hash = hash160(&pk);
            return ExpandedInput {
                pubkeys: vec![pubkey],
                signatures: vec![signature],
                prev_out_type: Some(ScriptType::P2wpkh),
                prev_out_script: Some(p2wpkh_script(&hash)),
                redeem_script: None,
                redeem_script_type: None,
                sign_script: Some(p2pkh_script(&hash)),
                has_witness: true,
            };
        }
    }

    // Native P2PKH: scriptSig carries <sig> <pubkey>.
    if sig_pushes.len() == 2 {
        let signature = Some(sig_pushes[0].clone());
        let pubkey = to_pubkey(&sig_pushes[1]);
        if let Some(pk) = pubkey {
            let hash = hash160(&pk);
            return ExpandedInput {
                pubkeys: vec![pubkey],
                signatures: vec![signature],
                prev_out_type: Some(ScriptType::P2pkh),
                prev_out_script: Some(p2pkh_script(&hash)),
                redeem_script: None,
                redeem_script_type: None,
                sign_script: Some(p2pkh_script(&hash)),
                has_witness: false,
            };
        }
    }

    ExpandedInput {
        has_witness: !witness.is_empty(),
        ..Default::default()
    }
}

fn expand_witness_pair(witness: &Witness) -> (Option<[u8; 33]>, Option<Vec<u8>>) {
    if witness.len() == 2 {
        (to_pubkey(&witness[1]), Some(witness[0].clone()))
    } else {
        (None, None)
    }
}

fn p2sh_script_hash_of(redeem: &Script) -> [u8; 20] {
    hash160(redeem.as_bytes())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::script::push_data;

    #[test]
    fn expand_output_matches_our_pubkey() {
        let pk = [0x02; 33];
        let script = p2pkh_script(&hash160(&pk));
        let expanded = expand_output(&script, Some(pk));
        assert_eq!(expanded.pubkeys, vec![Some(pk)]);
        assert_eq!(expanded.max_signatures, 1);
    }

    #[test]
    fn expand_output_empty_when_pubkey_does_not_match() {
        let script = p2pkh_script(&[0xaa; 20]);
        let expanded = expand_output(&script, Some([0x02; 33]));
        assert!(expanded.pubkeys.is_empty());
    }

    #[test]
    fn expand_input_recovers_p2pkh() {
        let pk = [0x03; 33];
        let sig = vec![0x30, 0x44, 0x01];
        let mut script_sig = push_data(&sig);
        script_sig.extend(push_data(&pk));
        let expanded = expand_input(&Script::from_bytes(script_sig), &vec![]);
        assert_eq!(expanded.pubkeys, vec![Some(pk)]);
        assert_eq!(expanded.signatures, vec![Some(sig)]);
        assert_eq!(expanded.prev_out_type, Some(ScriptType::P2pkh));
    }

    #[test]
    fn expand_input_recovers_p2wpkh() {
        let pk = [0x04; 33];
        let sig = vec![0x30, 0x44, 0x02];
        let witness = vec![sig.clone(), pk.to_vec()];
        let expanded = expand_input(&Script::from_bytes(vec![]), &witness);
        assert_eq!(expanded.pubkeys, vec![Some(pk)]);
        assert_eq!(expanded.signatures, vec![Some(sig)]);
        assert_eq!(expanded.prev_out_type, Some(ScriptType::P2wpkh));
        assert!(expanded.has_witness);
    }
}
