//! Script codec: classification, ASM↔bytes conversion, and DER signature
//! encoding with a trailing hashType byte (spec.md §4.1, §6 "Script codec").

use k256::ecdsa::Signature;

const OP_0: u8 = 0x00;
const OP_PUSHDATA_MAX_DIRECT: u8 = 0x4b;
const OP_DUP: u8 = 0x76;
const OP_EQUAL: u8 = 0x87;
const OP_EQUALVERIFY: u8 = 0x88;
const OP_HASH160: u8 = 0xa9;
const OP_CHECKSIG: u8 = 0xac;

/// Errors from script encoding/decoding.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// An ASM token could not be parsed (unknown mnemonic or odd-length hex).
    #[error("Unparsable ASM token: {0}")]
    BadAsm(String),
}

/// An opaque sequence of script bytes (scriptPubKey, scriptSig, redeem
/// script, or witness script).
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Script(pub Vec<u8>);

impl Script {
    /// Wrap raw bytes as a script.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Script(bytes)
    }

    /// Borrow the underlying bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Render to a minimal ASM representation: known opcodes by mnemonic,
    /// pushed data as lowercase hex, unrecognized opcodes as `OP_0xHH`.
    pub fn to_asm(&self) -> String {
        let mut words = Vec::new();
        let mut i = 0;
        let b = &self.0;
        while i < b.len() {
            let op = b[i];
            match op {
                OP_0 => {
                    words.push("OP_0".to_string());
                    i += 1;
                }
                1..=OP_PUSHDATA_MAX_DIRECT => {
                    let len = op as usize;
                    let end = i + 1 + len;
                    if end > b.len() {
                        words.push(format!("OP_0x{:02x}", op));
                        i += 1;
                    } else {
                        words.push(hex::encode(&b[i + 1..end]));
                        i = end;
                    }
                }
                OP_DUP => {
                    words.push("OP_DUP".to_string());
                    i += 1;
                }
                OP_EQUAL => {
                    words.push("OP_EQUAL".to_string());
                    i += 1;
                }
                OP_EQUALVERIFY => {
                    words.push("OP_EQUALVERIFY".to_string());
                    i += 1;
                }
                OP_HASH160 => {
                    words.push("OP_HASH160".to_string());
                    i += 1;
                }
                OP_CHECKSIG => {
                    words.push("OP_CHECKSIG".to_string());
                    i += 1;
                }
                _ => {
                    words.push(format!("OP_0x{:02x}", op));
                    i += 1;
                }
            }
        }
        words.join(" ")
    }

    /// Parse a minimal ASM representation back into bytes. Understands the
    /// mnemonics `to_asm` produces plus raw hex pushes.
    pub fn from_asm(asm: &str) -> Result<Self, ScriptError> {
        let mut out = Vec::new();
        for tok in asm.split_whitespace() {
            match tok {
                "OP_0" => out.push(OP_0),
                "OP_DUP" => out.push(OP_DUP),
                "OP_EQUAL" => out.push(OP_EQUAL),
                "OP_EQUALVERIFY" => out.push(OP_EQUALVERIFY),
                "OP_HASH160" => out.push(OP_HASH160),
                "OP_CHECKSIG" => out.push(OP_CHECKSIG),
                t if t.starts_with("OP_0x") => {
                    let byte = u8::from_str_radix(&t[5..], 16)
                        .map_err(|_| ScriptError::BadAsm(tok.to_string()))?;
                    out.push(byte);
                }
                t => {
                    let bytes: Vec<u8> =
                        hex::decode(t).map_err(|_| ScriptError::BadAsm(tok.to_string()))?;
                    if bytes.len() > OP_PUSHDATA_MAX_DIRECT as usize {
                        return Err(ScriptError::BadAsm(tok.to_string()));
                    }
                    out.push(bytes.len() as u8);
                    out.extend(bytes);
                }
            }
        }
        Ok(Script(out))
    }
}

/// The recognized output-script shapes (spec.md §4.1). Anything else is
/// `NonStandard`. `P2wsh` is recognized for classification purposes only —
/// the builder refuses to sign or assemble it (spec.md §1 Non-goals, §9).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ScriptType {
    /// Pay to public key hash.
    P2pkh,
    /// Pay to witness public key hash (segwit v0).
    P2wpkh,
    /// Pay to script hash.
    P2sh,
    /// Pay to witness script hash (segwit v0). Classified but unsupported.
    P2wsh,
    /// Anything not matching a recognized template.
    NonStandard,
}

/// Structurally classify an output script (spec.md §4.1).
pub fn classify_output(script: &Script) -> ScriptType {
    let b = &script.0;
    if b.len() == 25
        && b[0] == OP_DUP
        && b[1] == OP_HASH160
        && b[2] == 0x14
        && b[23] == OP_EQUALVERIFY
        && b[24] == OP_CHECKSIG
    {
        return ScriptType::P2pkh;
    }
    if b.len() == 22 && b[0] == OP_0 && b[1] == 0x14 {
        return ScriptType::P2wpkh;
    }
    if b.len() == 23 && b[0] == OP_HASH160 && b[1] == 0x14 && b[22] == OP_EQUAL {
        return ScriptType::P2sh;
    }
    if b.len() == 34 && b[0] == OP_0 && b[1] == 0x20 {
        return ScriptType::P2wsh;
    }
    ScriptType::NonStandard
}

impl std::fmt::Display for ScriptType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ScriptType::P2pkh => "P2PKH",
            ScriptType::P2wpkh => "P2WPKH",
            ScriptType::P2sh => "P2SH",
            ScriptType::P2wsh => "P2WSH",
            ScriptType::NonStandard => "NonStandard",
        };
        write!(f, "{}", s)
    }
}

/// Extract the 20-byte pubkey hash from a P2PKH script. Panics on a
/// mis-shaped script; callers must classify first.
pub fn p2pkh_pubkey_hash(script: &Script) -> [u8; 20] {
    let mut out = [0u8; 20];
    out.copy_from_slice(&script.0[3..23]);
    out
}

/// Extract the 20-byte pubkey hash from a P2WPKH script.
pub fn p2wpkh_pubkey_hash(script: &Script) -> [u8; 20] {
    let mut out = [0u8; 20];
    out.copy_from_slice(&script.0[2..22]);
    out
}

/// Extract the 20-byte script hash from a P2SH script.
pub fn p2sh_script_hash(script: &Script) -> [u8; 20] {
    let mut out = [0u8; 20];
    out.copy_from_slice(&script.0[2..22]);
    out
}

/// Build a P2PKH scriptPubKey / sign-script over a pubkey hash.
pub fn p2pkh_script(pubkey_hash: &[u8; 20]) -> Script {
    let mut v = Vec::with_capacity(25);
    v.push(OP_DUP);
    v.push(OP_HASH160);
    v.push(0x14);
    v.extend_from_slice(pubkey_hash);
    v.push(OP_EQUALVERIFY);
    v.push(OP_CHECKSIG);
    Script(v)
}

/// Build a P2WPKH scriptPubKey over a pubkey hash.
pub fn p2wpkh_script(pubkey_hash: &[u8; 20]) -> Script {
    let mut v = Vec::with_capacity(22);
    v.push(OP_0);
    v.push(0x14);
    v.extend_from_slice(pubkey_hash);
    Script(v)
}

/// Build a P2SH scriptPubKey over a script hash.
pub fn p2sh_script(script_hash: &[u8; 20]) -> Script {
    let mut v = Vec::with_capacity(23);
    v.push(OP_HASH160);
    v.push(0x14);
    v.extend_from_slice(script_hash);
    v.push(OP_EQUAL);
    Script(v)
}

/// A single length-prefixed push, as used in scriptSig / witness stacks.
pub fn push_data(data: &[u8]) -> Vec<u8> {
    let mut v = Vec::with_capacity(data.len() + 5);
    match data.len() {
        0..=0x4b => v.push(data.len() as u8),
        0x4c..=0xff => {
            v.push(0x4c);
            v.push(data.len() as u8);
        }
        len => {
            v.push(0x4d);
            v.extend_from_slice(&(len as u16).to_le_bytes());
        }
    }
    v.extend_from_slice(data);
    v
}

/// DER-encode a raw ECDSA signature and append the 1-byte hashType suffix
/// (spec.md §6 "encodeSignature").
pub fn encode_signature(sig: &Signature, hash_type: u8) -> Vec<u8> {
    let mut out = sig.to_der().as_bytes().to_vec();
    out.push(hash_type);
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn it_classifies_p2pkh() {
        let script = p2pkh_script(&[0x11; 20]);
        assert_eq!(classify_output(&script), ScriptType::P2pkh);
        assert_eq!(p2pkh_pubkey_hash(&script), [0x11; 20]);
    }

    #[test]
    fn it_classifies_p2wpkh() {
        let script = p2wpkh_script(&[0x22; 20]);
        assert_eq!(classify_output(&script), ScriptType::P2wpkh);
        assert_eq!(p2wpkh_pubkey_hash(&script), [0x22; 20]);
    }

    #[test]
    fn it_classifies_p2sh() {
        let script = p2sh_script(&[0x33; 20]);
        assert_eq!(classify_output(&script), ScriptType::P2sh);
        assert_eq!(p2sh_script_hash(&script), [0x33; 20]);
    }

    #[test]
    fn it_classifies_nonstandard() {
        let script = Script::from_bytes(vec![0x6a, 0x00]);
        assert_eq!(classify_output(&script), ScriptType::NonStandard);
    }

    #[test]
    fn it_round_trips_asm_for_p2pkh() {
        let script = p2pkh_script(&[0xab; 20]);
        let asm = script.to_asm();
        assert_eq!(
            asm,
            format!(
                "OP_DUP OP_HASH160 {} OP_EQUALVERIFY OP_CHECKSIG",
                "ab".repeat(20)
            )
        );
        assert_eq!(Script::from_asm(&asm).unwrap(), script);
    }
}
