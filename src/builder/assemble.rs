//! Assembler (`buildByType`, spec.md §4.6): renders one input's signing
//! state into a final scriptSig + witness stack, recursively for
//! P2SH-wrapped types.

use crate::{
    error::BuilderError,
    script::{push_data, Script, ScriptType},
    tx::Witness,
};

use super::state::InputSigningState;

fn p2pkh_scriptsig(
    state: &InputSigningState,
    allow_incomplete: bool,
) -> Result<Option<Script>, BuilderError> {
    if state.pubkeys.len() != 1 || state.signatures.len() != 1 {
        return incomplete(allow_incomplete);
    }
    match (&state.pubkeys[0], &state.signatures[0]) {
        (Some(pk), Some(sig)) => {
            let mut bytes = push_data(sig);
            bytes.extend(push_data(pk));
            Ok(Some(Script::from_bytes(bytes)))
        }
        _ => incomplete(allow_incomplete),
    }
}

fn p2wpkh_witness(
    state: &InputSigningState,
    allow_incomplete: bool,
) -> Result<Option<Witness>, BuilderError> {
    if state.pubkeys.len() != 1 || state.signatures.len() != 1 {
        return incomplete(allow_incomplete);
    }
    match (&state.pubkeys[0], &state.signatures[0]) {
        (Some(pk), Some(sig)) => Ok(Some(vec![sig.clone(), pk.to_vec()])),
        _ => incomplete(allow_incomplete),
    }
}

fn incomplete<T>(allow_incomplete: bool) -> Result<Option<T>, BuilderError> {
    if allow_incomplete {
        Ok(None)
    } else {
        Err(BuilderError::not_enough_information())
    }
}

/// Render `state` into `(scriptSig, witness)`. Returns
/// `BuilderError::Incomplete` (`"Not enough information"` /
/// `"Unknown input type"`) when data is missing and `allow_incomplete` is
/// false; otherwise leaves the missing half blank.
pub fn build_by_type(
    state: &InputSigningState,
    allow_incomplete: bool,
) -> Result<(Script, Witness), BuilderError> {
    let script_type = match state.prev_out_type {
        Some(t) => t,
        None => {
            return if allow_incomplete {
                Ok((Script::from_bytes(vec![]), vec![]))
            } else {
                Err(BuilderError::unknown_input_type())
            }
        }
    };

    match script_type {
        ScriptType::P2pkh => {
            let script_sig = p2pkh_scriptsig(state, allow_incomplete)?;
            Ok((script_sig.unwrap_or_default(), vec![]))
        }
        ScriptType::P2wpkh => {
            let witness = p2wpkh_witness(state, allow_incomplete)?;
            Ok((Script::from_bytes(vec![]), witness.unwrap_or_default()))
        }
        ScriptType::P2sh => build_p2sh(state, allow_incomplete),
        ScriptType::P2wsh | ScriptType::NonStandard => {
            if allow_incomplete {
                Ok((Script::from_bytes(vec![]), vec![]))
            } else {
                Err(BuilderError::unknown_input_type())
            }
        }
    }
}

fn build_p2sh(
    state: &InputSigningState,
    allow_incomplete: bool,
) -> Result<(Script, Witness), BuilderError> {
    let (redeem_script, redeem_type) = match (&state.redeem_script, state.redeem_script_type) {
        (Some(script), Some(ty)) => (script, ty),
        _ => {
            return if allow_incomplete {
                Ok((Script::from_bytes(vec![]), vec![]))
            } else {
                Err(BuilderError::not_enough_information())
            }
        }
    };

    match redeem_type {
        ScriptType::P2wpkh => {
            let witness = p2wpkh_witness(state, allow_incomplete)?.unwrap_or_default();
            let script_sig = Script::from_bytes(push_data(redeem_script.as_bytes()));
            Ok((script_sig, witness))
        }
        ScriptType::P2pkh => {
            let inner = p2pkh_scriptsig(state, allow_incomplete)?;
            let mut bytes = inner.map(|s| s.0).unwrap_or_default();
            bytes.extend(push_data(redeem_script.as_bytes()));
            Ok((Script::from_bytes(bytes), vec![]))
        }
        _ => {
            if allow_incomplete {
                Ok((Script::from_bytes(vec![]), vec![]))
            } else {
                Err(BuilderError::unknown_input_type())
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn signed_p2pkh() -> InputSigningState {
        let mut state = InputSigningState::new(0xffff_ffff);
        state.prev_out_type = Some(ScriptType::P2pkh);
        state.pubkeys = vec![Some([0x02; 33])];
        state.signatures = vec![Some(vec![0x30, 0x01, 0x01])];
        state
    }

    #[test]
    fn assembles_p2pkh_scriptsig() {
        let state = signed_p2pkh();
        let (script_sig, witness) = build_by_type(&state, false).unwrap();
        assert!(witness.is_empty());
        assert!(!script_sig.as_bytes().is_empty());
    }

    #[test]
    fn rejects_incomplete_p2pkh_when_not_allowed() {
        let mut state = signed_p2pkh();
        state.signatures = vec![None];
        let err = build_by_type(&state, false).unwrap_err();
        assert_eq!(err.to_string(), "Not enough information");
    }

    #[test]
    fn leaves_incomplete_p2pkh_blank_when_allowed() {
        let mut state = signed_p2pkh();
        state.signatures = vec![None];
        let (script_sig, witness) = build_by_type(&state, true).unwrap();
        assert!(script_sig.as_bytes().is_empty());
        assert!(witness.is_empty());
    }

    #[test]
    fn assembles_p2sh_p2wpkh_transferring_witness() {
        let mut state = InputSigningState::new(0xffff_ffff);
        state.prev_out_type = Some(ScriptType::P2sh);
        state.redeem_script_type = Some(ScriptType::P2wpkh);
        state.redeem_script = Some(Script::from_bytes(vec![0x00, 0x14]));
        state.pubkeys = vec![Some([0x02; 33])];
        state.signatures = vec![Some(vec![0x30, 0x01, 0x01])];
        let (script_sig, witness) = build_by_type(&state, false).unwrap();
        assert!(!script_sig.as_bytes().is_empty());
        assert_eq!(witness.len(), 2);
    }

    #[test]
    fn unknown_input_type_when_never_inferred() {
        let state = InputSigningState::new(0xffff_ffff);
        let err = build_by_type(&state, false).unwrap_err();
        assert_eq!(err.to_string(), "Unknown input type");
    }
}
