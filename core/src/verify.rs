//! Self-verification of a finished spend transaction.
//!
//! `rust-bitcoin` doesn't ship a consensus script interpreter (unlike the
//! `txscript.NewEngine` call the original client runs against every spend
//! it builds), so this is a small stack machine covering exactly the
//! opcodes the HTLC template in [`crate::script`] uses. It is not a
//! general-purpose Script VM — anything outside that opcode set is a bug
//! in the caller, not a script this engine is meant to execute — but it
//! catches a wrong signature, wrong branch selector, or malformed push
//! before the transaction goes anywhere near the network.
use bitcoin::hashes::{hash160, sha256, Hash};
use bitcoin::opcodes::all as op;
use bitcoin::script::{Instruction, Script};
use bitcoin::secp256k1::{ecdsa, Message, PublicKey, Secp256k1};
use bitcoin::sighash::SighashCache;
use bitcoin::{EcdsaSighashType, Transaction};

use crate::error::EngineError;

/// Runs `sig_script` followed by `redeem_script` (the standard legacy P2SH
/// evaluation order: scriptSig pushes the stack `CHECKSIG`/hashing
/// opcodes in `redeemScript` then consume) against `tx`'s `input_index`,
/// and requires the final stack top to be truthy.
pub fn verify_spend(tx: &Transaction, input_index: usize, sig_script: &Script, redeem_script: &Script) -> Result<(), EngineError> {
    let mut stack = run(sig_script, &mut Vec::new(), tx, input_index, redeem_script)?;
    // BIP16: the last item the sigScript leaves on the stack is the
    // serialized redeemScript itself, consumed by P2SH evaluation rather
    // than passed into the redeem script's own execution.
    stack.pop();
    let stack_after = run(redeem_script, &mut stack, tx, input_index, redeem_script)?;
    stack = stack_after;
    match stack.last() {
        Some(top) if is_truthy(top) => Ok(()),
        _ => Err(EngineError::ScriptInvalid("final stack top is not true".into())),
    }
}

fn run(
    script: &Script,
    stack: &mut Vec<Vec<u8>>,
    tx: &Transaction,
    input_index: usize,
    script_code: &Script,
) -> Result<Vec<Vec<u8>>, EngineError> {
    let instrs: Vec<Instruction> = script
        .instructions()
        .collect::<Result<_, _>>()
        .map_err(|_| EngineError::ScriptInvalid("malformed script".into()))?;

    let mut branch_stack: Vec<bool> = Vec::new();
    let mut working = std::mem::take(stack);

    for instr in instrs {
        if let Instruction::Op(opcode) = instr {
            if opcode == op::OP_IF {
                let active = branch_active(&branch_stack);
                if active {
                    let top = pop(&mut working)?;
                    branch_stack.push(is_truthy(&top));
                } else {
                    branch_stack.push(false);
                }
                continue;
            }
            if opcode == op::OP_ELSE {
                let top = branch_stack
                    .last_mut()
                    .ok_or_else(|| EngineError::ScriptInvalid("OP_ELSE without OP_IF".into()))?;
                *top = !*top;
                continue;
            }
            if opcode == op::OP_ENDIF {
                branch_stack
                    .pop()
                    .ok_or_else(|| EngineError::ScriptInvalid("OP_ENDIF without OP_IF".into()))?;
                continue;
            }
        }

        if !branch_active(&branch_stack) {
            continue;
        }

        match instr {
            Instruction::PushBytes(bytes) => working.push(bytes.as_bytes().to_vec()),
            Instruction::Op(opcode) if opcode == op::OP_PUSHNUM_1 => working.push(vec![1]),
            Instruction::Op(opcode) if opcode == op::OP_SIZE => {
                let top = top(&working)?;
                working.push(scriptnum_encode(top.len() as i64));
            }
            Instruction::Op(opcode) if opcode == op::OP_SHA256 => {
                let top = pop(&mut working)?;
                working.push(sha256::Hash::hash(&top).to_byte_array().to_vec());
            }
            Instruction::Op(opcode) if opcode == op::OP_HASH160 => {
                let top = pop(&mut working)?;
                working.push(hash160::Hash::hash(&top).to_byte_array().to_vec());
            }
            Instruction::Op(opcode) if opcode == op::OP_DUP => {
                let top = top(&working)?.clone();
                working.push(top);
            }
            Instruction::Op(opcode) if opcode == op::OP_DROP => {
                pop(&mut working)?;
            }
            Instruction::Op(opcode) if opcode == op::OP_EQUALVERIFY => {
                let b = pop(&mut working)?;
                let a = pop(&mut working)?;
                if a != b {
                    return Err(EngineError::ScriptInvalid("OP_EQUALVERIFY failed".into()));
                }
            }
            Instruction::Op(opcode) if opcode == op::OP_CLTV => {
                verify_locktime(tx, input_index, top(&working)?)?;
            }
            Instruction::Op(opcode) if opcode == op::OP_CHECKSIG => {
                let pubkey_bytes = pop(&mut working)?;
                let sig_bytes = pop(&mut working)?;
                let ok = verify_checksig(tx, input_index, script_code, &sig_bytes, &pubkey_bytes)?;
                working.push(if ok { vec![1] } else { Vec::new() });
            }
            Instruction::Op(opcode) => {
                return Err(EngineError::ScriptInvalid(format!("unsupported opcode {opcode:?}")));
            }
        }
    }

    Ok(working)
}

fn branch_active(branch_stack: &[bool]) -> bool {
    branch_stack.iter().all(|&b| b)
}

fn pop(stack: &mut Vec<Vec<u8>>) -> Result<Vec<u8>, EngineError> {
    stack.pop().ok_or_else(|| EngineError::ScriptInvalid("stack underflow".into()))
}

fn top(stack: &[Vec<u8>]) -> Result<&Vec<u8>, EngineError> {
    stack.last().ok_or_else(|| EngineError::ScriptInvalid("stack underflow".into()))
}

fn is_truthy(bytes: &[u8]) -> bool {
    match bytes.split_last() {
        None => false,
        Some((&last, rest)) => rest.iter().any(|&b| b != 0) || (last & 0x7f) != 0,
    }
}

fn scriptnum_encode(mut n: i64) -> Vec<u8> {
    if n == 0 {
        return Vec::new();
    }
    let negative = n < 0;
    if negative {
        n = -n;
    }
    let mut bytes = Vec::new();
    while n > 0 {
        bytes.push((n & 0xff) as u8);
        n >>= 8;
    }
    if bytes.last().map(|&b| b & 0x80 != 0).unwrap_or(false) {
        bytes.push(if negative { 0x80 } else { 0x00 });
    } else if negative {
        *bytes.last_mut().unwrap() |= 0x80;
    }
    bytes
}

fn verify_locktime(tx: &Transaction, input_index: usize, required: &[u8]) -> Result<(), EngineError> {
    let required = decode_scriptnum(required);
    let sequence = tx.input[input_index].sequence;
    if sequence.is_final() {
        return Err(EngineError::ScriptInvalid("CLTV with final sequence number".into()));
    }
    let actual = tx.lock_time.to_consensus_u32() as i64;
    if actual < required {
        return Err(EngineError::ScriptInvalid("locktime requirement not met".into()));
    }
    Ok(())
}

fn decode_scriptnum(bytes: &[u8]) -> i64 {
    if bytes.is_empty() {
        return 0;
    }
    let mut result: i64 = 0;
    for (i, &byte) in bytes.iter().enumerate() {
        result |= (byte as i64) << (8 * i);
    }
    let last = bytes.len() - 1;
    if bytes[last] & 0x80 != 0 {
        result &= !(0x80i64 << (8 * last));
        result = -result;
    }
    result
}

fn verify_checksig(
    tx: &Transaction,
    input_index: usize,
    script_code: &Script,
    sig_bytes: &[u8],
    pubkey_bytes: &[u8],
) -> Result<bool, EngineError> {
    let (der, sighash_byte) = match sig_bytes.split_last() {
        Some((&byte, rest)) => (rest, byte),
        None => return Ok(false),
    };
    let sighash_type = EcdsaSighashType::from_consensus(sighash_byte as u32);
    let mut cache = SighashCache::new(tx);
    let sighash = cache
        .legacy_signature_hash(input_index, script_code, sighash_type.to_u32())
        .map_err(|err| EngineError::ScriptInvalid(err.to_string()))?;

    let secp = Secp256k1::verification_only();
    let message = Message::from_digest(sighash.to_byte_array());
    let signature = match ecdsa::Signature::from_der(der) {
        Ok(sig) => sig,
        Err(_) => return Ok(false),
    };
    let pubkey = match PublicKey::from_slice(pubkey_bytes) {
        Ok(pk) => pk,
        Err(_) => return Ok(false),
    };
    Ok(secp.verify_ecdsa(&message, &signature, &pubkey).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script;

    #[test]
    fn truthy_rejects_zero_and_negative_zero() {
        assert!(!is_truthy(&[]));
        assert!(!is_truthy(&[0x00]));
        assert!(!is_truthy(&[0x00, 0x80]));
        assert!(is_truthy(&[0x01]));
    }

    #[test]
    fn scriptnum_roundtrips_through_decode() {
        for n in [0i64, 1, -1, 32, 1_700_000_000, -1_700_000_000] {
            assert_eq!(decode_scriptnum(&scriptnum_encode(n)), n);
        }
    }

    #[test]
    fn rejects_unsupported_opcode() {
        let tx = Transaction {
            version: bitcoin::transaction::Version(2),
            lock_time: bitcoin::absolute::LockTime::ZERO,
            input: vec![],
            output: vec![],
        };
        let weird = bitcoin::script::Builder::new().push_opcode(op::OP_CAT).into_script();
        let redeem = script::build_htlc_script(&[0; 20], &[0; 20], 1, &[0; 32]);
        assert!(verify_spend(&tx, 0, &weird, &redeem).is_err());
    }
}
