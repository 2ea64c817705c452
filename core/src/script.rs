//! HTLC redeem-script codec (component C2).
//!
//! Builds and parses the exact opcode template from spec §6.1:
//!
//! ```text
//! OP_IF
//!   OP_SIZE <32> OP_EQUALVERIFY
//!   OP_SHA256 <secret_hash 32B> OP_EQUALVERIFY
//!   OP_DUP OP_HASH160 <recipient_pkh 20B>
//! OP_ELSE
//!   <locktime> OP_CHECKLOCKTIMEVERIFY OP_DROP
//!   OP_DUP OP_HASH160 <refund_pkh 20B>
//! OP_ENDIF
//! OP_EQUALVERIFY
//! OP_CHECKSIG
//! ```
//!
//! Every chain in this engine (LTC, XZC, DCR) shares this module: the
//! three chains' script interpreters are opcode-compatible for this
//! template, only address encoding and transaction wire format differ.
use bitcoin::opcodes::all as op;
use bitcoin::script::{Builder, Instruction, PushBytesBuf, Script, ScriptBuf};

use crate::error::ScriptError;

pub const SECRET_SIZE: usize = 32;

/// The four data pushes (plus the literal secret-size) extracted from a
/// parsed HTLC redeem-script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtlcPushes {
    pub recipient_hash160: [u8; 20],
    pub refund_hash160: [u8; 20],
    pub secret_hash: [u8; 32],
    pub secret_size: i64,
    pub locktime: i64,
}

/// Builds the HTLC redeem-script for `(refund_pkh, recipient_pkh, locktime,
/// secret_hash)`. All integer pushes use `Builder`'s minimal scriptnum
/// encoding, matching the byte-exact template the consensus layer of every
/// supported chain requires.
pub fn build_htlc_script(
    refund_pkh: &[u8; 20],
    recipient_pkh: &[u8; 20],
    locktime: i64,
    secret_hash: &[u8; 32],
) -> ScriptBuf {
    Builder::new()
        .push_opcode(op::OP_IF)
        .push_opcode(op::OP_SIZE)
        .push_int(SECRET_SIZE as i64)
        .push_opcode(op::OP_EQUALVERIFY)
        .push_opcode(op::OP_SHA256)
        .push_slice(secret_hash)
        .push_opcode(op::OP_EQUALVERIFY)
        .push_opcode(op::OP_DUP)
        .push_opcode(op::OP_HASH160)
        .push_slice(recipient_pkh)
        .push_opcode(op::OP_ELSE)
        .push_int(locktime)
        .push_opcode(op::OP_CLTV)
        .push_opcode(op::OP_DROP)
        .push_opcode(op::OP_DUP)
        .push_opcode(op::OP_HASH160)
        .push_slice(refund_pkh)
        .push_opcode(op::OP_ENDIF)
        .push_opcode(op::OP_EQUALVERIFY)
        .push_opcode(op::OP_CHECKSIG)
        .into_script()
}

/// Signature-script for the redeem path: `<sig> <pubkey> <secret> OP_1
/// <redeem_script>`. `OP_1` selects the HTLC's `OP_IF` branch.
pub fn build_redeem_sigscript(contract: &Script, sig: &[u8], pubkey: &[u8], secret: &[u8]) -> ScriptBuf {
    Builder::new()
        .push_slice(push_buf(sig))
        .push_slice(push_buf(pubkey))
        .push_slice(push_buf(secret))
        .push_int(1)
        .push_slice(push_buf(contract.as_bytes()))
        .into_script()
}

/// Signature-script for the refund path: `<sig> <pubkey> OP_0
/// <redeem_script>`. `OP_0` selects the HTLC's `OP_ELSE` branch.
pub fn build_refund_sigscript(contract: &Script, sig: &[u8], pubkey: &[u8]) -> ScriptBuf {
    Builder::new()
        .push_slice(push_buf(sig))
        .push_slice(push_buf(pubkey))
        .push_int(0)
        .push_slice(push_buf(contract.as_bytes()))
        .into_script()
}

fn push_buf(bytes: &[u8]) -> PushBytesBuf {
    PushBytesBuf::try_from(bytes.to_vec()).expect("data push exceeds the 2^32-1 script limit")
}

/// Parses a candidate redeem-script against the template above, failing
/// with [`ScriptError`] on any deviation — wrong opcode, wrong push length,
/// or trailing instructions the template doesn't account for.
pub fn parse(script: &Script) -> Result<HtlcPushes, ScriptError> {
    let instrs: Vec<Instruction> = script
        .instructions()
        .collect::<Result<_, _>>()
        .map_err(|_| ScriptError::Truncated)?;

    let mut cursor = Cursor { instrs: &instrs, idx: 0 };

    cursor.expect_op(op::OP_IF)?;
    cursor.expect_op(op::OP_SIZE)?;
    let secret_size = cursor.expect_int()?;
    cursor.expect_op(op::OP_EQUALVERIFY)?;
    cursor.expect_op(op::OP_SHA256)?;
    let secret_hash = cursor.expect_push::<32>()?;
    cursor.expect_op(op::OP_EQUALVERIFY)?;
    cursor.expect_op(op::OP_DUP)?;
    cursor.expect_op(op::OP_HASH160)?;
    let recipient_hash160 = cursor.expect_push::<20>()?;
    cursor.expect_op(op::OP_ELSE)?;
    let locktime = cursor.expect_int()?;
    cursor.expect_op(op::OP_CLTV)?;
    cursor.expect_op(op::OP_DROP)?;
    cursor.expect_op(op::OP_DUP)?;
    cursor.expect_op(op::OP_HASH160)?;
    let refund_hash160 = cursor.expect_push::<20>()?;
    cursor.expect_op(op::OP_ENDIF)?;
    cursor.expect_op(op::OP_EQUALVERIFY)?;
    cursor.expect_op(op::OP_CHECKSIG)?;
    cursor.expect_end()?;

    if secret_size != SECRET_SIZE as i64 {
        return Err(ScriptError::BadSecretSize(secret_size));
    }

    Ok(HtlcPushes {
        recipient_hash160,
        refund_hash160,
        secret_hash,
        secret_size,
        locktime,
    })
}

/// Walks a flattened instruction list with named-opcode/fixed-length-push
/// expectations, producing [`ScriptError`] on the first mismatch.
struct Cursor<'a, 'b> {
    instrs: &'a [Instruction<'b>],
    idx: usize,
}

impl<'a, 'b> Cursor<'a, 'b> {
    fn expect_op(&mut self, wanted: bitcoin::opcodes::Opcode) -> Result<(), ScriptError> {
        match self.instrs.get(self.idx) {
            Some(Instruction::Op(op)) if *op == wanted => {
                self.idx += 1;
                Ok(())
            }
            Some(_) => Err(ScriptError::BadOpcode { expected: opcode_name(wanted), index: self.idx }),
            None => Err(ScriptError::Truncated),
        }
    }

    fn expect_push<const N: usize>(&mut self) -> Result<[u8; N], ScriptError> {
        match self.instrs.get(self.idx) {
            Some(Instruction::PushBytes(bytes)) => {
                let bytes = bytes.as_bytes();
                if bytes.len() != N {
                    return Err(ScriptError::BadPushLength { expected: N, got: bytes.len() });
                }
                self.idx += 1;
                let mut out = [0u8; N];
                out.copy_from_slice(bytes);
                Ok(out)
            }
            Some(_) => Err(ScriptError::BadPushLength { expected: N, got: 0 }),
            None => Err(ScriptError::Truncated),
        }
    }

    fn expect_int(&mut self) -> Result<i64, ScriptError> {
        match self.instrs.get(self.idx) {
            Some(Instruction::PushBytes(bytes)) => {
                self.idx += 1;
                Ok(decode_scriptnum(bytes.as_bytes()))
            }
            Some(_) => Err(ScriptError::BadPushLength { expected: 0, got: 0 }),
            None => Err(ScriptError::Truncated),
        }
    }

    fn expect_end(&self) -> Result<(), ScriptError> {
        if self.idx == self.instrs.len() {
            Ok(())
        } else {
            Err(ScriptError::BadOpcode { expected: "end of script", index: self.idx })
        }
    }
}

fn opcode_name(opcode: bitcoin::opcodes::Opcode) -> &'static str {
    match opcode {
        x if x == op::OP_IF => "OP_IF",
        x if x == op::OP_SIZE => "OP_SIZE",
        x if x == op::OP_EQUALVERIFY => "OP_EQUALVERIFY",
        x if x == op::OP_SHA256 => "OP_SHA256",
        x if x == op::OP_DUP => "OP_DUP",
        x if x == op::OP_HASH160 => "OP_HASH160",
        x if x == op::OP_ELSE => "OP_ELSE",
        x if x == op::OP_CLTV => "OP_CHECKLOCKTIMEVERIFY",
        x if x == op::OP_DROP => "OP_DROP",
        x if x == op::OP_ENDIF => "OP_ENDIF",
        x if x == op::OP_CHECKSIG => "OP_CHECKSIG",
        _ => "unknown opcode",
    }
}

/// Minimal little-endian sign-magnitude scriptnum decode (the inverse of
/// `Builder::push_int`'s encoding), matching Bitcoin Script's `CScriptNum`.
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

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::hashes::{sha256, Hash};

    fn sample_pushes() -> (i64, [u8; 32], [u8; 20], [u8; 20]) {
        let locktime = 0x5D000000;
        let secret_hash = sha256::Hash::hash(&[b'a'; 32]).to_byte_array();
        let recipient_pkh = [0x11u8; 20];
        let refund_pkh = [0x22u8; 20];
        (locktime, secret_hash, recipient_pkh, refund_pkh)
    }

    #[test]
    fn round_trips_the_template() {
        let (locktime, secret_hash, recipient_pkh, refund_pkh) = sample_pushes();
        let script = build_htlc_script(&refund_pkh, &recipient_pkh, locktime, &secret_hash);
        let pushes = parse(&script).expect("template parses");
        assert_eq!(pushes.recipient_hash160, recipient_pkh);
        assert_eq!(pushes.refund_hash160, refund_pkh);
        assert_eq!(pushes.secret_hash, secret_hash);
        assert_eq!(pushes.secret_size, 32);
        assert_eq!(pushes.locktime, locktime);
    }

    #[test]
    fn rejects_wrong_secret_size() {
        // Hand-build a variant with OP_SIZE 16 instead of 32.
        let (locktime, secret_hash, recipient_pkh, refund_pkh) = sample_pushes();
        let bad = Builder::new()
            .push_opcode(op::OP_IF)
            .push_opcode(op::OP_SIZE)
            .push_int(16)
            .push_opcode(op::OP_EQUALVERIFY)
            .push_opcode(op::OP_SHA256)
            .push_slice(&secret_hash)
            .push_opcode(op::OP_EQUALVERIFY)
            .push_opcode(op::OP_DUP)
            .push_opcode(op::OP_HASH160)
            .push_slice(&recipient_pkh)
            .push_opcode(op::OP_ELSE)
            .push_int(locktime)
            .push_opcode(op::OP_CLTV)
            .push_opcode(op::OP_DROP)
            .push_opcode(op::OP_DUP)
            .push_opcode(op::OP_HASH160)
            .push_slice(&refund_pkh)
            .push_opcode(op::OP_ENDIF)
            .push_opcode(op::OP_EQUALVERIFY)
            .push_opcode(op::OP_CHECKSIG)
            .into_script();
        match parse(&bad) {
            Err(ScriptError::BadSecretSize(16)) => {}
            other => panic!("expected BadSecretSize(16), got {other:?}"),
        }
    }

    #[test]
    fn rejects_truncated_script() {
        let script = Builder::new().push_opcode(op::OP_IF).push_opcode(op::OP_SIZE).into_script();
        assert!(matches!(parse(&script), Err(ScriptError::Truncated)));
    }

    #[test]
    fn redeem_sigscript_selects_if_branch() {
        let contract = build_htlc_script(&[0x22; 20], &[0x11; 20], 1_700_000_000, &[0u8; 32]);
        let sigscript = build_redeem_sigscript(&contract, &[1, 2, 3], &[4, 5, 6], &[7; 32]);
        let instrs: Vec<_> = sigscript.instructions().collect::<Result<_, _>>().unwrap();
        // sig, pubkey, secret, OP_1, contract
        assert_eq!(instrs.len(), 5);
        assert!(matches!(instrs[3], Instruction::Op(o) if o == op::OP_PUSHNUM_1));
    }
}
