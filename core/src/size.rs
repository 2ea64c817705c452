//! Virtual-size estimation for not-yet-signed spend transactions
//! (component C3).
//!
//! The fee a redeem/refund transaction needs depends on its own serialized
//! size, but that size depends on the signature the fee computation runs
//! before — so, as in the original implementation, we estimate. A DER
//! signature is at most 72 bytes plus a 1-byte sighash flag; we size for
//! the worst case rather than the common 70-71 byte case, so the estimate
//! never comes in low and produces an underpaying transaction.
const MAX_DER_SIGNATURE_SIZE: usize = 72 + 1;
const COMPRESSED_PUBKEY_SIZE: usize = 33;
const P2PKH_SCRIPT_PUBKEY_SIZE: usize = 25; // OP_DUP OP_HASH160 <20> OP_EQUALVERIFY OP_CHECKSIG

/// Bytes a script-push of `len` costs: the opcode/length prefix plus the
/// pushed data itself, mirroring `bitcoin::script::Builder::push_slice`'s
/// encoding choice (direct push, `OP_PUSHDATA1`, or `OP_PUSHDATA2`).
fn push_overhead(len: usize) -> usize {
    match len {
        0..=75 => 1,
        76..=255 => 2,
        256..=65535 => 3,
        _ => 5,
    }
}

fn push_size(len: usize) -> usize {
    push_overhead(len) + len
}

fn varint_size(n: u64) -> usize {
    match n {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x10000..=0xffffffff => 5,
        _ => 9,
    }
}

/// Size of a transaction input: outpoint (36) + sigScript length prefix +
/// sigScript + sequence (4).
fn input_size(sig_script_len: usize) -> usize {
    36 + varint_size(sig_script_len as u64) + sig_script_len + 4
}

/// Size of a P2PKH transaction output: value (8) + scriptPubKey length
/// prefix + scriptPubKey.
fn p2pkh_output_size() -> usize {
    8 + varint_size(P2PKH_SCRIPT_PUBKEY_SIZE as u64) + P2PKH_SCRIPT_PUBKEY_SIZE
}

/// Fixed overhead shared by every tx in this engine: version (4) + locktime
/// (4) + input-count varint + output-count varint, for a single-input,
/// single-output spend transaction.
fn base_overhead() -> usize {
    4 + 4 + varint_size(1) + varint_size(1)
}

/// sigScript length for the redeem path: `<sig> <pubkey> <secret> OP_1
/// <contract>`.
fn redeem_sig_script_len(contract_len: usize) -> usize {
    push_size(MAX_DER_SIGNATURE_SIZE)
        + push_size(COMPRESSED_PUBKEY_SIZE)
        + push_size(32) // the secret
        + 1 // OP_1
        + push_size(contract_len)
}

/// sigScript length for the refund path: `<sig> <pubkey> OP_0 <contract>`.
fn refund_sig_script_len(contract_len: usize) -> usize {
    push_size(MAX_DER_SIGNATURE_SIZE) + push_size(COMPRESSED_PUBKEY_SIZE) + 1 + push_size(contract_len)
}

/// Estimated serialized size, in bytes, of the redeem transaction that
/// spends `contract` (the HTLC redeem script).
pub fn estimate_redeem_size(contract: &[u8]) -> usize {
    base_overhead() + input_size(redeem_sig_script_len(contract.len())) + p2pkh_output_size()
}

/// Estimated serialized size, in bytes, of the refund transaction that
/// spends `contract`.
pub fn estimate_refund_size(contract: &[u8]) -> usize {
    base_overhead() + input_size(refund_sig_script_len(contract.len())) + p2pkh_output_size()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redeem_is_larger_than_refund() {
        let contract = vec![0u8; 97]; // typical HTLC template length
        assert!(estimate_redeem_size(&contract) > estimate_refund_size(&contract));
    }

    #[test]
    fn estimate_grows_with_contract_length() {
        let short = vec![0u8; 97];
        let long = vec![0u8; 300]; // forces OP_PUSHDATA1 framing
        assert!(estimate_redeem_size(&long) > estimate_redeem_size(&short));
    }
}
