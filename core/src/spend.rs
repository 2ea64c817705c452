//! Redeem and refund transaction construction (component C7).
//!
//! Builds, signs, and self-verifies the transaction that spends a
//! previously published HTLC, either by revealing the secret (`redeem`) or
//! after the locktime has passed (`refund`). Grounded in
//! `redeemP2SHContract`/`refundP2SHContract` from the original client:
//! single input spending the contract output, single P2PKH output paying
//! the caller's own wallet, fee computed from the estimated (not actual,
//! since the signature isn't made yet when the fee is chosen) transaction
//! size.
use bitcoin::absolute::LockTime;
use bitcoin::ecdsa::Signature as EcdsaSignature;
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::{Message, Secp256k1};
use bitcoin::sighash::SighashCache;
use bitcoin::transaction::Version;
use bitcoin::{Amount, EcdsaSighashType, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Witness};

use crate::contract::extract_p2pkh_hash160;
use crate::error::{wallet_unavailable, EngineError};
use crate::fee;
use crate::script;
use crate::size;
use crate::verify;
use crate::wallet::WalletAdapter;

/// nSequence for a redeem input. Non-final so `OP_CHECKLOCKTIMEVERIFY`
/// would be enforceable if the redeem branch hit it (it doesn't — CLTV is
/// only on the refund branch — but BIP65 requires every input spending a
/// CLTV-bearing script to carry a non-final sequence number, regardless of
/// which branch it executes).
const REDEEM_SEQUENCE: u32 = 0xFFFFFFFE;
/// nSequence for a refund input: the minimum non-final value, matching
/// the original client's `wire.TxIn{..., Sequence: 0}`.
const REFUND_SEQUENCE: u32 = 0;

pub struct SpendResult {
    pub tx: Transaction,
    pub fee: Amount,
}

struct ContractOutpoint {
    outpoint: OutPoint,
    value: Amount,
}

fn locate_contract_output(funding_tx: &Transaction, contract_output_index: u32) -> Result<ContractOutpoint, EngineError> {
    let out = funding_tx
        .output
        .get(contract_output_index as usize)
        .ok_or(EngineError::NoContractOutput)?;
    Ok(ContractOutpoint {
        outpoint: OutPoint { txid: funding_tx.compute_txid(), vout: contract_output_index },
        value: out.value,
    })
}

fn legacy_sign(
    tx: &Transaction,
    input_index: usize,
    script_code: &ScriptBuf,
    secret_key: &bitcoin::secp256k1::SecretKey,
) -> Result<Vec<u8>, EngineError> {
    let mut cache = SighashCache::new(tx);
    let sighash = cache
        .legacy_signature_hash(input_index, script_code, EcdsaSighashType::All.to_u32())
        .map_err(|err| EngineError::ScriptInvalid(err.to_string()))?;
    let secp = Secp256k1::new();
    let message = Message::from_digest(sighash.to_byte_array());
    let signature = secp.sign_ecdsa(&message, secret_key);
    let sig = EcdsaSignature { signature, sighash_type: EcdsaSighashType::All };
    Ok(sig.to_vec())
}

/// Builds the redeem transaction: spends the contract output by revealing
/// `secret`, paying the resulting value (minus fee) to a fresh address of
/// our own wallet.
pub fn build_redeem_tx(
    wallet: &dyn WalletAdapter,
    tx_version: i32,
    funding_tx: &Transaction,
    contract_output_index: u32,
    contract_script: &ScriptBuf,
    secret: &[u8; 32],
) -> Result<SpendResult, EngineError> {
    let contract_out = locate_contract_output(funding_tx, contract_output_index)?;
    let recipient_address = wallet.get_new_address().map_err(wallet_unavailable)?;
    let recipient_pkh = extract_p2pkh_hash160(&recipient_address)?;
    let recipient_script_pubkey = ScriptBuf::new_p2pkh(&bitcoin::PubkeyHash::from_byte_array(recipient_pkh));

    let fee_rate = fee::select_fee_rate(wallet).map_err(wallet_unavailable)?;
    let relay_fee = wallet.relay_fee().map_err(wallet_unavailable)?;
    let estimated_size = size::estimate_redeem_size(contract_script.as_bytes());
    let fee_amount = fee::fee_for_size(fee_rate, estimated_size);

    let output_value = contract_out
        .value
        .checked_sub(fee_amount)
        .ok_or_else(|| EngineError::DustOutput(contract_out.value.to_sat()))?;
    if fee::is_dust(output_value, relay_fee) {
        return Err(EngineError::DustOutput(output_value.to_sat()));
    }

    let mut tx = Transaction {
        version: Version(tx_version),
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: contract_out.outpoint,
            script_sig: ScriptBuf::new(),
            sequence: Sequence(REDEEM_SEQUENCE),
            witness: Witness::new(),
        }],
        output: vec![TxOut { value: output_value, script_pubkey: recipient_script_pubkey }],
    };

    let privkey = wallet.dump_priv_key(&recipient_address).map_err(wallet_unavailable)?;
    let sig = legacy_sign(&tx, 0, contract_script, &privkey.inner)?;
    let secp = Secp256k1::new();
    let pubkey = privkey.public_key(&secp);
    let sig_script = script::build_redeem_sigscript(contract_script, &sig, &pubkey.to_bytes(), secret);
    tx.input[0].script_sig = sig_script.clone();

    verify::verify_spend(&tx, 0, &sig_script, contract_script)?;

    Ok(SpendResult { tx, fee: fee_amount })
}

/// Builds the refund transaction: spends the contract output back to our
/// own wallet once `locktime` has passed.
pub fn build_refund_tx(
    wallet: &dyn WalletAdapter,
    tx_version: i32,
    funding_tx: &Transaction,
    contract_output_index: u32,
    contract_script: &ScriptBuf,
    locktime: i64,
) -> Result<SpendResult, EngineError> {
    let contract_out = locate_contract_output(funding_tx, contract_output_index)?;
    let refund_address = wallet.get_raw_change_address().map_err(wallet_unavailable)?;
    let refund_pkh = extract_p2pkh_hash160(&refund_address)?;
    let refund_script_pubkey = ScriptBuf::new_p2pkh(&bitcoin::PubkeyHash::from_byte_array(refund_pkh));

    let fee_rate = fee::select_fee_rate(wallet).map_err(wallet_unavailable)?;
    let relay_fee = wallet.relay_fee().map_err(wallet_unavailable)?;
    let estimated_size = size::estimate_refund_size(contract_script.as_bytes());
    let fee_amount = fee::fee_for_size(fee_rate, estimated_size);

    let output_value = contract_out
        .value
        .checked_sub(fee_amount)
        .ok_or_else(|| EngineError::DustOutput(contract_out.value.to_sat()))?;
    if fee::is_dust(output_value, relay_fee) {
        return Err(EngineError::DustOutput(output_value.to_sat()));
    }

    let lock_time =
        LockTime::from_consensus(u32::try_from(locktime).map_err(|_| EngineError::InputDecode("locktime out of range".into()))?);

    let mut tx = Transaction {
        version: Version(tx_version),
        lock_time,
        input: vec![TxIn {
            previous_output: contract_out.outpoint,
            script_sig: ScriptBuf::new(),
            sequence: Sequence(REFUND_SEQUENCE),
            witness: Witness::new(),
        }],
        output: vec![TxOut { value: output_value, script_pubkey: refund_script_pubkey }],
    };

    let privkey = wallet.dump_priv_key(&refund_address).map_err(wallet_unavailable)?;
    let sig = legacy_sign(&tx, 0, contract_script, &privkey.inner)?;
    let secp = Secp256k1::new();
    let pubkey = privkey.public_key(&secp);
    let sig_script = script::build_refund_sigscript(contract_script, &sig, &pubkey.to_bytes());
    tx.input[0].script_sig = sig_script.clone();

    verify::verify_spend(&tx, 0, &sig_script, contract_script)?;

    Ok(SpendResult { tx, fee: fee_amount })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::build_contract;
    use crate::wallet::fake::FakeWallet;
    use bitcoin::{Network, NetworkKind};

    #[test]
    fn redeem_tx_is_self_consistent() {
        let wallet = FakeWallet::new(NetworkKind::Test);
        let (counterparty, _) = wallet.fresh_address();
        let secret = [42u8; 32];
        let secret_hash = crate::secret::hash_secret(&secret);

        let built = build_contract(
            &wallet,
            Network::Testnet,
            2,
            &counterparty,
            Amount::from_sat(1_000_000),
            secret_hash,
            1_900_000_000,
        )
        .unwrap();

        let result = build_redeem_tx(
            &wallet,
            2,
            &built.funding_tx,
            built.contract_output_index,
            &built.script,
            &secret,
        )
        .unwrap();

        assert_eq!(result.tx.input[0].sequence, Sequence(REDEEM_SEQUENCE));
        assert!(result.fee.to_sat() > 0);
    }

    #[test]
    fn refund_tx_sets_locktime_and_zero_sequence() {
        let wallet = FakeWallet::new(NetworkKind::Test);
        let (counterparty, _) = wallet.fresh_address();
        let locktime = 1_900_000_000i64;

        let built =
            build_contract(&wallet, Network::Testnet, 2, &counterparty, Amount::from_sat(1_000_000), [1; 32], locktime).unwrap();

        let result =
            build_refund_tx(&wallet, 2, &built.funding_tx, built.contract_output_index, &built.script, locktime).unwrap();

        assert_eq!(result.tx.input[0].sequence, Sequence(REFUND_SEQUENCE));
        assert_eq!(result.tx.lock_time.to_consensus_u32() as i64, locktime);
    }
}
