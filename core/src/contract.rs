//! Contract construction (component C6).
//!
//! Builds the HTLC redeem script for a counterparty and funds (but does not
//! yet broadcast — that's [`crate::ops::Engine::publish`]) the transaction
//! paying into it. Shared by both `initiate` (48h locktime, freshly
//! generated secret) and `participate` (24h locktime, secret hash supplied
//! by the initiator) — the only difference between the two operations is
//! which locktime and secret-hash source the caller passes in.
use bitcoin::{Address, Amount, Network, ScriptBuf, Transaction, TxOut};

use crate::error::{wallet_unavailable, EngineError};
use crate::fee;
use crate::script;
use crate::wallet::WalletAdapter;

/// Outcome of building a contract: the redeem script and P2SH address it
/// hashes to, and the funded (not yet broadcast) transaction paying into
/// it.
#[derive(Debug, Clone)]
pub struct BuiltContract {
    pub script: ScriptBuf,
    pub contract_address: Address,
    pub funding_tx: Transaction,
    pub contract_output_index: u32,
    pub secret_hash: [u8; 32],
    pub locktime: i64,
}

/// Builds and funds an HTLC paying `amount` to `counterparty`, lockable by
/// `secret_hash` until `locktime`, refundable to a fresh change address of
/// our own wallet after that.
pub fn build_contract(
    wallet: &dyn WalletAdapter,
    network: Network,
    tx_version: i32,
    counterparty: &Address,
    amount: Amount,
    secret_hash: [u8; 32],
    locktime: i64,
) -> Result<BuiltContract, EngineError> {
    if !counterparty.as_unchecked().is_valid_for_network(network) {
        return Err(EngineError::WrongNetwork(counterparty.to_string()));
    }
    let recipient_pkh = extract_p2pkh_hash160(counterparty)?;

    let refund_address = wallet.get_raw_change_address().map_err(wallet_unavailable)?;
    let refund_pkh = extract_p2pkh_hash160(&refund_address)?;

    let redeem_script = script::build_htlc_script(&refund_pkh, &recipient_pkh, locktime, &secret_hash);
    let contract_address =
        Address::p2sh(&redeem_script, network).map_err(|err| EngineError::InputDecode(err.to_string()))?;

    let unfunded = Transaction {
        version: bitcoin::transaction::Version(tx_version),
        lock_time: bitcoin::absolute::LockTime::ZERO,
        input: Vec::new(),
        output: vec![TxOut { value: amount, script_pubkey: contract_address.script_pubkey() }],
    };

    let fee_rate = fee::select_fee_rate(wallet).map_err(wallet_unavailable)?;
    let funded = wallet.fund_raw_transaction(&unfunded, fee_rate).map_err(wallet_unavailable)?;

    let contract_output_index = funded
        .output
        .iter()
        .position(|out| out.script_pubkey == contract_address.script_pubkey())
        .ok_or(EngineError::NoContractOutput)? as u32;

    Ok(BuiltContract {
        script: redeem_script,
        contract_address,
        funding_tx: funded,
        contract_output_index,
        secret_hash,
        locktime,
    })
}

/// Pulls the 20-byte `HASH160(pubkey)` out of a P2PKH address's
/// scriptPubKey (`OP_DUP OP_HASH160 <20> OP_EQUALVERIFY OP_CHECKSIG`),
/// failing for any other address type the way the original client's
/// `btcutil.DecodeAddress` type-switch does.
pub fn extract_p2pkh_hash160(address: &Address) -> Result<[u8; 20], EngineError> {
    let script_pubkey = address.script_pubkey();
    if !script_pubkey.is_p2pkh() {
        return Err(EngineError::NotP2PKH(address.to_string()));
    }
    let bytes = script_pubkey.as_bytes();
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&bytes[3..23]);
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::fake::FakeWallet;
    use bitcoin::NetworkKind;

    #[test]
    fn funds_a_contract_paying_the_counterparty() {
        let wallet = FakeWallet::new(NetworkKind::Test);
        let (counterparty, _) = wallet.fresh_address();
        let secret_hash = [9u8; 32];

        let built = build_contract(
            &wallet,
            Network::Testnet,
            2,
            &counterparty,
            Amount::from_sat(1_000_000),
            secret_hash,
            1_700_000_000,
        )
        .unwrap();

        assert_eq!(built.secret_hash, secret_hash);
        let out = &built.funding_tx.output[built.contract_output_index as usize];
        assert_eq!(out.script_pubkey, built.contract_address.script_pubkey());
        assert_eq!(out.value, Amount::from_sat(1_000_000));
    }

    #[test]
    fn rejects_non_p2pkh_counterparty() {
        let wallet = FakeWallet::new(NetworkKind::Test);
        let redeem_script = script::build_htlc_script(&[1; 20], &[2; 20], 1, &[3; 32]);
        let p2sh = Address::p2sh(&redeem_script, Network::Testnet).unwrap();

        let result = build_contract(&wallet, Network::Testnet, 2, &p2sh, Amount::from_sat(1), [0; 32], 1);
        assert!(matches!(result, Err(EngineError::NotP2PKH(_))));
    }
}
