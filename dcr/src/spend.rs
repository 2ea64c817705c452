//! Redeem and refund transaction construction for Decred.
//!
//! Decred's wallet signs server-side: rather than `dumpprivkey`-ing a
//! private key and signing locally (the LTC/XZC path in
//! `atomicswap_core::spend`), this calls `CreateSignature` with the
//! contract script as the previous output's `pkScript` and receives back
//! just the DER signature, which is then assembled into the same
//! `OP_1`/`OP_0`-selected sigScript `atomicswap_core::script` builds for
//! the other two chains — the HTLC template and its sigScript shape are
//! shared across all three chains, only key custody differs.
use atomicswap_core::error::EngineError;
use atomicswap_core::wallet::WalletAdapter;
use atomicswap_core::{fee, script, size};
use bitcoin::absolute::LockTime;
use bitcoin::hashes::Hash;
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Witness};

use crate::grpc_wallet::{next_address, GrpcWallet};
use crate::walletrpc::{CreateSignatureRequest, SignatureType};

const REDEEM_SEQUENCE: u32 = 0xFFFFFFFE;
const REFUND_SEQUENCE: u32 = 0;

pub struct SpendResult {
    pub tx: Transaction,
    pub fee: Amount,
}

fn contract_output(funding_tx: &Transaction, contract_output_index: u32) -> Result<(OutPoint, Amount), EngineError> {
    let out = funding_tx.output.get(contract_output_index as usize).ok_or(EngineError::NoContractOutput)?;
    Ok((OutPoint { txid: funding_tx.compute_txid(), vout: contract_output_index }, out.value))
}

fn create_signature(
    wallet: &GrpcWallet,
    unsigned_tx: &Transaction,
    contract_script: &ScriptBuf,
) -> anyhow::Result<Vec<u8>> {
    let passphrase = wallet.passphrase.lock().expect("passphrase mutex poisoned").clone();
    let request = CreateSignatureRequest {
        passphrase,
        serialized_transaction: bitcoin::consensus::serialize(unsigned_tx),
        input_index: 0,
        previous_pk_script: contract_script.to_bytes(),
        hash_type: SignatureType::SighashTypeAll as i32,
    };
    let mut client = wallet.client();
    let response = wallet.block_on(client.create_signature(request))?.into_inner();
    Ok(response.signature)
}

pub fn build_redeem_tx(
    wallet: &GrpcWallet,
    tx_version: i32,
    funding_tx: &Transaction,
    contract_output_index: u32,
    contract_script: &ScriptBuf,
    secret: &[u8; 32],
) -> anyhow::Result<SpendResult> {
    let (outpoint, contract_value) = contract_output(funding_tx, contract_output_index)?;
    let (recipient_address, recipient_pubkey) = next_address(wallet, crate::walletrpc::NextAddressKind::Bip0044External)?;
    let recipient_pkh = atomicswap_core::contract::extract_p2pkh_hash160(&recipient_address)?;
    let recipient_script_pubkey = ScriptBuf::new_p2pkh(&bitcoin::PubkeyHash::from_byte_array(recipient_pkh));

    let fee_rate = fee::select_fee_rate(wallet)?;
    let relay_fee = wallet.relay_fee()?;
    let fee_amount = fee::fee_for_size(fee_rate, size::estimate_redeem_size(contract_script.as_bytes()));
    let output_value = contract_value.checked_sub(fee_amount).ok_or(EngineError::DustOutput(contract_value.to_sat()))?;
    if fee::is_dust(output_value, relay_fee) {
        anyhow::bail!(EngineError::DustOutput(output_value.to_sat()));
    }

    let mut tx = Transaction {
        version: Version(tx_version),
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: outpoint,
            script_sig: ScriptBuf::new(),
            sequence: Sequence(REDEEM_SEQUENCE),
            witness: Witness::new(),
        }],
        output: vec![TxOut { value: output_value, script_pubkey: recipient_script_pubkey }],
    };

    let sig = create_signature(wallet, &tx, contract_script)?;
    let sig_script = script::build_redeem_sigscript(contract_script, &sig, &recipient_pubkey, secret);
    tx.input[0].script_sig = sig_script;

    // atomicswap_core::verify::verify_spend assumes a legacy Bitcoin
    // sighash (SighashCache::legacy_signature_hash); dcrwallet signs
    // against Decred's own sighash over its own transaction wire format,
    // so running that verifier here would reject a correctly-signed
    // spend. Self-verification of the gRPC-signed transaction is not
    // implemented; see DESIGN.md's C7 entry.
    Ok(SpendResult { tx, fee: fee_amount })
}

pub fn build_refund_tx(
    wallet: &GrpcWallet,
    tx_version: i32,
    funding_tx: &Transaction,
    contract_output_index: u32,
    contract_script: &ScriptBuf,
    locktime: i64,
) -> anyhow::Result<SpendResult> {
    let (outpoint, contract_value) = contract_output(funding_tx, contract_output_index)?;
    let (refund_address, refund_pubkey) = next_address(wallet, crate::walletrpc::NextAddressKind::Bip0044Internal)?;
    let refund_pkh = atomicswap_core::contract::extract_p2pkh_hash160(&refund_address)?;
    let refund_script_pubkey = ScriptBuf::new_p2pkh(&bitcoin::PubkeyHash::from_byte_array(refund_pkh));

    let fee_rate = fee::select_fee_rate(wallet)?;
    let relay_fee = wallet.relay_fee()?;
    let fee_amount = fee::fee_for_size(fee_rate, size::estimate_refund_size(contract_script.as_bytes()));
    let output_value = contract_value.checked_sub(fee_amount).ok_or(EngineError::DustOutput(contract_value.to_sat()))?;
    if fee::is_dust(output_value, relay_fee) {
        anyhow::bail!(EngineError::DustOutput(output_value.to_sat()));
    }

    let lock_time = LockTime::from_consensus(u32::try_from(locktime)?);
    let mut tx = Transaction {
        version: Version(tx_version),
        lock_time,
        input: vec![TxIn {
            previous_output: outpoint,
            script_sig: ScriptBuf::new(),
            sequence: Sequence(REFUND_SEQUENCE),
            witness: Witness::new(),
        }],
        output: vec![TxOut { value: output_value, script_pubkey: refund_script_pubkey }],
    };

    let sig = create_signature(wallet, &tx, contract_script)?;
    let sig_script = script::build_refund_sigscript(contract_script, &sig, &refund_pubkey);
    tx.input[0].script_sig = sig_script;

    // See the matching note in build_redeem_tx: no self-verification
    // against atomicswap_core::verify here, same reason.

    Ok(SpendResult { tx, fee: fee_amount })
}
