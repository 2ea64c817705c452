//! Decred atomic-swap contract tool.
mod args;
mod config;
mod grpc_wallet;
mod profile;
mod spend;
mod walletrpc;

use std::str::FromStr;

use anyhow::{Context, Result};
use atomicswap_core::wallet::WalletAdapter;
use atomicswap_core::{CancellationToken, ChainProfile, Engine};
use bitcoin::consensus::{deserialize, serialize};
use bitcoin::{Address, Amount, Network, ScriptBuf, Transaction};
use clap::Parser;

use args::{Args, Command};
use config::WalletConfig;
use grpc_wallet::GrpcWallet;
use profile::DcrProfile;

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let args = Args::parse();
    let config = WalletConfig::from_file(&args.wallet)?;
    let wallet = GrpcWallet::connect(&config)?;
    let profile = DcrProfile::new(config.testnet);
    let network = if config.testnet { Network::Testnet } else { Network::Bitcoin };

    let session = atomicswap_core::wallet::WalletSession::unlock(&wallet, &config.wallet_passphrase, 300)
        .context("unlocking wallet")?;
    let engine = Engine::new(&profile, &wallet, network);
    let token = CancellationToken::new();

    run(&engine, &wallet, &profile, &token, args.command)?;
    drop(session);
    Ok(())
}

fn run(engine: &Engine, wallet: &GrpcWallet, profile: &DcrProfile, token: &CancellationToken, command: Command) -> Result<()> {
    match command {
        Command::PingRpc => {
            engine.ping_rpc(token)?;
            println!("wallet RPC is reachable");
        }
        Command::GetNewAddress => {
            println!("{}", engine.get_new_address(token)?);
        }
        Command::Initiate { participant_address, amount_btc } => {
            let address = parse_address(&participant_address)?;
            let amount = amount_from_btc(amount_btc)?;
            let initiated = engine.initiate(token, &address, amount)?;
            print_contract("secret", &hex::encode(initiated.secret));
            print_contract("secret hash", &hex::encode(atomicswap_core::secret::hash_secret(&initiated.secret)));
            print_contract("contract", &hex::encode(initiated.contract.script.as_bytes()));
            print_contract("contract address", &initiated.contract.contract_address.to_string());
            print_contract("contract transaction", &hex::encode(serialize(&initiated.contract.funding_tx)));
            let txid = engine.publish(token, &initiated.contract.funding_tx)?;
            print_contract("published txid", &txid.to_string());
        }
        Command::Participate { initiator_address, amount_btc, secret_hash_hex } => {
            let address = parse_address(&initiator_address)?;
            let amount = amount_from_btc(amount_btc)?;
            let secret_hash = parse_hash32(&secret_hash_hex)?;
            let contract = engine.participate(token, &address, amount, secret_hash)?;
            print_contract("contract", &hex::encode(contract.script.as_bytes()));
            print_contract("contract address", &contract.contract_address.to_string());
            print_contract("contract transaction", &hex::encode(serialize(&contract.funding_tx)));
            let txid = engine.publish(token, &contract.funding_tx)?;
            print_contract("published txid", &txid.to_string());
        }
        Command::Redeem { contract_hex, contract_tx_hex, secret_hex } => {
            let contract = ScriptBuf::from_bytes(hex::decode(contract_hex)?);
            let funding_tx: Transaction = deserialize(&hex::decode(contract_tx_hex)?)?;
            let secret = parse_hash32(&secret_hex)?;
            let index = locate_contract_output(&funding_tx, &contract, wallet)?;
            let result = spend::build_redeem_tx(wallet, profile.tx_version(), &funding_tx, index, &contract, &secret)?;
            print_contract("redeem transaction", &hex::encode(serialize(&result.tx)));
            let txid = wallet.send_raw_transaction(&result.tx)?;
            print_contract("published txid", &txid.to_string());
        }
        Command::Refund { contract_hex, contract_tx_hex } => {
            let contract = ScriptBuf::from_bytes(hex::decode(contract_hex)?);
            let funding_tx: Transaction = deserialize(&hex::decode(contract_tx_hex)?)?;
            let pushes = atomicswap_core::script::parse(&contract)?;
            let index = locate_contract_output(&funding_tx, &contract, wallet)?;
            let result =
                spend::build_refund_tx(wallet, profile.tx_version(), &funding_tx, index, &contract, pushes.locktime)?;
            print_contract("refund transaction", &hex::encode(serialize(&result.tx)));
            let txid = wallet.send_raw_transaction(&result.tx)?;
            print_contract("published txid", &txid.to_string());
        }
        Command::ExtractSecret { redemption_tx_hex, secret_hash_hex } => {
            let tx: Transaction = deserialize(&hex::decode(redemption_tx_hex)?)?;
            let secret_hash = parse_hash32(&secret_hash_hex)?;
            let secret = engine.extract_secret(&tx, &secret_hash)?;
            println!("{}", hex::encode(secret));
        }
        Command::AuditContract { contract_hex, contract_tx_hex } => {
            let contract = ScriptBuf::from_bytes(hex::decode(contract_hex)?);
            let funding_tx: Transaction = deserialize(&hex::decode(contract_tx_hex)?)?;
            let audit = engine.audit_contract(&contract, &funding_tx)?;
            print_contract("contract address", &audit.contract_address.to_string());
            print_contract("contract amount", &audit.amount.to_string());
            print_contract("recipient address", &audit.recipient_address.to_string());
            print_contract("refund address", &audit.refund_address.to_string());
            print_contract("secret hash", &hex::encode(audit.secret_hash));
            print_contract("locktime", &audit.locktime.to_string());
        }
    }
    Ok(())
}

fn print_contract(label: &str, value: &str) {
    println!("{label}: {value}");
}

fn parse_address(s: &str) -> Result<Address> {
    Ok(Address::from_str(s)?.assume_checked())
}

fn amount_from_btc(btc: f64) -> Result<Amount> {
    Amount::from_btc(btc).context("invalid amount")
}

fn parse_hash32(s: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(s)?;
    bytes.try_into().map_err(|_| anyhow::anyhow!("expected a 32-byte hex value"))
}

fn locate_contract_output(funding_tx: &Transaction, contract: &ScriptBuf, wallet: &dyn WalletAdapter) -> Result<u32> {
    let network = match wallet.network_kind() {
        bitcoin::NetworkKind::Main => Network::Bitcoin,
        bitcoin::NetworkKind::Test => Network::Testnet,
    };
    let contract_address = Address::p2sh(contract, network)?;
    funding_tx
        .output
        .iter()
        .position(|out| out.script_pubkey == contract_address.script_pubkey())
        .map(|i| i as u32)
        .ok_or_else(|| anyhow::anyhow!("transaction does not contain the contract output"))
}
