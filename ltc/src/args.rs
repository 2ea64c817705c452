use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "Litecoin atomic-swap contract tool", long_about = None)]
pub struct Args {
    /// Path to the wallet.toml configuration file
    #[arg(short, long)]
    pub wallet: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Confirm the wallet RPC is reachable
    PingRpc,
    /// Print a fresh receiving address
    GetNewAddress,
    /// Build and fund a new HTLC, generating the secret
    Initiate { participant_address: String, amount_btc: f64 },
    /// Build and fund an HTLC using a counterparty-supplied secret hash
    Participate { initiator_address: String, amount_btc: f64, secret_hash_hex: String },
    /// Build the redeem transaction for a published contract
    Redeem { contract_hex: String, contract_tx_hex: String, secret_hex: String },
    /// Build the refund transaction for a published contract
    Refund { contract_hex: String, contract_tx_hex: String },
    /// Extract the secret from a counterparty's redemption transaction
    ExtractSecret { redemption_tx_hex: String, secret_hash_hex: String },
    /// Validate a contract against the HTLC template
    AuditContract { contract_hex: String, contract_tx_hex: String },
    /// Look up a transaction and its confirmation count
    GetTx { txid_hex: String },
}
