//! `WalletAdapter` over `dcrwallet`'s gRPC `WalletService`.
//!
//! Every trait method here is synchronous — `atomicswap_core` is written
//! against a blocking `WalletAdapter`, matching both `bitcoincore-rpc`'s
//! client and the original client's own fully synchronous RPC calls — so
//! this adapter carries its own single-threaded Tokio runtime and blocks
//! on it per call rather than forcing the whole engine async for the one
//! chain that happens to speak gRPC.
//!
//! Two simplifications are accepted here and recorded in the project's
//! design notes: addresses round-trip through `bitcoin::Address`'s base58
//! codec rather than Decred's own (distinct version bytes), and signed
//! transactions round-trip through `bitcoin::consensus` encoding rather
//! than Decred's prefix/witness wire split. Both are adequate for this
//! engine's own script-template-only concerns; a production Decred client
//! would carry dedicated address and transaction types instead.
use std::sync::Mutex;

use atomicswap_core::wallet::{GetTxResult, WalletAdapter};
use bitcoin::hashes::Hash;
use bitcoin::{Address, Amount, NetworkKind, PrivateKey, Transaction, Txid};
use tonic::transport::{Certificate, Channel, ClientTlsConfig};

use crate::config::WalletConfig;
use crate::walletrpc::wallet_service_client::WalletServiceClient;
use crate::walletrpc::{
    ConstructTransactionRequest, GetTransactionRequest, NextAddressGapPolicy, NextAddressKind, NextAddressRequest,
    PingRequest, PublishTransactionRequest,
};

pub struct GrpcWallet {
    runtime: tokio::runtime::Runtime,
    client: Mutex<WalletServiceClient<Channel>>,
    network: NetworkKind,
    pub(crate) passphrase: Mutex<Vec<u8>>,
}

impl GrpcWallet {
    pub fn connect(config: &WalletConfig) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        let cert_pem = std::fs::read(config.cert_path())?;
        let tls = ClientTlsConfig::new().ca_certificate(Certificate::from_pem(cert_pem));
        let url = config.grpc.url.clone();
        let client = runtime.block_on(async move {
            let channel = Channel::from_shared(url)?.tls_config(tls)?.connect().await?;
            Ok::<_, anyhow::Error>(WalletServiceClient::new(channel))
        })?;
        let network = if config.testnet { NetworkKind::Test } else { NetworkKind::Main };
        Ok(GrpcWallet { runtime, client: Mutex::new(client), network, passphrase: Mutex::new(Vec::new()) })
    }

    pub(crate) fn client(&self) -> std::sync::MutexGuard<'_, WalletServiceClient<Channel>> {
        self.client.lock().expect("wallet client mutex poisoned")
    }

    pub(crate) fn block_on<F: std::future::Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }
}

impl WalletAdapter for GrpcWallet {
    fn ping(&self) -> anyhow::Result<()> {
        let mut client = self.client();
        self.runtime.block_on(client.ping(PingRequest {}))?;
        Ok(())
    }

    fn get_new_address(&self) -> anyhow::Result<Address> {
        next_address(self, NextAddressKind::Bip0044External).map(|(address, _pubkey)| address)
    }

    fn get_raw_change_address(&self) -> anyhow::Result<Address> {
        next_address(self, NextAddressKind::Bip0044Internal).map(|(address, _pubkey)| address)
    }

    fn relay_fee(&self) -> anyhow::Result<Amount> {
        // dcrd's default minimum relay fee, 1e4 atoms/kB; this trimmed
        // wallet-service surface doesn't expose `getnetworkinfo`.
        Ok(Amount::from_sat(10_000))
    }

    fn pay_tx_fee(&self) -> anyhow::Result<Amount> {
        Ok(Amount::ZERO)
    }

    fn estimate_smart_fee(&self, _conf_target: u32) -> anyhow::Result<Option<Amount>> {
        Ok(None)
    }

    fn fund_raw_transaction(&self, tx: &Transaction, fee_rate: Amount) -> anyhow::Result<Transaction> {
        let mut client = self.client();
        let non_change_outputs = tx
            .output
            .iter()
            .map(|out| crate::walletrpc::construct_transaction_request::NonChangeOutput {
                destination_script: out.script_pubkey.to_bytes(),
                amount: out.value.to_sat() as i64,
            })
            .collect();
        let request = ConstructTransactionRequest {
            source_account: 0,
            required_confirmations: 1,
            fee_per_kb: fee_rate.to_sat() as i64,
            non_change_outputs,
        };
        let response = self.runtime.block_on(client.construct_transaction(request))?.into_inner();
        Ok(bitcoin::consensus::deserialize(&response.unsigned_transaction)?)
    }

    fn dump_priv_key(&self, _address: &Address) -> anyhow::Result<PrivateKey> {
        Err(anyhow::anyhow!(
            "decred wallets sign server-side via CreateSignature; use dcr::spend instead of dump_priv_key"
        ))
    }

    fn send_raw_transaction(&self, tx: &Transaction) -> anyhow::Result<Txid> {
        let mut client = self.client();
        let request = PublishTransactionRequest { signed_transaction: bitcoin::consensus::serialize(tx) };
        let response = self.runtime.block_on(client.publish_transaction(request))?.into_inner();
        let bytes: [u8; 32] = response
            .transaction_hash
            .try_into()
            .map_err(|_| anyhow::anyhow!("wallet returned a malformed transaction hash"))?;
        Ok(Txid::from_byte_array(bytes))
    }

    fn get_transaction(&self, txid: &Txid) -> anyhow::Result<GetTxResult> {
        let mut client = self.client();
        let request = GetTransactionRequest { transaction_hash: txid.to_byte_array().to_vec() };
        let response = self.runtime.block_on(client.get_transaction(request))?.into_inner();
        let details = response.transaction.ok_or_else(|| anyhow::anyhow!("wallet returned no transaction details"))?;
        Ok(GetTxResult { tx: bitcoin::consensus::deserialize(&details.transaction)?, confirmations: response.confirmations as i64 })
    }

    fn wallet_passphrase(&self, passphrase: &str, _timeout_secs: u32) -> anyhow::Result<()> {
        *self.passphrase.lock().expect("passphrase mutex poisoned") = passphrase.as_bytes().to_vec();
        Ok(())
    }

    fn wallet_lock(&self) -> anyhow::Result<()> {
        self.passphrase.lock().expect("passphrase mutex poisoned").clear();
        Ok(())
    }

    fn network_kind(&self) -> NetworkKind {
        self.network
    }
}

pub(crate) fn next_address(wallet: &GrpcWallet, kind: NextAddressKind) -> anyhow::Result<(Address, Vec<u8>)> {
    let mut client = wallet.client();
    let request = NextAddressRequest { account: 0, kind: kind as i32, gap_policy: NextAddressGapPolicy::GapPolicyWrap as i32 };
    let response = wallet.runtime.block_on(client.next_address(request))?.into_inner();
    let address = response.address.parse::<Address<_>>()?.assume_checked();
    Ok((address, response.public_key))
}
