//! `WalletAdapter` over `litecoind`'s JSON-RPC wallet interface.
use atomicswap_core::wallet::{GetTxResult, WalletAdapter};
use bitcoin::{Address, Amount, Network, NetworkKind, PrivateKey, Transaction, Txid};
use bitcoincore_rpc::json::{AddressType, FundRawTransactionOptions};
use bitcoincore_rpc::{Auth, Client, RpcApi};
use serde_json::Value;

use crate::config::WalletConfig;

pub struct JsonRpcWallet {
    client: Client,
    network: Network,
}

impl JsonRpcWallet {
    pub fn connect(config: &WalletConfig) -> anyhow::Result<Self> {
        let auth = Auth::UserPass(config.rpc.username.clone(), config.rpc.password.clone());
        let client = Client::new(&config.rpc.url, auth)?;
        let network = if config.testnet { Network::Testnet } else { Network::Bitcoin };
        Ok(JsonRpcWallet { client, network })
    }
}

impl WalletAdapter for JsonRpcWallet {
    fn ping(&self) -> anyhow::Result<()> {
        self.client.get_block_count()?;
        Ok(())
    }

    fn get_new_address(&self) -> anyhow::Result<Address> {
        let address = self.client.get_new_address(None, Some(AddressType::Legacy))?;
        Ok(address.require_network(self.network)?)
    }

    fn get_raw_change_address(&self) -> anyhow::Result<Address> {
        let address = self.client.get_raw_change_address(Some(AddressType::Legacy))?;
        Ok(address.require_network(self.network)?)
    }

    fn relay_fee(&self) -> anyhow::Result<Amount> {
        Ok(self.client.get_network_info()?.relay_fee)
    }

    fn pay_tx_fee(&self) -> anyhow::Result<Amount> {
        Ok(self.client.get_wallet_info()?.pay_tx_fee)
    }

    fn estimate_smart_fee(&self, conf_target: u32) -> anyhow::Result<Option<Amount>> {
        let estimate = self.client.estimate_smart_fee(conf_target as u16, None)?;
        Ok(estimate.fee_rate)
    }

    fn fund_raw_transaction(&self, tx: &Transaction, fee_rate: Amount) -> anyhow::Result<Transaction> {
        let options = FundRawTransactionOptions {
            change_type: Some(AddressType::Legacy),
            fee_rate: Some(fee_rate),
            ..Default::default()
        };
        let funded = self.client.fund_raw_transaction(tx, Some(&options), None)?;
        Ok(funded.transaction()?)
    }

    fn dump_priv_key(&self, address: &Address) -> anyhow::Result<PrivateKey> {
        Ok(self.client.dump_private_key(address)?)
    }

    fn send_raw_transaction(&self, tx: &Transaction) -> anyhow::Result<Txid> {
        Ok(self.client.send_raw_transaction(tx)?)
    }

    fn get_transaction(&self, txid: &Txid) -> anyhow::Result<GetTxResult> {
        let info = self.client.get_transaction(txid, None)?;
        Ok(GetTxResult { tx: info.transaction()?, confirmations: info.info.confirmations })
    }

    fn wallet_passphrase(&self, passphrase: &str, timeout_secs: u32) -> anyhow::Result<()> {
        self.client.wallet_passphrase(passphrase, timeout_secs as u64)?;
        Ok(())
    }

    fn wallet_lock(&self) -> anyhow::Result<()> {
        self.client.wallet_lock()?;
        Ok(())
    }

    fn network_kind(&self) -> NetworkKind {
        self.network.into()
    }
}
