//! `WalletAdapter` over `zcoind`'s JSON-RPC wallet interface.
//!
//! The one wrinkle Zcoin adds over a stock Bitcoin-protocol wallet:
//! `dumpprivkey` on a build with the private-key-disclosure prompt enabled
//! always fails on the first call, embedding a one-time 4-character
//! authorization code in the error message; the call must be retried with
//! that code as a second parameter.
use atomicswap_core::wallet::{GetTxResult, WalletAdapter};
use bitcoin::{Address, Amount, Network, NetworkKind, PrivateKey, Transaction, Txid};
use bitcoincore_rpc::json::{AddressType, FundRawTransactionOptions};
use bitcoincore_rpc::{Auth, Client, RpcApi};
use serde_json::Value;

use crate::config::WalletConfig;

const AUTHORIZATION_MARKER: &str = "authorization code is: ";
const AUTHORIZATION_CODE_LEN: usize = 4;

pub struct JsonRpcWallet {
    client: Client,
    network: Network,
    requires_authorization: bool,
}

impl JsonRpcWallet {
    pub fn connect(config: &WalletConfig, requires_authorization: bool) -> anyhow::Result<Self> {
        let auth = Auth::UserPass(config.rpc.username.clone(), config.rpc.password.clone());
        let client = Client::new(&config.rpc.url, auth)?;
        let network = if config.testnet { Network::Testnet } else { Network::Bitcoin };
        Ok(JsonRpcWallet { client, network, requires_authorization })
    }

    /// `dumpprivkey` without the authorization dance, for wallets built
    /// without the disclosure prompt.
    fn dump_priv_key_direct(&self, address: &Address) -> anyhow::Result<PrivateKey> {
        Ok(self.client.dump_private_key(address)?)
    }

    /// `dumpprivkey` against a wallet that always rejects the first call
    /// and embeds a retry code in the error text.
    fn dump_priv_key_with_authorization(&self, address: &Address) -> anyhow::Result<PrivateKey> {
        let addr = address.to_string();
        let first: Result<String, bitcoincore_rpc::Error> =
            self.client.call("dumpprivkey", &[Value::String(addr.clone())]);

        let wif = match first {
            Ok(wif) => wif,
            Err(err) => {
                let message = err.to_string();
                let Some(pos) = message.find(AUTHORIZATION_MARKER) else {
                    return Err(err.into());
                };
                let code_start = pos + AUTHORIZATION_MARKER.len();
                let code: String = message[code_start..].chars().take(AUTHORIZATION_CODE_LEN).collect();
                self.client.call("dumpprivkey", &[Value::String(addr), Value::String(code)])?
            }
        };
        Ok(PrivateKey::from_wif(&wif)?)
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
        if self.requires_authorization {
            self.dump_priv_key_with_authorization(address)
        } else {
            self.dump_priv_key_direct(address)
        }
    }

    fn send_raw_transaction(&self, tx: &Transaction) -> anyhow::Result<Txid> {
        Ok(self.client.send_raw_transaction(tx)?)
    }

    fn get_transaction(&self, txid: &Txid) -> anyhow::Result<GetTxResult> {
        let info = self.client.get_transaction(txid, None)?;
        Ok(GetTxResult { tx: info.transaction()?, confirmations: info.info.confirmations as i64 })
    }

    fn wallet_passphrase(&self, passphrase: &str, timeout_secs: u32) -> anyhow::Result<()> {
        let _: Value = self
            .client
            .call("walletpassphrase", &[Value::String(passphrase.to_string()), Value::from(timeout_secs)])?;
        Ok(())
    }

    fn wallet_lock(&self) -> anyhow::Result<()> {
        let _: Value = self.client.call("walletlock", &[])?;
        Ok(())
    }

    fn network_kind(&self) -> NetworkKind {
        self.network.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_a_four_character_authorization_code() {
        let message = "error: wallet locked; authorization code is: Ab3F please retry";
        let pos = message.find(AUTHORIZATION_MARKER).unwrap();
        let code_start = pos + AUTHORIZATION_MARKER.len();
        let code: String = message[code_start..].chars().take(AUTHORIZATION_CODE_LEN).collect();
        assert_eq!(code, "Ab3F");
    }
}
