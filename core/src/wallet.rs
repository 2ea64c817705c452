//! Wallet adapter trait (component C4).
//!
//! [`WalletAdapter`] is the seam between the chain-agnostic engine in
//! [`crate::ops`] and each chain's wallet RPC surface. LTC and XZC
//! implement it over `bitcoincore-rpc`'s blocking JSON-RPC client; DCR
//! implements it over a blocking wrapper around `dcrwallet`'s gRPC
//! `WalletService`. Every method is synchronous, matching the RPC style of
//! the original client this engine's wallet calls are grounded on (and
//! `bitcoincore-rpc::Client` itself) rather than forcing every call site to
//! be async for the one chain that happens to speak gRPC.
use bitcoin::{Address, Amount, NetworkKind, PrivateKey, Transaction, Txid};

/// Result of a `gettransaction`-style lookup: the transaction itself plus
/// how deep it's buried, if at all.
#[derive(Debug, Clone)]
pub struct GetTxResult {
    pub tx: Transaction,
    pub confirmations: i64,
}

/// The wallet-RPC operations every chain adapter must expose. Mirrors the
/// calls `rpc.go` makes against each chain's wallet node: `getnewaddress`,
/// `getrawchangeaddress`, `getnetworkinfo`/`getwalletinfo`/
/// `estimatesmartfee` (fee discovery), `fundrawtransaction`, `dumpprivkey`,
/// `sendrawtransaction`, `gettransaction`, `walletpassphrase`/`walletlock`,
/// and a liveness ping.
pub trait WalletAdapter {
    /// Confirms the wallet RPC is reachable and authenticated (`getblockcount`
    /// for LTC/XZC, `Ping` for DCR).
    fn ping(&self) -> anyhow::Result<()>;

    /// A new receiving address, legacy (P2PKH) encoding.
    fn get_new_address(&self) -> anyhow::Result<Address>;

    /// A new change address, legacy (P2PKH) encoding.
    fn get_raw_change_address(&self) -> anyhow::Result<Address>;

    /// The node's minimum relay fee rate, in sat/kvB.
    fn relay_fee(&self) -> anyhow::Result<Amount>;

    /// The wallet's configured `paytxfee`, zero if unset.
    fn pay_tx_fee(&self) -> anyhow::Result<Amount>;

    /// `estimatesmartfee` for the given confirmation target; `None` if the
    /// node has insufficient data to estimate.
    fn estimate_smart_fee(&self, conf_target: u32) -> anyhow::Result<Option<Amount>>;

    /// Funds `tx` at `fee_rate` (sat/kvB), returning the selected-inputs,
    /// change-added transaction. Both LTC/XZC's `fundrawtransaction` and
    /// DCR's `ConstructTransaction` are invoked with the legacy/non-mixed
    /// change-address policy this engine requires.
    fn fund_raw_transaction(&self, tx: &Transaction, fee_rate: Amount) -> anyhow::Result<Transaction>;

    /// The private key controlling `address`, requiring the wallet be
    /// unlocked first via [`WalletSession::unlock`].
    fn dump_priv_key(&self, address: &Address) -> anyhow::Result<PrivateKey>;

    /// Broadcasts `tx`, returning its txid.
    fn send_raw_transaction(&self, tx: &Transaction) -> anyhow::Result<Txid>;

    /// Looks up a previously broadcast (or foreign) transaction by id.
    fn get_transaction(&self, txid: &Txid) -> anyhow::Result<GetTxResult>;

    /// Temporarily unlocks the wallet's private keys for `timeout_secs`.
    fn wallet_passphrase(&self, passphrase: &str, timeout_secs: u32) -> anyhow::Result<()>;

    /// Re-locks the wallet immediately, undoing `wallet_passphrase`.
    fn wallet_lock(&self) -> anyhow::Result<()>;

    /// The network this wallet is configured for, used to validate
    /// counterparty addresses before they're embedded in a contract.
    fn network_kind(&self) -> NetworkKind;
}

/// RAII guard around `walletpassphrase`/`walletlock`. Unlocking is a no-op
/// when `passphrase` is empty (an unencrypted wallet), matching
/// `walletUnlock`/`walletLock`'s no-op behavior in the original client.
/// Re-locks on drop so a panic or early return during a redeem/refund still
/// leaves the wallet locked afterward.
pub struct WalletSession<'a> {
    wallet: &'a dyn WalletAdapter,
    locked_on_drop: bool,
}

impl<'a> WalletSession<'a> {
    pub fn unlock(wallet: &'a dyn WalletAdapter, passphrase: &str, timeout_secs: u32) -> anyhow::Result<Self> {
        if passphrase.is_empty() {
            return Ok(WalletSession { wallet, locked_on_drop: false });
        }
        wallet.wallet_passphrase(passphrase, timeout_secs)?;
        Ok(WalletSession { wallet, locked_on_drop: true })
    }
}

impl<'a> Drop for WalletSession<'a> {
    fn drop(&mut self) {
        if self.locked_on_drop {
            if let Err(err) = self.wallet.wallet_lock() {
                tracing::warn!(error = %err, "failed to re-lock wallet after use");
            }
        }
    }
}

#[cfg(test)]
pub mod fake {
    //! An in-memory [`WalletAdapter`] for engine tests. No real wallet is
    //! available in this environment, so every chain crate's test suite
    //! drives [`crate::ops::Engine`] against this instead of a live node.
    use super::*;
    use bitcoin::secp256k1::{Secp256k1, SecretKey};
    use bitcoin::CompressedPublicKey;
    use rand::rngs::OsRng;
    use std::cell::RefCell;
    use std::collections::HashMap;

    pub struct FakeWallet {
        pub network: NetworkKind,
        pub relay_fee: Amount,
        pub pay_tx_fee: Amount,
        pub smart_fee: Option<Amount>,
        pub keys: RefCell<HashMap<Address, PrivateKey>>,
        pub locked: RefCell<bool>,
        pub broadcast: RefCell<Vec<Transaction>>,
        pub confirmations: RefCell<HashMap<Txid, i64>>,
    }

    impl FakeWallet {
        pub fn new(network: NetworkKind) -> Self {
            FakeWallet {
                network,
                relay_fee: Amount::from_sat(1_000),
                pay_tx_fee: Amount::ZERO,
                smart_fee: Some(Amount::from_sat(2_000)),
                keys: RefCell::new(HashMap::new()),
                locked: RefCell::new(true),
                broadcast: RefCell::new(Vec::new()),
                confirmations: RefCell::new(HashMap::new()),
            }
        }

        pub fn fresh_address(&self) -> (Address, PrivateKey) {
            let secp = Secp256k1::new();
            let secret_key = SecretKey::new(&mut OsRng);
            let privkey = PrivateKey::new(secret_key, self.network);
            let pubkey = CompressedPublicKey::from_private_key(&secp, &privkey).expect("compressed key");
            let address = Address::p2pkh(pubkey, self.network);
            self.keys.borrow_mut().insert(address.clone(), privkey);
            (address, privkey)
        }
    }

    impl WalletAdapter for FakeWallet {
        fn ping(&self) -> anyhow::Result<()> {
            Ok(())
        }

        fn get_new_address(&self) -> anyhow::Result<Address> {
            Ok(self.fresh_address().0)
        }

        fn get_raw_change_address(&self) -> anyhow::Result<Address> {
            Ok(self.fresh_address().0)
        }

        fn relay_fee(&self) -> anyhow::Result<Amount> {
            Ok(self.relay_fee)
        }

        fn pay_tx_fee(&self) -> anyhow::Result<Amount> {
            Ok(self.pay_tx_fee)
        }

        fn estimate_smart_fee(&self, _conf_target: u32) -> anyhow::Result<Option<Amount>> {
            Ok(self.smart_fee)
        }

        fn fund_raw_transaction(&self, tx: &Transaction, _fee_rate: Amount) -> anyhow::Result<Transaction> {
            // Tests construct already-funded transactions; this just hands
            // the transaction back unchanged.
            Ok(tx.clone())
        }

        fn dump_priv_key(&self, address: &Address) -> anyhow::Result<PrivateKey> {
            if !*self.locked.borrow() {
                self.keys
                    .borrow()
                    .get(address)
                    .copied()
                    .ok_or_else(|| anyhow::anyhow!("no such address"))
            } else {
                Err(anyhow::anyhow!("wallet locked"))
            }
        }

        fn send_raw_transaction(&self, tx: &Transaction) -> anyhow::Result<Txid> {
            let txid = tx.compute_txid();
            self.confirmations.borrow_mut().insert(txid, 0);
            self.broadcast.borrow_mut().push(tx.clone());
            Ok(txid)
        }

        fn get_transaction(&self, txid: &Txid) -> anyhow::Result<GetTxResult> {
            let broadcast = self.broadcast.borrow();
            let tx = broadcast
                .iter()
                .find(|tx| &tx.compute_txid() == txid)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("unknown txid"))?;
            let confirmations = *self.confirmations.borrow().get(txid).unwrap_or(&0);
            Ok(GetTxResult { tx, confirmations })
        }

        fn wallet_passphrase(&self, _passphrase: &str, _timeout_secs: u32) -> anyhow::Result<()> {
            *self.locked.borrow_mut() = false;
            Ok(())
        }

        fn wallet_lock(&self) -> anyhow::Result<()> {
            *self.locked.borrow_mut() = true;
            Ok(())
        }

        fn network_kind(&self) -> NetworkKind {
            self.network
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeWallet;
    use super::*;

    #[test]
    fn unlock_noop_with_empty_passphrase_leaves_wallet_locked() {
        let wallet = FakeWallet::new(NetworkKind::Test);
        {
            let _session = WalletSession::unlock(&wallet, "", 0).unwrap();
            assert!(wallet.dump_priv_key(&wallet.fresh_address().0).is_err());
        }
    }

    #[test]
    fn unlock_then_drop_relocks() {
        let wallet = FakeWallet::new(NetworkKind::Test);
        let (address, key) = wallet.fresh_address();
        {
            let _session = WalletSession::unlock(&wallet, "hunter2", 60).unwrap();
            assert_eq!(wallet.dump_priv_key(&address).unwrap(), key);
        }
        assert!(wallet.dump_priv_key(&address).is_err());
    }
}
