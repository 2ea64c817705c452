//! Per-chain constants and capability set (component C1).
//!
//! A [`ChainProfile`] is the handle the rest of the engine is generic over:
//! network selection, default wallet port, transaction version, the
//! sighash scheme used when spending an HTLC output, and the dust-relay
//! floor used by [`crate::fee`]. Selection is by `(chain, testnet)` and the
//! resulting profile is immutable for the lifetime of an operation.

/// Which sighash rules apply when signing an HTLC spend. None of the three
/// chains this engine supports spend the HTLC output itself via a SegWit
/// witness program (the contract is always a legacy P2SH script), so in
/// practice every profile selects `Legacy`/`Decred`; the enum exists so a
/// future chain profile (e.g. a genuinely SegWit-native HTLC) has somewhere
/// to plug in without touching the spender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SighashScheme {
    /// Pre-SegWit legacy sighash (`SIGHASH_ALL` over the whole transaction
    /// with the spent script substituted into the input being signed).
    Legacy,
    /// Decred's sighash, which additionally commits to each input's
    /// `valueIn` and the transaction's `expiry`/`tree` fields.
    Decred,
}

/// Per-chain constants selected once per operation.
pub trait ChainProfile {
    /// Human-readable chain name, used in log lines and CLI `--version` output.
    fn name(&self) -> &'static str;

    /// `bitcoin::Network`-style mainnet/testnet selector. LTC and XZC both
    /// ride on `bitcoin::Network` (their address/script grammar is a direct
    /// fork of Bitcoin's); DCR carries its own two-variant selector.
    fn is_testnet(&self) -> bool;

    /// Default wallet RPC port for this chain and network.
    fn default_port(&self) -> u16;

    /// Minimum transaction version this chain's nodes will relay.
    fn tx_version(&self) -> i32;

    /// Sighash scheme used when spending the HTLC output.
    fn sighash_scheme(&self) -> SighashScheme;

    /// Does `dumpprivkey` require the Zcoin-style one-time authorization
    /// code dance (see `JsonRpcWallet::dump_priv_key` in the `xzc` crate)?
    /// False for every chain except XZC built with the disclosure prompt.
    fn requires_dumpprivkey_authorization(&self) -> bool {
        false
    }
}
