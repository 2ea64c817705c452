use atomicswap_core::{ChainProfile, SighashScheme};

/// Litecoin chain profile. Litecoin is a direct fork of Bitcoin's consensus
/// rules and script grammar, so the HTLC template, legacy sighash, and
/// script interpreter in `atomicswap-core` apply unmodified; only the
/// default wallet port differs between mainnet and testnet.
pub struct LtcProfile {
    testnet: bool,
}

impl LtcProfile {
    pub fn new(testnet: bool) -> Self {
        LtcProfile { testnet }
    }
}

impl ChainProfile for LtcProfile {
    fn name(&self) -> &'static str {
        "litecoin"
    }

    fn is_testnet(&self) -> bool {
        self.testnet
    }

    fn default_port(&self) -> u16 {
        if self.testnet { 19332 } else { 9332 }
    }

    fn tx_version(&self) -> i32 {
        2
    }

    fn sighash_scheme(&self) -> SighashScheme {
        SighashScheme::Legacy
    }
}
