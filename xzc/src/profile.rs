use atomicswap_core::{ChainProfile, SighashScheme};

/// Zcoin chain profile. Zcoin is also a Bitcoin-protocol fork (the Zerocoin
/// and Sigma privacy features it's known for live in a separate
/// transaction type and don't touch the P2SH/HTLC path this engine uses),
/// so it shares the same template, sighash, and verifier as Litecoin. The
/// one chain-specific wrinkle is `dumpprivkey`'s one-time authorization
/// code prompt on wallets built with the disclosure warning enabled — see
/// `rpc_wallet::dump_priv_key_with_authorization`.
pub struct XzcProfile {
    testnet: bool,
}

impl XzcProfile {
    pub fn new(testnet: bool) -> Self {
        XzcProfile { testnet }
    }
}

impl ChainProfile for XzcProfile {
    fn name(&self) -> &'static str {
        "zcoin"
    }

    fn is_testnet(&self) -> bool {
        self.testnet
    }

    fn default_port(&self) -> u16 {
        if self.testnet { 18888 } else { 8888 }
    }

    fn tx_version(&self) -> i32 {
        1
    }

    fn sighash_scheme(&self) -> SighashScheme {
        SighashScheme::Legacy
    }

    fn requires_dumpprivkey_authorization(&self) -> bool {
        true
    }
}
