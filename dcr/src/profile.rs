use atomicswap_core::{ChainProfile, SighashScheme};

/// Decred chain profile. Decred's script opcodes for the HTLC template are
/// byte-identical to Bitcoin's, so `atomicswap-core`'s script codec and
/// size estimator apply unmodified; its transaction format (expiry, tree,
/// valueIn/blockHeight/blockIndex fields) and sighash algorithm are its
/// own, which is why signing and publishing for this chain go through
/// `grpc_wallet`/`spend` instead of `atomicswap_core::spend`.
pub struct DcrProfile {
    testnet: bool,
}

impl DcrProfile {
    pub fn new(testnet: bool) -> Self {
        DcrProfile { testnet }
    }
}

impl ChainProfile for DcrProfile {
    fn name(&self) -> &'static str {
        "decred"
    }

    fn is_testnet(&self) -> bool {
        self.testnet
    }

    fn default_port(&self) -> u16 {
        if self.testnet { 19111 } else { 9111 }
    }

    fn tx_version(&self) -> i32 {
        1
    }

    fn sighash_scheme(&self) -> SighashScheme {
        SighashScheme::Decred
    }
}
