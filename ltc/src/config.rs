//! Wallet RPC configuration, loaded from a TOML file (spec §11).
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Connection details for `litecoin-cli`'s wallet RPC, and the operator's
/// wallet passphrase if the wallet is encrypted.
#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    pub rpc: RpcConfig,
    #[serde(default)]
    pub wallet_passphrase: String,
    #[serde(default)]
    pub testnet: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    pub url: String,
    pub username: String,
    pub password: String,
}

impl WalletConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading wallet config at {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parsing wallet config at {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_config() {
        let toml = r#"
            testnet = true

            [rpc]
            url = "http://127.0.0.1:19332"
            username = "user"
            password = "pass"
        "#;
        let config: WalletConfig = toml::from_str(toml).unwrap();
        assert!(config.testnet);
        assert_eq!(config.wallet_passphrase, "");
        assert_eq!(config.rpc.url, "http://127.0.0.1:19332");
    }

    #[test]
    fn parses_an_encrypted_wallet_config() {
        let toml = r#"
            wallet_passphrase = "hunter2"

            [rpc]
            url = "http://127.0.0.1:9332"
            username = "user"
            password = "pass"
        "#;
        let config: WalletConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.wallet_passphrase, "hunter2");
        assert!(!config.testnet);
    }
}
