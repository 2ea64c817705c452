//! Wallet gRPC configuration, loaded from a TOML file (spec §11).
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    pub grpc: GrpcConfig,
    #[serde(default)]
    pub wallet_passphrase: String,
    #[serde(default)]
    pub testnet: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GrpcConfig {
    pub url: String,
    /// Path to `dcrwallet`'s `rpc.cert`. Defaults to the dcrwallet
    /// app-data directory's `rpc.cert` if unset, matching the original
    /// client's `-c`-less default.
    pub cert_path: Option<PathBuf>,
}

impl WalletConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading wallet config at {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parsing wallet config at {}", path.display()))
    }

    pub fn cert_path(&self) -> PathBuf {
        self.grpc.cert_path.clone().unwrap_or_else(default_cert_path)
    }
}

/// `dcrwallet`'s default TLS certificate location: `<app-data>/rpc.cert`.
fn default_cert_path() -> PathBuf {
    let base = dirs_app_data();
    base.join("dcrwallet").join("rpc.cert")
}

#[cfg(target_os = "windows")]
fn dirs_app_data() -> PathBuf {
    std::env::var_os("LOCALAPPDATA").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(target_os = "macos")]
fn dirs_app_data() -> PathBuf {
    std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join("Library").join("Application Support"))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn dirs_app_data() -> PathBuf {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")).unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_config() {
        let toml = r#"
            [grpc]
            url = "https://127.0.0.1:19111"
        "#;
        let config: WalletConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.grpc.url, "https://127.0.0.1:19111");
        assert!(config.grpc.cert_path.is_none());
    }

    #[test]
    fn explicit_cert_path_overrides_the_default() {
        let toml = r#"
            [grpc]
            url = "https://127.0.0.1:9111"
            cert_path = "/etc/dcrwallet/rpc.cert"
        "#;
        let config: WalletConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.cert_path(), PathBuf::from("/etc/dcrwallet/rpc.cert"));
    }
}
