//! Error taxonomy for the atomic-swap HTLC engine.
//!
//! Every public operation in [`crate::ops`] returns [`EngineError`]. Leaf
//! I/O (wallet RPC transport) comes back as `anyhow::Error` and is folded
//! into [`EngineError::WalletRPC`] or [`EngineError::WalletUnavailable`] at
//! the operation boundary so callers get a stable, matchable error kind
//! instead of an opaque error chain.
use std::fmt;

#[derive(Debug)]
pub enum EngineError {
    /// hex, amount, or address failed to decode
    InputDecode(String),
    /// address parses but is for the other network
    WrongNetwork(String),
    /// address is not a P2PKH address
    NotP2PKH(String),
    /// wrong length or bad hex for a secret
    BadSecret(String),
    /// redeem-script does not match the HTLC template
    UnrecognizedScript(ScriptError),
    /// funding tx lacks the expected P2SH output
    NoContractOutput,
    /// computed redeem/refund amount is dust
    DustOutput(u64),
    /// self-verification of the spend tx failed
    ScriptInvalid(String),
    /// RPC transport failed, auth rejected, wallet locked
    WalletUnavailable(String),
    /// wallet returned an RPC-level error, passed through
    WalletRPC(String),
    /// context cancellation / deadline
    Cancelled,
    /// extractSecret found no push matching the expected hash
    NotFound,
}

#[derive(Debug)]
pub enum ScriptError {
    BadOpcode { expected: &'static str, index: usize },
    BadPushLength { expected: usize, got: usize },
    BadSecretSize(i64),
    Truncated,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InputDecode(msg) => write!(f, "input decode: {msg}"),
            EngineError::WrongNetwork(msg) => write!(f, "wrong network: {msg}"),
            EngineError::NotP2PKH(msg) => write!(f, "not a P2PKH address: {msg}"),
            EngineError::BadSecret(msg) => write!(f, "bad secret: {msg}"),
            EngineError::UnrecognizedScript(err) => write!(f, "unrecognized script: {err}"),
            EngineError::NoContractOutput => {
                write!(f, "transaction does not contain the contract output")
            }
            EngineError::DustOutput(value) => write!(f, "output value of {value} is dust"),
            EngineError::ScriptInvalid(msg) => write!(f, "script invalid: {msg}"),
            EngineError::WalletUnavailable(msg) => write!(f, "wallet unavailable: {msg}"),
            EngineError::WalletRPC(msg) => write!(f, "wallet RPC error: {msg}"),
            EngineError::Cancelled => write!(f, "operation cancelled"),
            EngineError::NotFound => write!(f, "transaction does not contain the secret"),
        }
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::BadOpcode { expected, index } => {
                write!(f, "expected {expected} at instruction {index}")
            }
            ScriptError::BadPushLength { expected, got } => {
                write!(f, "expected a {expected}-byte push, got {got}")
            }
            ScriptError::BadSecretSize(size) => write!(f, "contract specifies strange secret size {size}"),
            ScriptError::Truncated => write!(f, "script ended before the template did"),
        }
    }
}

impl std::error::Error for EngineError {}
impl std::error::Error for ScriptError {}

impl From<ScriptError> for EngineError {
    fn from(err: ScriptError) -> Self {
        EngineError::UnrecognizedScript(err)
    }
}

/// Wraps a leaf `anyhow::Error` from the wallet transport. Transport
/// failures (connection refused, auth rejected, wallet locked) are
/// `WalletUnavailable`; everything the wallet's RPC layer itself rejected
/// with an error response is `WalletRPC`. The wallet adapter impls decide
/// which bucket a given failure belongs in; this helper covers the common
/// "couldn't even reach the wallet" case.
pub fn wallet_unavailable(err: anyhow::Error) -> EngineError {
    EngineError::WalletUnavailable(err.to_string())
}

pub fn wallet_rpc(err: anyhow::Error) -> EngineError {
    EngineError::WalletRPC(err.to_string())
}

/// Type alias for results returned by engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
