//! Chain-agnostic HTLC atomic-swap engine.
//!
//! This crate implements the eight components shared by every supported
//! chain (LTC, XZC, DCR): chain profile (C1), script codec (C2), size
//! estimator (C3), wallet adapter trait (C4), fee policy (C5), contract
//! builder (C6), spender (C7), and the operations façade (C8). Each chain
//! crate supplies a [`chain::ChainProfile`] and a [`wallet::WalletAdapter`]
//! and gets the rest for free.
pub mod chain;
pub mod contract;
pub mod error;
pub mod fee;
pub mod ops;
pub mod script;
pub mod secret;
pub mod size;
pub mod spend;
pub mod verify;
pub mod wallet;

pub use chain::{ChainProfile, SighashScheme};
pub use error::{EngineError, Result};
pub use ops::Engine;
pub use tokio_util::sync::CancellationToken;
pub use wallet::WalletAdapter;
