#![cfg_attr(docsrs, feature(doc_auto_cfg))]
//! # Voidrunner Server
//!
//! Authoritative multiplayer server for a top-down shoot-'em-up. A reliable
//! (TCP) channel handles matchmaking — naming, room creation, joining,
//! readiness — and hands completed rooms off to a dedicated datagram (UDP)
//! channel that runs the fixed-step authoritative simulation.
//!
//! ## Layout
//!
//! - [`config`] — process configuration, defaults plus an optional TOML file
//! - [`protocol`] — the wire codec shared by both channels
//! - [`transport`] — the reliable and datagram network transports
//! - [`lobby`] — the matchmaking session manager
//! - [`dispatcher`] — the reliable-channel protocol state machine
//! - [`simulation`] — the authoritative fixed-step game simulation
//! - [`bridge`] — hands a ready room off to a simulation instance
//! - [`event`] — broadcast events raised by the dispatcher
//! - [`shutdown`] — process-wide cancellation
//! - [`error`] / [`error_codes`] — error types shared across the crate

pub mod bridge;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod error_codes;
pub mod event;
pub mod lobby;
pub mod protocol;
pub mod shutdown;
pub mod simulation;
pub mod transport;

pub use config::AppConfig;
pub use error::{ServerError, Result};
pub use error_codes::ErrorCode;
