#![forbid(unsafe_code)]

//! Protocol adapters that drive coding-agent subprocesses through one
//! lifecycle and report their activity as one canonical event stream.

pub mod acp;
pub mod adapter;
pub mod config;
pub mod errors;
pub mod models;
pub mod normalize;
pub mod opencode;

pub use adapter::Adapter;
pub use config::AdapterConfig;
pub use errors::{AppError, Result};
