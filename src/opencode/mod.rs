//! OpenCode adapter: REST + Server-Sent-Events.
//!
//! - [`discovery`]: listening-URL scan over the server's stdout.
//! - [`client`]: typed REST calls.
//! - [`sse`]: SSE frame decoding.
//! - [`events`]: `{type, properties}` envelope types.
//! - [`text`]: cumulative/delta text reconciliation.
//! - [`adapter`]: [`OpenCodeAdapter`], the [`Adapter`](crate::Adapter) implementation.

pub mod adapter;
pub mod client;
pub mod discovery;
pub mod events;
pub mod sse;
pub mod text;

pub use adapter::OpenCodeAdapter;
