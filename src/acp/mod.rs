//! Agent Client Protocol (ACP) adapter.
//!
//! ACP is JSON-RPC 2.0 framed as newline-delimited JSON over the agent's
//! stdio. The client sends `initialize`, `session/new`, `session/load` and
//! `session/prompt` requests; the agent streams `session/update`
//! notifications and asks for consent through `session/request_permission`.
//!
//! - [`codec`]: NDJSON line framing with a 1 MiB line limit.
//! - [`protocol`]: wire types.
//! - [`transport`]: reader, writer and FIFO dispatcher tasks.
//! - [`adapter`]: [`AcpAdapter`], the [`Adapter`](crate::Adapter) implementation.

pub mod adapter;
pub mod codec;
pub mod protocol;
pub mod transport;

pub use adapter::AcpAdapter;
