//! JSON-RPC 2.0 connection over an agent's stdio.
//!
//! Three tasks serve one connection:
//!
//! - **writer**: drains an outbound queue into a [`FramedWrite`] over stdin.
//! - **reader**: decodes NDJSON lines from stdout and hands each parsed
//!   message to the dispatch queue without inspecting it further.
//! - **dispatcher**: pops one message at a time, in wire order, and resolves
//!   responses or calls the [`InboundHandler`] before touching the next.
//!
//! Every inbound message passes through the single dispatcher, so handlers
//! observe notifications in exactly the order the agent wrote them, and a
//! request's response is never observed before notifications the agent
//! sent ahead of it. Handlers must therefore not block; long-running work
//! (a permission prompt, say) is spawned and answered through a
//! [`Responder`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::codec::AcpCodec;
use super::protocol::{
    notification_message, request_message, response_message, Incoming, RpcError,
};
use crate::adapter::{BoxedReader, BoxedWriter};
use crate::{AppError, Result};

type RpcResult = std::result::Result<Value, RpcError>;
type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<RpcResult>>>>;

/// Receiver of agent-initiated traffic.
pub trait InboundHandler: Send + Sync + 'static {
    /// A notification, delivered in wire order.
    fn on_notification(&self, method: &str, params: Value);

    /// A request; answer it through `responder`, now or later.
    fn on_request(&self, method: &str, params: Value, responder: Responder);

    /// The agent closed its stdout or the stream failed.
    fn on_disconnect(&self);
}

/// One-shot reply handle for an agent request.
#[derive(Debug)]
pub struct Responder {
    id: Value,
    outbound: mpsc::UnboundedSender<Value>,
}

impl Responder {
    /// Id of the request being answered.
    #[must_use]
    pub fn id(&self) -> &Value {
        &self.id
    }

    /// Send the result (or error) back to the agent.
    pub fn respond(self, result: RpcResult) {
        if self
            .outbound
            .send(response_message(self.id, result))
            .is_err()
        {
            debug!("connection closed before response could be sent");
        }
    }
}

/// Removes an abandoned request from the pending map when its future is
/// dropped before the response arrives.
struct PendingGuard {
    id: u64,
    pending: PendingMap,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

/// Client end of a JSON-RPC stdio connection.
#[derive(Debug)]
pub struct Connection {
    outbound: mpsc::UnboundedSender<Value>,
    pending: PendingMap,
    next_id: AtomicU64,
    cancel: CancellationToken,
}

impl Connection {
    /// Start the reader, writer and dispatcher tasks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<H: InboundHandler>(
        stdin: BoxedWriter,
        stdout: BoxedReader,
        handler: Arc<H>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_writer(stdin, outbound_rx, cancel.clone()));
        tokio::spawn(run_reader(stdout, inbound_tx, cancel.clone()));
        tokio::spawn(run_dispatcher(
            inbound_rx,
            Arc::clone(&pending),
            handler,
            outbound_tx.clone(),
            cancel.clone(),
        ));

        Self {
            outbound: outbound_tx,
            pending,
            next_id: AtomicU64::new(1),
            cancel,
        }
    }

    /// Send a request and wait for its response.
    ///
    /// # Errors
    ///
    /// - [`AppError::Rpc`] when the agent answers with an error object.
    /// - [`AppError::Closed`] when the connection ends first.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value> {
        if self.cancel.is_cancelled() {
            return Err(AppError::Closed);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, tx);
        let _guard = PendingGuard {
            id,
            pending: Arc::clone(&self.pending),
        };

        debug!(id, method, "sending request");
        self.outbound
            .send(request_message(id, method, params))
            .map_err(|_| AppError::Closed)?;

        match rx.await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(error)) => Err(AppError::Rpc {
                code: error.code,
                message: error.message,
            }),
            Err(_) => Err(AppError::Closed),
        }
    }

    /// Send a notification.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Closed`] when the writer has stopped.
    pub fn notify(&self, method: &str, params: Value) -> Result<()> {
        debug!(method, "sending notification");
        self.outbound
            .send(notification_message(method, params))
            .map_err(|_| AppError::Closed)
    }

    /// Stop all tasks and fail outstanding requests. Idempotent.
    pub fn close(&self) {
        self.cancel.cancel();
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Whether [`close`](Self::close) ran or the stream ended.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_writer(
    stdin: BoxedWriter,
    mut outbound_rx: mpsc::UnboundedReceiver<Value>,
    cancel: CancellationToken,
) {
    let mut framed = FramedWrite::new(stdin, AcpCodec::new());

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!("acp writer: cancellation received, stopping");
                break;
            }

            msg = outbound_rx.recv() => {
                let Some(msg) = msg else {
                    debug!("acp writer: outbound queue closed, stopping");
                    break;
                };
                if let Err(e) = framed.send(msg).await {
                    warn!(error = %e, "acp writer: write to agent stdin failed, stopping");
                    cancel.cancel();
                    break;
                }
            }
        }
    }

    // Dropping the sink closes the agent's stdin.
    if let Err(e) = framed.close().await {
        debug!(error = %e, "acp writer: closing stdin failed");
    }
}

async fn run_reader(
    stdout: BoxedReader,
    inbound_tx: mpsc::UnboundedSender<Value>,
    cancel: CancellationToken,
) {
    let mut framed = FramedRead::new(stdout, AcpCodec::new());

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!("acp reader: cancellation received, stopping");
                break;
            }

            item = framed.next() => {
                match item {
                    None => {
                        debug!("acp reader: EOF");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "acp reader: stream error, stopping");
                        break;
                    }
                    Some(Ok(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<Value>(&line) {
                            Ok(value) => {
                                if inbound_tx.send(value).is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!(error = %e, "acp reader: malformed json line, skipping");
                            }
                        }
                    }
                }
            }
        }
    }
}

async fn run_dispatcher<H: InboundHandler>(
    mut inbound_rx: mpsc::UnboundedReceiver<Value>,
    pending: PendingMap,
    handler: Arc<H>,
    outbound: mpsc::UnboundedSender<Value>,
    cancel: CancellationToken,
) {
    loop {
        let msg = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            msg = inbound_rx.recv() => msg,
        };
        let Some(msg) = msg else { break };

        match Incoming::classify(msg) {
            Some(Incoming::Response { id, result }) => {
                let waiter = pending
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&id);
                match waiter {
                    // The caller may have stopped waiting; nothing to do then.
                    Some(tx) => {
                        let _ = tx.send(result);
                    }
                    None => debug!(id, "acp dispatcher: response for unknown request id"),
                }
            }
            Some(Incoming::Notification { method, params }) => {
                handler.on_notification(&method, params);
            }
            Some(Incoming::Request { id, method, params }) => {
                let responder = Responder {
                    id,
                    outbound: outbound.clone(),
                };
                handler.on_request(&method, params, responder);
            }
            None => debug!("acp dispatcher: ignoring non json-rpc message"),
        }
    }

    cancel.cancel();
    pending
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();
    handler.on_disconnect();
}
