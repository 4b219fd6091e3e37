//! Bounded, non-blocking event output.

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::models::event::AgentEvent;

/// Sending half of an adapter's `updates` channel.
///
/// Producers never block: a full channel drops the event with a warning,
/// favouring adapter liveness over completeness under burst load. Once
/// [`close`](Self::close) has run, further emits are discarded quietly
/// instead of racing a closed channel.
#[derive(Debug)]
pub struct EventSink {
    tx: Option<mpsc::Sender<AgentEvent>>,
}

impl EventSink {
    /// Create a sink and its receiver with room for `capacity` events.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<AgentEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx: Some(tx) }, rx)
    }

    /// Queue `event`. Returns `false` when it was dropped.
    pub fn emit(&self, event: AgentEvent) -> bool {
        let Some(tx) = &self.tx else {
            debug!(
                event_type = ?event.event_type,
                session_id = event.session_id.as_str(),
                "event sink closed, discarding event"
            );
            return false;
        };

        match tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(
                    event_type = ?event.event_type,
                    session_id = event.session_id.as_str(),
                    "updates channel full, dropping event"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                debug!(
                    event_type = ?event.event_type,
                    session_id = event.session_id.as_str(),
                    "updates receiver dropped, discarding event"
                );
                false
            }
        }
    }

    /// Close the channel. Returns `true` only on the first call.
    pub fn close(&mut self) -> bool {
        self.tx.take().is_some()
    }

    /// Whether [`close`](Self::close) has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_none()
    }
}
