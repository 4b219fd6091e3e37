//! Endpoint discovery from the server's stdout.
//!
//! `opencode serve` prints `opencode server listening on http://…` once it
//! is ready. [`discover_url`] scans stdout for that line within a bounded
//! window, keeping the most recent lines for diagnostics, then hands the
//! pipe to a background task that keeps draining it so the child never
//! blocks on a full pipe buffer.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, info};

use crate::{AppError, Result};

/// Marker preceding the URL on the readiness line.
pub const LISTENING_MARKER: &str = "listening on";

/// Ring buffer of the most recent stdout lines, shared with the drain task.
#[derive(Debug, Clone)]
pub struct StdoutTail {
    lines: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl StdoutTail {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&self, line: String) {
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// Copy of the retained lines, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

/// Extract the URL from a readiness line, if `line` is one.
#[must_use]
pub fn parse_listening_url(line: &str) -> Option<String> {
    let (_, rest) = line.split_once(LISTENING_MARKER)?;
    let url = rest
        .split_whitespace()
        .next()?
        .trim_end_matches(|c: char| matches!(c, '.' | ',' | ';'))
        .trim_end_matches('/');
    (url.starts_with("http://") || url.starts_with("https://")).then(|| url.to_owned())
}

/// Scan `stdout` for the readiness line.
///
/// On success the reader moves into a background drain task that keeps
/// feeding `tail`.
///
/// # Errors
///
/// Returns [`AppError::DiscoveryTimeout`] when no readiness line arrives
/// within `timeout` or stdout closes first; the error carries the captured
/// tail.
pub async fn discover_url<R>(stdout: R, timeout: Duration, tail: &StdoutTail) -> Result<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut lines = BufReader::new(stdout).lines();

    let scan = async {
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    debug!(line = line.as_str(), "opencode stdout");
                    let url = parse_listening_url(&line);
                    tail.push(line);
                    if let Some(url) = url {
                        return Ok(url);
                    }
                }
                Ok(None) => {
                    return Err(String::from(
                        "agent stdout closed before it announced a listening url",
                    ))
                }
                Err(e) => return Err(format!("reading agent stdout failed: {e}")),
            }
        }
    };

    let url = match tokio::time::timeout(timeout, scan).await {
        Ok(Ok(url)) => url,
        Ok(Err(message)) => {
            return Err(AppError::DiscoveryTimeout {
                message,
                stdout_tail: tail.snapshot(),
            })
        }
        Err(_) => {
            return Err(AppError::DiscoveryTimeout {
                message: format!("no listening url announced within {timeout:?}"),
                stdout_tail: tail.snapshot(),
            })
        }
    };

    info!(url = url.as_str(), "opencode server discovered");

    let drain_tail = tail.clone();
    tokio::spawn(async move {
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(line = line.as_str(), "opencode stdout");
            drain_tail.push(line);
        }
        debug!("opencode stdout drain finished");
    });

    Ok(url)
}
