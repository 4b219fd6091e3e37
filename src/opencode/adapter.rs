//! [`Adapter`] implementation for `opencode serve`.
//!
//! The subprocess exposes an HTTP server whose URL is announced on stdout.
//! Turns are submitted with `prompt_async`; all progress arrives on the
//! `/event` SSE stream, which a single background task decodes and
//! dispatches in order. Turn completion is signalled out-of-band through a
//! control channel that [`Adapter::prompt`] waits on.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::client::{ModelRef, OpenCodeClient, PromptBody};
use super::discovery::{discover_url, StdoutTail};
use super::events::{
    Envelope, MessageInfo, OpenCodeEvent, Part, PermissionInfo, SessionErrorInfo,
};
use super::sse::{SseDecoder, SseFrame};
use super::text::TextPartState;
use crate::adapter::{
    compose_prompt, read_state, write_state, AdapterFuture, AgentCapabilities, AgentInfo,
    Attachment, BoxedReader, BoxedWriter, EventSink, McpServerConfig, PendingToolCall,
    PendingToolCalls,
};
use crate::config::AdapterConfig;
use crate::models::event::{AgentEvent, EventType, SESSION_STATUS_NEW, SESSION_STATUS_RESUMED};
use crate::models::payload::ToolStatus;
use crate::models::permission::{
    PermissionHandler, PermissionOption, PermissionRequest, PermissionResponse,
};
use crate::normalize::{
    normalize_status, OpenCodeNormalizer, RawToolResult, ToolIdentity, ToolNormalizer,
};
use crate::{Adapter, AppError, Result};

/// Environment variable carrying inline OpenCode configuration.
pub const CONFIG_ENV_VAR: &str = "OPENCODE_CONFIG_CONTENT";

/// Interval between health probes during [`Adapter::initialize`].
const HEALTH_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Permission reply values understood by the server.
pub const REPLY_ONCE: &str = "once";
pub const REPLY_ALWAYS: &str = "always";
pub const REPLY_REJECT: &str = "reject";

/// Out-of-band turn outcome observed on the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ControlSignal {
    Idle,
    AuthRequired(String),
    SessionError(String),
    Disconnected,
}

struct OpenCodeState {
    client: Option<OpenCodeClient>,
    connected: bool,
    session_id: Option<String>,
    agent_info: Option<AgentInfo>,
    pending: PendingToolCalls,
    seen_tool_calls: HashSet<String>,
    text_parts: HashMap<String, TextPartState>,
    message_roles: HashMap<String, String>,
    context_tokens: u64,
    /// An idle signal went out and no session activity has followed it.
    idle_reported: bool,
    pending_permissions: HashMap<String, String>,
    permission_handler: Option<PermissionHandler>,
    pending_context: Option<String>,
    sink: EventSink,
    closed: bool,
}

impl OpenCodeState {
    /// Drop per-session caches and cancel calls left from the previous
    /// session, then make `session_id` current.
    fn enter_session(&mut self, session_id: &str) {
        if let Some(previous) = self.session_id.take() {
            for event in self.pending.cancel_all(&previous) {
                self.sink.emit(event);
            }
        }
        self.seen_tool_calls.clear();
        self.text_parts.clear();
        self.message_roles.clear();
        self.context_tokens = 0;
        self.idle_reported = false;
        self.pending_permissions.clear();
        self.session_id = Some(session_id.to_owned());
    }
}

struct OpenCodeShared {
    config: AdapterConfig,
    normalizer: OpenCodeNormalizer,
    state: RwLock<OpenCodeState>,
    control_tx: mpsc::UnboundedSender<ControlSignal>,
    shutdown: CancellationToken,
}

/// Adapter for OpenCode's HTTP + SSE server mode.
pub struct OpenCodeAdapter {
    shared: Arc<OpenCodeShared>,
    control_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<ControlSignal>>,
    stdio: Mutex<Option<(BoxedWriter, BoxedReader)>>,
    /// Held so the subprocess keeps its stdin open until close.
    stdin: Mutex<Option<BoxedWriter>>,
    stdout_tail: StdoutTail,
    updates: Mutex<Option<mpsc::Receiver<AgentEvent>>>,
}

impl OpenCodeAdapter {
    /// Create an unconnected adapter.
    #[must_use]
    pub fn new(config: AdapterConfig) -> Self {
        let (sink, rx) = EventSink::channel(config.event_channel_capacity);
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let stdout_tail = StdoutTail::new(config.opencode.stdout_tail_lines);
        let state = OpenCodeState {
            client: None,
            connected: false,
            session_id: None,
            agent_info: None,
            pending: PendingToolCalls::new(),
            seen_tool_calls: HashSet::new(),
            text_parts: HashMap::new(),
            message_roles: HashMap::new(),
            context_tokens: 0,
            idle_reported: false,
            pending_permissions: HashMap::new(),
            permission_handler: None,
            pending_context: None,
            sink,
            closed: false,
        };
        Self {
            shared: Arc::new(OpenCodeShared {
                config,
                normalizer: OpenCodeNormalizer::new(),
                state: RwLock::new(state),
                control_tx,
                shutdown: CancellationToken::new(),
            }),
            control_rx: tokio::sync::Mutex::new(control_rx),
            stdio: Mutex::new(None),
            stdin: Mutex::new(None),
            stdout_tail,
            updates: Mutex::new(Some(rx)),
        }
    }

    /// Base URL of the discovered server, once initialized.
    #[must_use]
    pub fn base_url(&self) -> Option<String> {
        read_state(&self.shared.state)
            .client
            .as_ref()
            .map(|client| client.base_url().to_owned())
    }

    /// Ids of permission requests still awaiting a reply.
    #[must_use]
    pub fn pending_permissions(&self) -> Vec<String> {
        let mut ids: Vec<String> = read_state(&self.shared.state)
            .pending_permissions
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Answer a pending permission request by id.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] when `pending_id` is unknown or was
    /// already answered, and [`AppError::Http`] if the reply fails.
    pub async fn respond_permission(
        &self,
        pending_id: &str,
        response: PermissionResponse,
    ) -> Result<()> {
        self.shared
            .resolve_permission(pending_id, reply_for(&response))
            .await
    }

    fn client(&self) -> Result<OpenCodeClient> {
        let state = read_state(&self.shared.state);
        if state.closed {
            return Err(AppError::Closed);
        }
        state.client.clone().ok_or(AppError::NotConnected)
    }

    fn emit(&self, event: AgentEvent) {
        read_state(&self.shared.state).sink.emit(event);
    }

    async fn run_initialize(&self) -> Result<()> {
        let (stdin, stdout) = {
            let state = read_state(&self.shared.state);
            if state.closed {
                return Err(AppError::Closed);
            }
            if !state.connected {
                return Err(AppError::NotConnected);
            }
            drop(state);
            self.stdio
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
                .ok_or_else(|| AppError::Handshake("adapter already initialized".into()))?
        };
        *self.stdin.lock().unwrap_or_else(PoisonError::into_inner) = Some(stdin);

        let opencode = &self.shared.config.opencode;
        let url = discover_url(stdout, opencode.discovery_timeout(), &self.stdout_tail).await?;
        let client = OpenCodeClient::new(&url)?;
        let version = self.wait_healthy(&client).await?;

        let events = client.subscribe_events().await.map_err(|e| {
            AppError::Handshake(format!("failed to subscribe to event stream: {e}"))
        })?;

        {
            let mut state = write_state(&self.shared.state);
            state.client = Some(client);
            state.agent_info = Some(AgentInfo {
                name: String::from("opencode"),
                version,
                protocol_version: None,
                capabilities: AgentCapabilities {
                    load_session: true,
                    image: true,
                    audio: false,
                    embedded_context: false,
                },
            });
        }

        tokio::spawn(run_event_stream(Arc::clone(&self.shared), events));
        info!(url = url.as_str(), "opencode adapter ready");
        Ok(())
    }

    async fn wait_healthy(&self, client: &OpenCodeClient) -> Result<String> {
        let opencode = &self.shared.config.opencode;
        let timeout = opencode.health_timeout();
        let probe = async {
            loop {
                match client.health(&opencode.health_path).await {
                    Ok(Some(version)) => return version,
                    Ok(None) => debug!("opencode health check: not ready"),
                    Err(e) => debug!(error = %e, "opencode health check failed"),
                }
                tokio::time::sleep(HEALTH_POLL_INTERVAL).await;
            }
        };
        tokio::time::timeout(timeout, probe)
            .await
            .map_err(|_| AppError::HealthCheckTimeout {
                message: format!(
                    "{}{} not healthy within {timeout:?}",
                    client.base_url(),
                    opencode.health_path
                ),
                stdout_tail: self.stdout_tail.snapshot(),
            })
    }

    async fn run_new_session(&self) -> Result<String> {
        let client = self.client()?;
        let session = client.create_session().await?;
        info!(session_id = session.id.as_str(), "opencode session created");
        {
            let mut state = write_state(&self.shared.state);
            state.enter_session(&session.id);
            state
                .sink
                .emit(AgentEvent::session_status(session.id.as_str(), SESSION_STATUS_NEW));
        }
        Ok(session.id)
    }

    async fn run_load_session(&self, session_id: &str) -> Result<()> {
        let client = self.client()?;
        let session = client.get_session(session_id).await?;
        info!(session_id = session.id.as_str(), "opencode session resumed");
        let mut state = write_state(&self.shared.state);
        state.enter_session(&session.id);
        state
            .sink
            .emit(AgentEvent::session_status(session.id.as_str(), SESSION_STATUS_RESUMED));
        Ok(())
    }

    fn prompt_body(&self, text: &str, attachments: &[Attachment]) -> PromptBody {
        let opencode = &self.shared.config.opencode;
        let mut body = PromptBody::text(text);
        for attachment in attachments {
            body.push_file(
                &attachment.mime_type,
                &attachment.data,
                attachment.name.as_deref(),
            );
        }
        body.model = opencode.model.as_deref().and_then(ModelRef::parse);
        body.agent.clone_from(&opencode.agent);
        body
    }

    async fn run_prompt(
        &self,
        cancel: CancellationToken,
        message: &str,
        attachments: Vec<Attachment>,
    ) -> Result<()> {
        let client = self.client()?;
        let (session_id, context) = {
            let mut state = write_state(&self.shared.state);
            let session_id = state.session_id.clone().ok_or(AppError::NoSession)?;
            (session_id, state.pending_context.take())
        };
        let body = self.prompt_body(&compose_prompt(context, message), &attachments);

        // One turn at a time owns the control channel.
        let mut control = self.control_rx.lock().await;
        while control.try_recv().is_ok() {}

        client.prompt_async(&session_id, &body).await?;

        loop {
            let signal = tokio::select! {
                () = cancel.cancelled() => {
                    info!(session_id = session_id.as_str(), "opencode prompt cancelled by caller");
                    if let Err(e) = client.abort(&session_id).await {
                        warn!(
                            session_id = session_id.as_str(),
                            error = %e,
                            "opencode abort failed"
                        );
                    }
                    return Err(AppError::Cancelled);
                }
                signal = control.recv() => signal.unwrap_or(ControlSignal::Disconnected),
            };

            match signal {
                ControlSignal::Idle => {
                    self.emit(
                        AgentEvent::complete(session_id.as_str()).with_data("stopReason", "end_turn"),
                    );
                    return Ok(());
                }
                ControlSignal::Disconnected => {
                    warn!(
                        session_id = session_id.as_str(),
                        "opencode event stream ended during prompt"
                    );
                    self.emit(
                        AgentEvent::complete(session_id.as_str())
                            .with_data("stopReason", "disconnected"),
                    );
                    return Ok(());
                }
                ControlSignal::AuthRequired(message) => return Err(AppError::AuthRequired(message)),
                ControlSignal::SessionError(message) => {
                    warn!(
                        session_id = session_id.as_str(),
                        error = message.as_str(),
                        "opencode session error, waiting for recovery"
                    );
                }
            }
        }
    }

    async fn run_cancel(&self) -> Result<()> {
        let client = self.client()?;
        let Some(session_id) = read_state(&self.shared.state).session_id.clone() else {
            return Ok(());
        };
        client.abort(&session_id).await
    }

    fn run_close(&self) {
        {
            let mut state = write_state(&self.shared.state);
            if state.closed {
                return;
            }
            state.closed = true;
            if let Some(session_id) = state.session_id.clone() {
                for event in state.pending.cancel_all(&session_id) {
                    state.sink.emit(event);
                }
            }
            state.pending_permissions.clear();
            state.sink.close();
        }
        self.shared.shutdown.cancel();
        let _ = self.shared.control_tx.send(ControlSignal::Disconnected);
        self.stdio
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.stdin
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        info!("opencode adapter closed");
    }
}

impl Adapter for OpenCodeAdapter {
    fn prepare_environment(&self) -> Result<HashMap<String, String>> {
        let policy = if self.shared.config.auto_approve {
            "allow"
        } else {
            "ask"
        };
        let mut config = json!({
            "$schema": "https://opencode.ai/config.json",
            "permission": {
                "edit": policy,
                "bash": policy,
                "webfetch": policy,
            },
        });
        if let Some(model) = &self.shared.config.opencode.model {
            config["model"] = json!(model);
        }
        let mut env = HashMap::new();
        env.insert(CONFIG_ENV_VAR.to_owned(), serde_json::to_string(&config)?);
        Ok(env)
    }

    fn prepare_command_args(&self) -> Vec<String> {
        ["serve", "--hostname", "127.0.0.1", "--port", "0"]
            .into_iter()
            .map(str::to_owned)
            .collect()
    }

    fn connect(&self, stdin: BoxedWriter, stdout: BoxedReader) -> Result<()> {
        let mut state = write_state(&self.shared.state);
        if state.closed {
            return Err(AppError::Closed);
        }
        if state.connected {
            return Err(AppError::AlreadyConnected);
        }
        state.connected = true;
        *self.stdio.lock().unwrap_or_else(PoisonError::into_inner) = Some((stdin, stdout));
        debug!("opencode adapter connected");
        Ok(())
    }

    fn initialize(&self) -> AdapterFuture<'_, ()> {
        Box::pin(self.run_initialize())
    }

    fn agent_info(&self) -> Option<AgentInfo> {
        read_state(&self.shared.state).agent_info.clone()
    }

    fn new_session(&self, mcp_servers: Vec<McpServerConfig>) -> AdapterFuture<'_, String> {
        if !mcp_servers.is_empty() {
            debug!(
                count = mcp_servers.len(),
                "opencode reads mcp servers from its own config, ignoring"
            );
        }
        Box::pin(self.run_new_session())
    }

    fn load_session<'a>(&'a self, session_id: &'a str) -> AdapterFuture<'a, ()> {
        Box::pin(self.run_load_session(session_id))
    }

    fn set_pending_context(&self, context: String) {
        write_state(&self.shared.state).pending_context = Some(context);
    }

    fn prompt<'a>(
        &'a self,
        cancel: CancellationToken,
        message: &'a str,
        attachments: Vec<Attachment>,
    ) -> AdapterFuture<'a, ()> {
        Box::pin(self.run_prompt(cancel, message, attachments))
    }

    fn cancel(&self) -> AdapterFuture<'_, ()> {
        Box::pin(self.run_cancel())
    }

    fn updates(&self) -> Option<mpsc::Receiver<AgentEvent>> {
        self.updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn set_permission_handler(&self, handler: Option<PermissionHandler>) {
        write_state(&self.shared.state).permission_handler = handler;
    }

    fn session_id(&self) -> Option<String> {
        read_state(&self.shared.state).session_id.clone()
    }

    fn close(&self) -> AdapterFuture<'_, ()> {
        Box::pin(async move {
            self.run_close();
            Ok(())
        })
    }

    fn requires_process_kill(&self) -> bool {
        true
    }
}

/// Map a handler decision to the server's reply vocabulary.
#[must_use]
pub fn reply_for(response: &PermissionResponse) -> &'static str {
    if response.cancelled {
        return REPLY_REJECT;
    }
    match response.option_id.as_str() {
        REPLY_ONCE => REPLY_ONCE,
        REPLY_ALWAYS => REPLY_ALWAYS,
        _ => REPLY_REJECT,
    }
}

/// Options offered for every OpenCode permission request.
#[must_use]
pub fn permission_options() -> Vec<PermissionOption> {
    vec![
        PermissionOption::new(REPLY_ONCE, "Allow once", "allow_once"),
        PermissionOption::new(REPLY_ALWAYS, "Always allow", "allow_always"),
        PermissionOption::new(REPLY_REJECT, "Reject", "reject_once"),
    ]
}

// ── Event stream ─────────────────────────────────────────────────────────────

async fn run_event_stream(shared: Arc<OpenCodeShared>, response: reqwest::Response) {
    let mut decoder = SseDecoder::new();
    let mut stream = response.bytes_stream();

    loop {
        let chunk = tokio::select! {
            biased;
            () = shared.shutdown.cancelled() => break,
            chunk = stream.next() => chunk,
        };
        match chunk {
            Some(Ok(bytes)) => {
                for frame in decoder.push(&bytes) {
                    shared.dispatch_frame(&frame);
                }
            }
            Some(Err(e)) => {
                warn!(error = %e, "opencode event stream failed");
                break;
            }
            None => {
                if let Some(frame) = decoder.finish() {
                    shared.dispatch_frame(&frame);
                }
                debug!("opencode event stream ended");
                break;
            }
        }
    }

    let _ = shared.control_tx.send(ControlSignal::Disconnected);
}

impl OpenCodeShared {
    fn dispatch_frame(self: &Arc<Self>, frame: &SseFrame) {
        let envelope: Envelope = match serde_json::from_str(&frame.data) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "malformed opencode event, skipping");
                return;
            }
        };
        let event_type = envelope.event_type.clone();
        match OpenCodeEvent::parse(envelope) {
            Ok(event) => self.handle_event(event),
            Err(e) => warn!(
                event_type = event_type.as_str(),
                error = %e,
                "invalid opencode event properties"
            ),
        }
    }

    fn handle_event(self: &Arc<Self>, event: OpenCodeEvent) {
        let mut state = write_state(&self.state);
        if state.closed {
            return;
        }
        let Some(current) = state.session_id.clone() else {
            debug!("opencode event before any session, skipping");
            return;
        };
        if event.session_id().is_some_and(|id| id != current) {
            debug!(session_id = event.session_id(), "opencode event for another session");
            return;
        }

        // `session.idle` and `session.status{idle}` both end a turn; only
        // the first after fresh activity is forwarded.
        if !matches!(event, OpenCodeEvent::SessionIdle { .. } | OpenCodeEvent::Other(_)) {
            state.idle_reported = false;
        }

        match event {
            OpenCodeEvent::MessageUpdated(info) => {
                Self::handle_message(&mut state, &current, &info);
            }
            OpenCodeEvent::PartUpdated { part, delta } => {
                self.handle_part(&mut state, &current, part, delta.as_deref());
            }
            OpenCodeEvent::SessionIdle { .. } => {
                if state.idle_reported {
                    debug!(session_id = current.as_str(), "repeated idle, ignoring");
                } else {
                    state.idle_reported = true;
                    let _ = self.control_tx.send(ControlSignal::Idle);
                }
            }
            OpenCodeEvent::SessionBusy { .. } => {
                debug!(session_id = current.as_str(), "opencode session busy");
            }
            OpenCodeEvent::SessionError { error, .. } => {
                self.handle_session_error(&state, &current, error);
            }
            OpenCodeEvent::PermissionAsked(info) => {
                let handler = state.permission_handler.clone();
                drop(state);
                self.handle_permission(&current, info, handler);
            }
            OpenCodeEvent::Other(event_type) => {
                debug!(event_type = event_type.as_str(), "ignoring opencode event");
            }
        }
    }

    fn handle_message(state: &mut OpenCodeState, session_id: &str, info: &MessageInfo) {
        state
            .message_roles
            .insert(info.id.clone(), info.role.clone());

        let Some(tokens) = info.tokens.filter(|_| info.role == "assistant") else {
            return;
        };
        // An assistant message's input covers the whole prompt context.
        let used = tokens.total();
        if used == 0 || used == state.context_tokens {
            return;
        }
        state.context_tokens = used;
        let event = AgentEvent::new(EventType::ContextWindow, session_id)
            .with_operation_id(Some(info.id.clone()))
            .with_data("used", used)
            .with_data("inputTokens", tokens.input)
            .with_data("outputTokens", tokens.output)
            .with_data("reasoningTokens", tokens.reasoning)
            .with_data("cacheReadTokens", tokens.cache.read)
            .with_data("cacheWriteTokens", tokens.cache.write);
        state.sink.emit(event);
    }

    fn handle_part(
        &self,
        state: &mut OpenCodeState,
        session_id: &str,
        part: Part,
        delta: Option<&str>,
    ) {
        // Unknown roles count as agent output.
        if state
            .message_roles
            .get(&part.message_id)
            .is_some_and(|role| role == "user")
        {
            return;
        }

        match part.part_type.as_str() {
            "text" | "reasoning" => {
                let emitted = state
                    .text_parts
                    .entry(part.id.clone())
                    .or_default()
                    .reconcile(part.text.as_deref(), delta);
                let Some(text) = emitted.filter(|text| !text.is_empty()) else {
                    return;
                };
                let event = if part.part_type == "text" {
                    AgentEvent::message_chunk(session_id, text)
                } else {
                    AgentEvent::reasoning(session_id, text)
                };
                let operation_id = (!part.message_id.is_empty()).then(|| part.message_id.clone());
                state.sink.emit(event.with_operation_id(operation_id));
            }
            "tool" => self.handle_tool_part(state, session_id, part),
            other => debug!(part_type = other, "skipping opencode part"),
        }
    }

    fn handle_tool_part(&self, state: &mut OpenCodeState, session_id: &str, part: Part) {
        let call_id = part.call_id.clone().unwrap_or_else(|| part.id.clone());
        let tool_name = part.tool.clone().unwrap_or_else(|| String::from("tool"));
        let tool_state = part.state.unwrap_or_default();
        let status = if tool_state.status.is_empty() {
            ToolStatus::Pending
        } else {
            normalize_status(&tool_state.status)
        };
        let operation_id = (!part.message_id.is_empty()).then(|| part.message_id.clone());

        let args = tool_state
            .input
            .clone()
            .filter(|input| input.as_object().is_some_and(|obj| !obj.is_empty()));
        let result = RawToolResult {
            output: tool_state.output.clone().filter(|_| status.is_terminal()),
            text: None,
            error: tool_state
                .error
                .clone()
                .filter(|_| status == ToolStatus::Error),
            metadata: tool_state.metadata.clone(),
        };
        let identity = ToolIdentity::named(&tool_name);
        let empty = json!({});

        let first_sighting = state.seen_tool_calls.insert(call_id.clone());
        let event_type = if first_sighting {
            EventType::ToolCall
        } else {
            EventType::ToolUpdate
        };

        let call = if let Some(call) = state.pending.get_mut(&call_id) {
            if let Some(args) = &args {
                call.payload = self.normalizer.normalize_tool_call(&identity, args);
            }
            call.status = status;
            if tool_state.title.is_some() {
                call.title.clone_from(&tool_state.title);
            }
            if status.is_terminal() && !result.is_empty() {
                self.normalizer
                    .normalize_tool_result(&mut call.payload, &result);
            }
            call.clone()
        } else {
            let mut payload = self
                .normalizer
                .normalize_tool_call(&identity, args.as_ref().unwrap_or(&empty));
            if status.is_terminal() && !result.is_empty() {
                self.normalizer.normalize_tool_result(&mut payload, &result);
            }
            let call =
                PendingToolCall::new(tool_name.clone(), tool_state.title.clone(), status, payload);
            if !status.is_terminal() {
                state.pending.insert(&call_id, call.clone());
            }
            call
        };

        if status.is_terminal() {
            state.pending.remove(&call_id);
        }

        let mut event = AgentEvent::tool(
            event_type,
            session_id,
            call_id,
            call.status,
            Some(call.payload),
        )
        .with_operation_id(operation_id);
        event.tool_name = Some(call.tool_name);
        event.tool_title = call.title;
        if status == ToolStatus::Error {
            event.text = tool_state.error;
        }
        state.sink.emit(event);
    }

    fn handle_session_error(
        &self,
        state: &OpenCodeState,
        session_id: &str,
        error: SessionErrorInfo,
    ) {
        if error.is_abort() {
            debug!(session_id, "opencode turn aborted");
            return;
        }
        state.sink.emit(
            AgentEvent::error(session_id, error.message.clone())
                .with_data("errorName", error.name.clone()),
        );
        let signal = if error.is_auth_error() {
            ControlSignal::AuthRequired(error.message)
        } else {
            ControlSignal::SessionError(error.message)
        };
        let _ = self.control_tx.send(signal);
    }

    fn handle_permission(
        self: &Arc<Self>,
        session_id: &str,
        info: PermissionInfo,
        handler: Option<PermissionHandler>,
    ) {
        if self.config.auto_approve {
            debug!(permission_id = info.id.as_str(), "auto-approving opencode permission");
            let shared = Arc::clone(self);
            let session_id = session_id.to_owned();
            tokio::spawn(async move {
                let Ok(client) = shared.client() else { return };
                if let Err(e) = client.reply_permission(&session_id, &info.id, REPLY_ONCE).await {
                    warn!(
                        permission_id = info.id.as_str(),
                        error = %e,
                        "auto-approve reply failed"
                    );
                }
            });
            return;
        }

        let options = permission_options();
        let title = info
            .title
            .clone()
            .unwrap_or_else(|| format!("Allow {}?", info.permission));
        let details = json!({
            "patterns": info.patterns,
            "metadata": info.metadata,
        });

        {
            let mut state = write_state(&self.state);
            if state.closed {
                return;
            }
            if state
                .pending_permissions
                .insert(info.id.clone(), session_id.to_owned())
                .is_some()
            {
                debug!(permission_id = info.id.as_str(), "permission already pending");
                return;
            }
            let mut event = AgentEvent::new(EventType::PermissionRequest, session_id);
            event.pending_id = Some(info.id.clone());
            event.tool_call_id.clone_from(&info.call_id);
            event.title = Some(title.clone());
            event.options.clone_from(&options);
            event.action_type = Some(info.permission.clone());
            event.action_details = Some(details.clone());
            state.sink.emit(event);
        }

        let Some(handler) = handler else {
            debug!(
                permission_id = info.id.as_str(),
                "no permission handler, awaiting manual reply"
            );
            return;
        };

        let request = PermissionRequest {
            session_id: session_id.to_owned(),
            tool_call_id: info.call_id,
            pending_id: info.id,
            title,
            action_type: info.permission,
            action_details: details,
            options,
        };
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let pending_id = request.pending_id.clone();
            let decision = handler(request).await.unwrap_or_else(|e| {
                warn!(
                    pending_id = pending_id.as_str(),
                    error = %e,
                    "permission handler failed, rejecting"
                );
                PermissionResponse::cancelled()
            });
            match shared.resolve_permission(&pending_id, reply_for(&decision)).await {
                Ok(()) | Err(AppError::NotFound(_)) => {}
                Err(e) => warn!(
                    pending_id = pending_id.as_str(),
                    error = %e,
                    "permission reply failed"
                ),
            }
        });
    }

    fn client(&self) -> Result<OpenCodeClient> {
        read_state(&self.state)
            .client
            .clone()
            .ok_or(AppError::NotConnected)
    }

    /// Remove the pending entry and send the reply. Only the first caller
    /// for a given id gets past the removal.
    async fn resolve_permission(&self, pending_id: &str, reply: &str) -> Result<()> {
        let (session_id, client) = {
            let mut state = write_state(&self.state);
            let session_id = state
                .pending_permissions
                .remove(pending_id)
                .ok_or_else(|| AppError::NotFound(format!("permission {pending_id}")))?;
            let client = state.client.clone().ok_or(AppError::NotConnected)?;
            (session_id, client)
        };
        debug!(pending_id, reply, "replying to opencode permission");
        client.reply_permission(&session_id, pending_id, reply).await
    }
}
