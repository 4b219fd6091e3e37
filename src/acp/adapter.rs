//! [`Adapter`] implementation for agents speaking ACP over stdio.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::protocol::{
    permission_outcome, text_of_block, CancelParams, ClientCapabilities, ContentBlock,
    Implementation, InitializeParams, InitializeResult, LoadSessionParams, McpServerWire,
    NewSessionParams, NewSessionResult, PromptParams, PromptResult, RequestPermissionParams,
    RpcError, SessionNotification, SessionUpdate, ToolCallFields, INVALID_PARAMS,
    METHOD_INITIALIZE, METHOD_REQUEST_PERMISSION, METHOD_SESSION_CANCEL, METHOD_SESSION_LOAD,
    METHOD_SESSION_NEW, METHOD_SESSION_PROMPT, METHOD_SESSION_UPDATE,
};
use super::transport::{Connection, InboundHandler, Responder};
use crate::adapter::{
    compose_prompt, read_state, write_state, AdapterFuture, AgentCapabilities, AgentInfo,
    Attachment, BoxedReader, BoxedWriter, EventSink, McpServerConfig, PendingToolCall,
    PendingToolCalls,
};
use crate::config::AdapterConfig;
use crate::models::event::{AgentEvent, EventType, SESSION_STATUS_NEW, SESSION_STATUS_RESUMED};
use crate::models::payload::{NormalizedPayload, ToolStatus};
use crate::models::permission::{
    default_decision, PermissionHandler, PermissionRequest, PermissionResponse,
};
use crate::normalize::{
    generate_unified_diff, normalize_status, AcpNormalizer, RawToolResult, ToolIdentity,
    ToolNormalizer,
};
use crate::{Adapter, AppError, Result};

/// Mutable adapter state, guarded by one lock.
struct AcpState {
    connection: Option<Arc<Connection>>,
    session_id: Option<String>,
    agent_info: Option<AgentInfo>,
    pending: PendingToolCalls,
    /// Every call id announced in the current session, finished or not.
    seen_tool_calls: HashSet<String>,
    permission_handler: Option<PermissionHandler>,
    pending_context: Option<String>,
    sink: EventSink,
    closed: bool,
}

/// State shared with the connection's dispatcher task.
struct AcpShared {
    config: AdapterConfig,
    normalizer: AcpNormalizer,
    state: RwLock<AcpState>,
}

/// Adapter for ACP agents (Claude Code ACP, Codex ACP, Gemini CLI, …).
pub struct AcpAdapter {
    shared: Arc<AcpShared>,
    updates: Mutex<Option<mpsc::Receiver<AgentEvent>>>,
}

impl AcpAdapter {
    /// Create an unconnected adapter.
    #[must_use]
    pub fn new(config: AdapterConfig) -> Self {
        let (sink, rx) = EventSink::channel(config.event_channel_capacity);
        let state = AcpState {
            connection: None,
            session_id: None,
            agent_info: None,
            pending: PendingToolCalls::new(),
            seen_tool_calls: HashSet::new(),
            permission_handler: None,
            pending_context: None,
            sink,
            closed: false,
        };
        Self {
            shared: Arc::new(AcpShared {
                config,
                normalizer: AcpNormalizer::new(),
                state: RwLock::new(state),
            }),
            updates: Mutex::new(Some(rx)),
        }
    }

    fn connection(&self) -> Result<Arc<Connection>> {
        let state = read_state(&self.shared.state);
        if state.closed {
            return Err(AppError::Closed);
        }
        state.connection.clone().ok_or(AppError::NotConnected)
    }

    fn active_session(&self) -> Result<String> {
        read_state(&self.shared.state)
            .session_id
            .clone()
            .ok_or(AppError::NoSession)
    }

    fn cwd(&self) -> String {
        self.shared.config.workspace_root.display().to_string()
    }

    /// Switch to `session_id`, cancelling calls left over from the previous
    /// session.
    fn enter_session(&self, session_id: &str) {
        let mut state = write_state(&self.shared.state);
        if let Some(previous) = state.session_id.take() {
            for event in state.pending.cancel_all(&previous) {
                state.sink.emit(event);
            }
        }
        state.seen_tool_calls.clear();
        state.session_id = Some(session_id.to_owned());
    }

    fn emit(&self, event: AgentEvent) {
        read_state(&self.shared.state).sink.emit(event);
    }

    async fn run_initialize(&self) -> Result<()> {
        let conn = self.connection()?;
        let acp = &self.shared.config.acp;
        let params = InitializeParams {
            protocol_version: acp.protocol_version,
            client_capabilities: ClientCapabilities::default(),
            client_info: Implementation {
                name: self.shared.config.client_name.clone(),
                version: env!("CARGO_PKG_VERSION").to_owned(),
            },
        };

        let timeout = acp.handshake_timeout();
        let response = tokio::time::timeout(
            timeout,
            conn.request(METHOD_INITIALIZE, serde_json::to_value(params)?),
        )
        .await
        .map_err(|_| {
            AppError::Handshake(format!("no initialize response within {timeout:?}"))
        })?
        .map_err(|e| AppError::Handshake(e.to_string()))?;

        let result: InitializeResult = serde_json::from_value(response)
            .map_err(|e| AppError::Handshake(format!("invalid initialize result: {e}")))?;

        let identity = result.agent_info.unwrap_or(Implementation {
            name: String::from("unknown"),
            version: String::new(),
        });
        let caps = result.agent_capabilities;
        let info = AgentInfo {
            name: identity.name,
            version: identity.version,
            protocol_version: Some(result.protocol_version.min(acp.protocol_version)),
            capabilities: AgentCapabilities {
                load_session: caps.load_session,
                image: caps.prompt_capabilities.image,
                audio: caps.prompt_capabilities.audio,
                embedded_context: caps.prompt_capabilities.embedded_context,
            },
        };

        info!(
            agent = info.name.as_str(),
            version = info.version.as_str(),
            protocol_version = result.protocol_version,
            load_session = info.capabilities.load_session,
            "acp handshake complete"
        );
        write_state(&self.shared.state).agent_info = Some(info);
        Ok(())
    }

    async fn run_new_session(&self, mcp_servers: Vec<McpServerConfig>) -> Result<String> {
        let conn = self.connection()?;
        let params = NewSessionParams {
            cwd: self.cwd(),
            mcp_servers: mcp_servers.iter().map(McpServerWire::from).collect(),
        };
        let response = conn
            .request(METHOD_SESSION_NEW, serde_json::to_value(params)?)
            .await?;
        let result: NewSessionResult = serde_json::from_value(response)?;
        let session_id = result.session_id;

        info!(session_id = session_id.as_str(), "acp session created");
        self.enter_session(&session_id);
        self.emit(AgentEvent::session_status(session_id.as_str(), SESSION_STATUS_NEW));

        if let Some(modes) = result.modes {
            self.emit(
                AgentEvent::new(EventType::SessionMode, session_id.as_str())
                    .with_data("modeId", modes.current_mode_id),
            );
        }
        Ok(session_id)
    }

    async fn run_load_session(&self, session_id: &str) -> Result<()> {
        let conn = self.connection()?;
        let supported = read_state(&self.shared.state)
            .agent_info
            .as_ref()
            .is_some_and(|info| info.capabilities.load_session);
        if !supported {
            return Err(AppError::CapabilityUnsupported(
                "agent does not support session/load".into(),
            ));
        }

        // Replayed history notifications carry this id; track it up front.
        self.enter_session(session_id);

        let params = LoadSessionParams {
            session_id: session_id.to_owned(),
            cwd: self.cwd(),
            mcp_servers: Vec::new(),
        };
        conn.request(METHOD_SESSION_LOAD, serde_json::to_value(params)?)
            .await?;

        info!(session_id, "acp session loaded");
        self.emit(AgentEvent::session_status(session_id, SESSION_STATUS_RESUMED));
        Ok(())
    }

    async fn run_prompt(
        &self,
        cancel: CancellationToken,
        message: &str,
        attachments: Vec<Attachment>,
    ) -> Result<()> {
        let conn = self.connection()?;
        let (session_id, context) = {
            let mut state = write_state(&self.shared.state);
            let session_id = state.session_id.clone().ok_or(AppError::NoSession)?;
            (session_id, state.pending_context.take())
        };

        let mut prompt = vec![ContentBlock::Text {
            text: compose_prompt(context, message),
        }];
        for attachment in attachments {
            if attachment.is_image() {
                prompt.push(ContentBlock::Image {
                    data: attachment.data,
                    mime_type: attachment.mime_type,
                });
            } else {
                warn!(
                    session_id = session_id.as_str(),
                    mime_type = attachment.mime_type.as_str(),
                    "acp prompt: unsupported attachment type, skipping"
                );
            }
        }

        let params = serde_json::to_value(PromptParams {
            session_id: session_id.clone(),
            prompt,
        })?;

        let response = tokio::select! {
            () = cancel.cancelled() => {
                info!(session_id = session_id.as_str(), "acp prompt cancelled by caller");
                let cancel_params = serde_json::to_value(CancelParams {
                    session_id: session_id.clone(),
                })?;
                if let Err(e) = conn.notify(METHOD_SESSION_CANCEL, cancel_params) {
                    warn!(
                        session_id = session_id.as_str(),
                        error = %e,
                        "failed to send session/cancel"
                    );
                }
                return Err(AppError::Cancelled);
            }
            response = conn.request(METHOD_SESSION_PROMPT, params) => response?,
        };

        let result: PromptResult = serde_json::from_value(response)?;
        debug!(
            session_id = session_id.as_str(),
            stop_reason = result.stop_reason.as_str(),
            "acp prompt finished"
        );
        self.emit(AgentEvent::complete(session_id).with_data("stopReason", result.stop_reason));
        Ok(())
    }

    async fn run_cancel(&self) -> Result<()> {
        let conn = self.connection()?;
        let Ok(session_id) = self.active_session() else {
            return Ok(());
        };
        conn.notify(
            METHOD_SESSION_CANCEL,
            serde_json::to_value(CancelParams { session_id })?,
        )
    }

    fn run_close(&self) {
        let connection = {
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
            state.sink.close();
            state.connection.take()
        };
        if let Some(conn) = connection {
            conn.close();
        }
        info!("acp adapter closed");
    }
}

impl Adapter for AcpAdapter {
    fn prepare_environment(&self) -> Result<HashMap<String, String>> {
        Ok(HashMap::new())
    }

    fn prepare_command_args(&self) -> Vec<String> {
        self.shared.config.acp.extra_args.clone()
    }

    fn connect(&self, stdin: BoxedWriter, stdout: BoxedReader) -> Result<()> {
        let mut state = write_state(&self.shared.state);
        if state.closed {
            return Err(AppError::Closed);
        }
        if state.connection.is_some() {
            return Err(AppError::AlreadyConnected);
        }
        let handler = Arc::clone(&self.shared);
        state.connection = Some(Arc::new(Connection::spawn(stdin, stdout, handler)));
        debug!("acp adapter connected");
        Ok(())
    }

    fn initialize(&self) -> AdapterFuture<'_, ()> {
        Box::pin(self.run_initialize())
    }

    fn agent_info(&self) -> Option<AgentInfo> {
        read_state(&self.shared.state).agent_info.clone()
    }

    fn new_session(&self, mcp_servers: Vec<McpServerConfig>) -> AdapterFuture<'_, String> {
        Box::pin(self.run_new_session(mcp_servers))
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
        false
    }
}

// ── Inbound traffic ──────────────────────────────────────────────────────────

impl AcpShared {
    fn identity<'a>(fields: &'a ToolCallFields, fallback: &'a str) -> ToolIdentity<'a> {
        ToolIdentity {
            name: fields.tool_name().unwrap_or(fallback),
            kind: fields.kind.as_deref(),
            location: fields.first_location(),
        }
    }

    fn classify(&self, fields: &ToolCallFields, fallback_name: &str) -> NormalizedPayload {
        let empty = json!({});
        let args = fields.arguments().unwrap_or(&empty);
        self.normalizer
            .normalize_tool_call(&Self::identity(fields, fallback_name), args)
    }

    /// Raw result carried by a tool call or update, if any.
    fn raw_result(fields: &ToolCallFields, status: ToolStatus) -> Option<RawToolResult> {
        let text = fields.content_text();
        let result = RawToolResult {
            error: (status == ToolStatus::Error)
                .then(|| text.clone().unwrap_or_else(|| String::from("tool failed"))),
            output: fields.raw_output.clone(),
            text,
            metadata: None,
        };
        (!result.is_empty()).then_some(result)
    }

    /// Apply a `diff` content block to an edit payload that has no diff yet.
    fn apply_content_diff(payload: &mut NormalizedPayload, fields: &ToolCallFields) {
        let (NormalizedPayload::ModifyFile(modify), Some((path, old, new))) =
            (payload, fields.content_diff())
        else {
            return;
        };
        if modify.file_path.is_empty() {
            modify.file_path = path.clone();
        }
        for mutation in &mut modify.mutations {
            if mutation.diff.as_deref().map_or(true, str::is_empty) {
                let diff = generate_unified_diff(&old, &new, &path, 1);
                if !diff.is_empty() {
                    mutation.diff = Some(diff);
                }
            }
        }
    }

    fn tool_event(
        event_type: EventType,
        session_id: &str,
        id: &str,
        call: &PendingToolCall,
    ) -> AgentEvent {
        let mut event = AgentEvent::tool(
            event_type,
            session_id,
            id,
            call.status,
            Some(call.payload.clone()),
        );
        event.tool_name = Some(call.tool_name.clone());
        event.tool_title = call.title.clone();
        event
    }

    /// Entry for a call seen for the first time.
    fn new_call(&self, fields: &ToolCallFields, status: ToolStatus) -> PendingToolCall {
        let mut call = PendingToolCall::new(
            Self::identity(fields, "tool").name,
            fields.title.clone(),
            status,
            self.classify(fields, "tool"),
        );
        call.kind.clone_from(&fields.kind);
        call.arguments = fields.arguments().cloned();
        if let Some(result) = Self::raw_result(fields, status) {
            self.normalizer.normalize_tool_result(&mut call.payload, &result);
            call.last_result = Some(result);
        }
        Self::apply_content_diff(&mut call.payload, fields);
        call
    }

    /// Re-classify `call` from new arguments under its recorded identity,
    /// keeping the output and diffs merged so far.
    fn reclassify(&self, call: &mut PendingToolCall, fields: &ToolCallFields, args: &Value) {
        let identity = ToolIdentity {
            name: &call.tool_name,
            kind: call.kind.as_deref(),
            location: fields.first_location(),
        };
        let mut payload = self.normalizer.normalize_tool_call(&identity, args);
        if let Some(result) = &call.last_result {
            self.normalizer.normalize_tool_result(&mut payload, result);
        }
        carry_over_diffs(&call.payload, &mut payload);
        call.payload = payload;
        call.arguments = Some(args.clone());
    }

    fn handle_tool_call(&self, state: &mut AcpState, session_id: &str, fields: &ToolCallFields) {
        let id = fields.tool_call_id.as_str();
        if state.seen_tool_calls.contains(id) {
            debug!(session_id, tool_call_id = id, "repeated tool_call, merging as update");
            self.handle_tool_update(state, session_id, fields);
            return;
        }
        state.seen_tool_calls.insert(id.to_owned());

        let status = fields
            .status
            .as_deref()
            .map_or(ToolStatus::Pending, normalize_status);
        let call = self.new_call(fields, status);
        state
            .sink
            .emit(Self::tool_event(EventType::ToolCall, session_id, id, &call));
        if !status.is_terminal() {
            state.pending.insert(id, call);
        }
    }

    fn handle_tool_update(&self, state: &mut AcpState, session_id: &str, fields: &ToolCallFields) {
        let id = fields.tool_call_id.as_str();

        let Some(call) = state.pending.get_mut(id) else {
            // Update for a call never announced, or one already finished;
            // surface what it carries.
            let status = fields
                .status
                .as_deref()
                .map_or(ToolStatus::Running, normalize_status);
            let call = self.new_call(fields, status);
            let first_sighting = state.seen_tool_calls.insert(id.to_owned());
            debug!(
                session_id,
                tool_call_id = id,
                first_sighting,
                "tool_call_update for a call not in flight"
            );
            state
                .sink
                .emit(Self::tool_event(EventType::ToolUpdate, session_id, id, &call));
            if first_sighting && !status.is_terminal() {
                state.pending.insert(id, call);
            }
            return;
        };

        if call.tool_name == "tool" {
            if let Some(name) = fields.tool_name() {
                call.tool_name = name.to_owned();
            }
        }
        if call.kind.is_none() {
            call.kind.clone_from(&fields.kind);
        }
        if fields.title.is_some() {
            call.title.clone_from(&fields.title);
        }
        if let Some(status) = fields.status.as_deref() {
            call.status = normalize_status(status);
        }
        // Arguments often arrive after the initial announcement.
        if let Some(args) = fields.arguments() {
            if call.arguments.as_ref() != Some(args) {
                self.reclassify(call, fields, args);
            }
        }
        if let Some(result) = Self::raw_result(fields, call.status) {
            self.normalizer.normalize_tool_result(&mut call.payload, &result);
            call.last_result = Some(result);
        }
        Self::apply_content_diff(&mut call.payload, fields);

        let event = Self::tool_event(EventType::ToolUpdate, session_id, id, call);
        let terminal = call.status.is_terminal();
        state.sink.emit(event);
        if terminal {
            state.pending.remove(id);
        }
    }

    fn handle_session_update(&self, notification: SessionNotification) {
        let mut state = write_state(&self.state);
        if state.closed {
            return;
        }
        let session_id = notification.session_id.as_str();

        match notification.update {
            SessionUpdate::AgentMessageChunk { content } => match text_of_block(&content) {
                Some(text) if !text.is_empty() => {
                    state.sink.emit(AgentEvent::message_chunk(session_id, text));
                }
                Some(_) => {}
                None => debug!(session_id, "skipping non-text message chunk"),
            },
            SessionUpdate::AgentThoughtChunk { content } => match text_of_block(&content) {
                Some(text) if !text.is_empty() => {
                    state.sink.emit(AgentEvent::reasoning(session_id, text));
                }
                Some(_) => {}
                None => debug!(session_id, "skipping non-text thought chunk"),
            },
            SessionUpdate::UserMessageChunk { .. } => {}
            SessionUpdate::ToolCall(fields) => {
                self.handle_tool_call(&mut state, session_id, &fields);
            }
            SessionUpdate::ToolCallUpdate(fields) => {
                self.handle_tool_update(&mut state, session_id, &fields);
            }
            SessionUpdate::Plan { entries } => {
                let mut event = AgentEvent::new(EventType::Plan, session_id);
                event.plan_entries = entries.into_iter().map(Into::into).collect();
                state.sink.emit(event);
            }
            SessionUpdate::AvailableCommandsUpdate { available_commands } => {
                let mut event = AgentEvent::new(EventType::AvailableCommands, session_id);
                event.available_commands =
                    available_commands.into_iter().map(Into::into).collect();
                state.sink.emit(event);
            }
            SessionUpdate::CurrentModeUpdate { current_mode_id } => {
                state.sink.emit(
                    AgentEvent::new(EventType::SessionMode, session_id)
                        .with_data("modeId", current_mode_id),
                );
            }
            SessionUpdate::Unknown => debug!(session_id, "ignoring unknown session update"),
        }
    }

    fn handle_permission_request(&self, params: RequestPermissionParams, responder: Responder) {
        let session_id = params.session_id;
        let fields = params.tool_call;
        let id = fields.tool_call_id.clone();

        let handler = {
            let mut state = write_state(&self.state);
            if state.closed {
                drop(state);
                responder.respond(Ok(permission_outcome(&PermissionResponse::cancelled())));
                return;
            }

            // Give downstream a tool-call record the permission can update.
            if let Some(call) = state.pending.get_mut(&id) {
                call.status = ToolStatus::PendingPermission;
                let event = Self::tool_event(EventType::ToolUpdate, &session_id, &id, call);
                state.sink.emit(event);
            } else {
                let call = self.new_call(&fields, ToolStatus::PendingPermission);
                if state.seen_tool_calls.insert(id.clone()) {
                    state
                        .sink
                        .emit(Self::tool_event(EventType::ToolCall, &session_id, &id, &call));
                    state.pending.insert(&id, call);
                } else {
                    state
                        .sink
                        .emit(Self::tool_event(EventType::ToolUpdate, &session_id, &id, &call));
                }
            }
            state.permission_handler.clone()
        };

        let options: Vec<_> = params.options.into_iter().map(Into::into).collect();
        let Some(handler) = handler else {
            let decision = default_decision(&options);
            debug!(
                session_id = session_id.as_str(),
                tool_call_id = id.as_str(),
                option_id = decision.option_id.as_str(),
                "no permission handler, applying default decision"
            );
            responder.respond(Ok(permission_outcome(&decision)));
            return;
        };

        let request = PermissionRequest {
            session_id,
            tool_call_id: Some(id),
            pending_id: match responder.id() {
                Value::String(id) => id.clone(),
                other => other.to_string(),
            },
            title: fields
                .title
                .clone()
                .unwrap_or_else(|| String::from("Permission requested")),
            action_type: fields
                .kind
                .clone()
                .or_else(|| fields.tool_name().map(str::to_owned))
                .unwrap_or_else(|| String::from("other")),
            action_details: fields.raw_input.clone().unwrap_or(Value::Null),
            options,
        };

        tokio::spawn(async move {
            let pending_id = request.pending_id.clone();
            let decision = handler(request).await.unwrap_or_else(|e| {
                warn!(
                    pending_id = pending_id.as_str(),
                    error = %e,
                    "permission handler failed, cancelling"
                );
                PermissionResponse::cancelled()
            });
            responder.respond(Ok(permission_outcome(&decision)));
        });
    }
}

/// Copy diffs already synthesized for `previous` onto matching mutations of
/// `next` that have none.
fn carry_over_diffs(previous: &NormalizedPayload, next: &mut NormalizedPayload) {
    let (NormalizedPayload::ModifyFile(old), NormalizedPayload::ModifyFile(new)) =
        (previous, next)
    else {
        return;
    };
    for (before, after) in old.mutations.iter().zip(&mut new.mutations) {
        if after.diff.is_none() {
            after.diff.clone_from(&before.diff);
        }
    }
}

impl InboundHandler for AcpShared {
    fn on_notification(&self, method: &str, params: Value) {
        if method != METHOD_SESSION_UPDATE {
            debug!(method, "ignoring unknown acp notification");
            return;
        }
        match serde_json::from_value::<SessionNotification>(params) {
            Ok(notification) => self.handle_session_update(notification),
            Err(e) => warn!(error = %e, "malformed session/update, skipping"),
        }
    }

    fn on_request(&self, method: &str, params: Value, responder: Responder) {
        if method != METHOD_REQUEST_PERMISSION {
            debug!(method, "answering unsupported client method");
            responder.respond(Err(RpcError::method_not_found(method)));
            return;
        }
        match serde_json::from_value::<RequestPermissionParams>(params) {
            Ok(params) => self.handle_permission_request(params, responder),
            Err(e) => {
                warn!(error = %e, "malformed permission request");
                responder.respond(Err(RpcError::new(INVALID_PARAMS, e.to_string())));
            }
        }
    }

    fn on_disconnect(&self) {
        if !read_state(&self.state).closed {
            info!("acp agent stream ended");
        }
    }
}
