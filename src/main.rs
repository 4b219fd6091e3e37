#![forbid(unsafe_code)]

//! `agent-switchboard` — drive one agent subprocess through a single turn.
//!
//! Spawns the agent, wires its stdio into the selected protocol adapter,
//! runs the handshake, opens (or resumes) a session, sends one prompt and
//! prints every [`AgentEvent`] as a JSON line on stdout. Logs go to stderr.

use std::io::Read;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use agent_switchboard::acp::AcpAdapter;
use agent_switchboard::models::event::AgentEvent;
use agent_switchboard::models::permission::{
    default_decision, PermissionFuture, PermissionHandler, PermissionRequest,
};
use agent_switchboard::opencode::OpenCodeAdapter;
use agent_switchboard::{Adapter, AdapterConfig, AppError, Result};

/// Grace period for an agent to exit after its stdin closes.
const EXIT_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum Protocol {
    /// JSON-RPC over stdio (Agent Client Protocol).
    Acp,
    /// `opencode serve` REST + SSE.
    Opencode,
}

#[derive(Debug, Parser)]
#[command(name = "agent-switchboard", about = "Drive coding agents through a uniform adapter", version, long_about = None)]
struct Cli {
    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Spawn an agent, send one prompt and stream its events.
    Run(RunArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Wire protocol the agent speaks.
    #[arg(long, value_enum)]
    protocol: Protocol,

    /// Path to the TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the workspace root sent to the agent.
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Prompt text; read from stdin when omitted.
    #[arg(long)]
    prompt: Option<String>,

    /// Resume this session instead of creating one.
    #[arg(long)]
    load: Option<String>,

    /// Context prepended to the prompt.
    #[arg(long)]
    context: Option<String>,

    /// Agent command and its arguments.
    #[arg(last = true, required = true)]
    command: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(async move {
            match cli.command {
                Commands::Run(args) => run(args).await,
            }
        })
}

async fn run(args: RunArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => AdapterConfig::load_from_path(path)?,
        None => AdapterConfig::default(),
    };
    if let Some(ws) = &args.workspace {
        config.workspace_root = ws
            .canonicalize()
            .map_err(|err| AppError::Config(format!("invalid workspace override: {err}")))?;
    }
    config.validate()?;

    let prompt = match args.prompt {
        Some(prompt) => prompt,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let adapter: Arc<dyn Adapter> = match args.protocol {
        Protocol::Acp => Arc::new(AcpAdapter::new(config.clone())),
        Protocol::Opencode => Arc::new(OpenCodeAdapter::new(config.clone())),
    };

    let mut child = spawn_agent(adapter.as_ref(), &args.command, &config)?;
    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| AppError::Io("agent stdin not captured".into()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::Io("agent stdout not captured".into()))?;
    adapter.connect(Box::new(stdin), Box::new(stdout))?;

    let printer = adapter.updates().map(|mut rx| {
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                print_event(&event);
            }
        })
    });

    adapter.set_permission_handler(Some(auto_permission_handler()));

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, cancelling turn");
            ctrl_c.cancel();
        }
    });

    let outcome = drive(adapter.as_ref(), &args.load, args.context, &prompt, cancel).await;
    if let Err(err) = &outcome {
        error!(%err, "agent run failed");
    }

    adapter.close().await?;
    shutdown_agent(&mut child, adapter.requires_process_kill()).await;
    if let Some(printer) = printer {
        if let Err(err) = printer.await {
            warn!(%err, "event printer task failed");
        }
    }
    outcome
}

async fn drive(
    adapter: &dyn Adapter,
    load: &Option<String>,
    context: Option<String>,
    prompt: &str,
    cancel: CancellationToken,
) -> Result<()> {
    adapter.initialize().await?;
    if let Some(info) = adapter.agent_info() {
        info!(agent = info.name.as_str(), version = info.version.as_str(), "agent ready");
    }

    let session_id = match load {
        Some(session_id) => {
            adapter.load_session(session_id).await?;
            session_id.clone()
        }
        None => adapter.new_session(Vec::new()).await?,
    };
    info!(session_id = session_id.as_str(), "session active");

    if let Some(context) = context {
        adapter.set_pending_context(context);
    }
    adapter.prompt(cancel, prompt, Vec::new()).await
}

fn spawn_agent(adapter: &dyn Adapter, command: &[String], config: &AdapterConfig) -> Result<Child> {
    let (program, rest) = command
        .split_first()
        .ok_or_else(|| AppError::Config("agent command is empty".into()))?;

    let mut cmd = Command::new(program);
    cmd.args(rest)
        .args(adapter.prepare_command_args())
        .envs(adapter.prepare_environment()?)
        .current_dir(&config.workspace_root)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);

    let child = cmd
        .spawn()
        .map_err(|err| AppError::Io(format!("failed to spawn {program}: {err}")))?;
    info!(program = program.as_str(), pid = child.id(), "agent spawned");
    Ok(child)
}

async fn shutdown_agent(child: &mut Child, force: bool) {
    if !force {
        match tokio::time::timeout(EXIT_GRACE, child.wait()).await {
            Ok(Ok(status)) => {
                info!(%status, "agent exited");
                return;
            }
            Ok(Err(err)) => warn!(%err, "waiting for agent failed"),
            Err(_) => warn!("agent did not exit after stdin closed, killing"),
        }
    }
    if let Err(err) = child.kill().await {
        warn!(%err, "failed to kill agent");
    }
}

/// Approve every permission with the first offered option, logging it.
fn auto_permission_handler() -> PermissionHandler {
    Arc::new(|request: PermissionRequest| -> PermissionFuture {
        Box::pin(async move {
            let decision = default_decision(&request.options);
            info!(
                pending_id = request.pending_id.as_str(),
                title = request.title.as_str(),
                option_id = decision.option_id.as_str(),
                "permission granted"
            );
            Ok(decision)
        })
    })
}

fn print_event(event: &AgentEvent) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(err) => warn!(%err, "failed to serialise event"),
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter).with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
