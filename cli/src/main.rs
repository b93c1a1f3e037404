//! CLI entrypoint for patchpilot
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use patchpilot_application::use_cases::agent_loop::plan_tools::plan_tool_spec;
use patchpilot_application::{
    AgentLoop, AgentProgressNotifier, ModelClient, NoAgentProgress, PhaseController,
};
use patchpilot_domain::{RunStatus, Severity};
use patchpilot_infrastructure::{
    ConfigLoader, FileConfig, JsonlArtifactRecorder, LocalToolExecutor, ToolContext, ToolLimits,
    create_gateway, default_tool_spec, load_role_prompts,
};
use patchpilot_presentation::{Cli, ConsoleFormatter, ProgressReporter, SimpleProgress};
use std::io::IsTerminal;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // === Configuration ===
    let mut config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref()).context("Failed to load configuration")?
    };
    apply_cli_overrides(&mut config, &cli);

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_deref());
        println!();
        println!(
            "{}",
            toml::to_string_pretty(&config).context("Failed to render configuration")?
        );
        return Ok(ExitCode::SUCCESS);
    }

    let task = read_task(&cli)?;

    let root = config
        .workspace
        .root
        .canonicalize()
        .with_context(|| format!("Workspace not found: {}", config.workspace.root.display()))?;
    let artifacts_dir = config.workspace.artifacts_path(&root);

    let _log_guard = init_logging(
        cli.verbose,
        cli.quiet,
        cli.log_file.then(|| artifacts_dir.join("logs")).as_deref(),
    )?;

    info!(workspace = %root.display(), "Starting patchpilot");

    let catalog = default_tool_spec().merge(&plan_tool_spec());
    let issues = config.validate(&catalog.names());
    let mut fatal = Vec::new();
    for issue in &issues {
        match issue.severity {
            Severity::Warning => warn!("{}", issue.message),
            Severity::Error => fatal.push(issue.message.clone()),
        }
    }
    if !fatal.is_empty() {
        bail!("Invalid configuration:\n  {}", fatal.join("\n  "));
    }

    // === Dependency Injection ===
    let settings = Arc::new(config.to_settings());

    let ctx = ToolContext::new(&root, &artifacts_dir, ToolLimits::from_settings(&settings))
        .context("Failed to prepare the workspace")?;
    let executor = Arc::new(LocalToolExecutor::new(ctx));

    let gateway = create_gateway(&config.model).context("Failed to set up the model provider")?;
    let model = Arc::new(ModelClient::new(gateway).with_config(config.model.model_client_config()));

    let recorder = Arc::new(
        JsonlArtifactRecorder::new(&artifacts_dir)
            .with_context(|| format!("Cannot write artifacts to {}", artifacts_dir.display()))?,
    );

    let progress: Arc<dyn AgentProgressNotifier> = if cli.quiet {
        Arc::new(NoAgentProgress)
    } else if !std::io::stdout().is_terminal() {
        Arc::new(SimpleProgress)
    } else if cli.verbose > 0 {
        Arc::new(ProgressReporter::verbose())
    } else {
        Arc::new(ProgressReporter::new())
    };

    let cancellation = CancellationToken::new();
    let ctrl_c_token = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current step");
            ctrl_c_token.cancel();
        }
    });

    let agent = AgentLoop::new(model, executor, settings)
        .with_recorder(recorder)
        .with_progress(progress)
        .with_cancellation(cancellation);

    let mut controller = PhaseController::new(agent)?;
    if let Some(prompts_dir) = config.workspace.prompts_path(&root) {
        let prompts = load_role_prompts(&prompts_dir)
            .with_context(|| format!("Failed to load role prompts from {}", prompts_dir.display()))?;
        controller = controller.with_role_prompts(prompts);
    }

    // === Run ===
    let report = match cli.phase {
        Some(phase) => controller.run_only(phase, &task).await,
        None => controller.run(&task).await,
    };

    if !cli.quiet {
        println!();
        println!("{}", ConsoleFormatter::format(&report, Some(&artifacts_dir)));
    }

    Ok(match report.status {
        RunStatus::Done => ExitCode::SUCCESS,
        RunStatus::Incomplete => ExitCode::from(2),
        RunStatus::Failed => ExitCode::FAILURE,
    })
}

fn apply_cli_overrides(config: &mut FileConfig, cli: &Cli) {
    if let Some(workspace) = &cli.workspace {
        config.workspace.root = workspace.clone();
    }
    if let Some(provider) = &cli.provider {
        config.model.provider = provider.clone();
    }
    if let Some(model) = &cli.model {
        config.model.name = model.clone();
    }
    if let Some(iterations) = cli.max_coder_iterations {
        config.pipeline.max_coder_iterations = iterations;
    }
}

fn read_task(cli: &Cli) -> Result<String> {
    let task = match (&cli.task, &cli.task_file) {
        (Some(task), _) => task.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read task file {}", path.display()))?,
        (None, None) => bail!("A task is required: pass it as an argument or use --task-file"),
    };
    if task.trim().is_empty() {
        bail!("The task is empty");
    }
    Ok(task.trim().to_string())
}

/// Initialize logging based on verbosity level. `RUST_LOG` wins when set.
fn init_logging(verbose: u8, quiet: bool, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace", // -vvv or more
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "patchpilot.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}
