//! CLI entrypoint for ShardGuard
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser};
use shardguard_application::{
    ConversationLogger, ExecutionGateway, NoConversationLogger, NoProgress, PipelineError,
    PlanningOrchestrator, ProgressNotifier, RunPipelineUseCase, StepExecutor, ToolGatewayPort,
};
use shardguard_domain::{Model, OutputFormat, UserRequest};
use shardguard_infrastructure::{
    ConfigLoader, FileConfig, JsonlConversationLogger, McpToolGateway, build_gateway,
    build_redactor,
};
use shardguard_presentation::{
    Cli, Command, ConsoleFormatter, ProgressReporter, ProviderArg, SimpleProgress,
};
use std::io::IsTerminal;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Exit status when the pipeline ran but at least one step failed.
const EXIT_STEP_FAILURES: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let _log_guard = init_tracing(cli.verbose, cli.log_file.as_deref())?;

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_ref());
        return Ok(ExitCode::SUCCESS);
    }

    let config = load_config(&cli)?;
    ConsoleFormatter::set_color_enabled(config.output.color);

    let Some(command) = cli.command.clone() else {
        Cli::command().print_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    let format: OutputFormat = cli
        .output
        .map(Into::into)
        .or(config.output.format)
        .unwrap_or_default();

    match command {
        Command::Redact {
            text,
            strategy,
            explain,
        } => {
            let text = read_input(text)?;
            let mut redactor = build_redactor(&config.redaction)?;
            if let Some(strategy) = strategy {
                redactor = redactor.with_strategy(strategy.into());
            }
            let redacted = redactor.redact(&text);
            let extraction = explain.then(|| redactor.extract(&text));

            let output = match format {
                OutputFormat::Json => ConsoleFormatter::format_json(&serde_json::json!({
                    "redacted": redacted,
                    "references": extraction.as_ref().map(|e| &e.references),
                })),
                OutputFormat::Pretty => {
                    ConsoleFormatter::format_redaction(&redacted, extraction.as_ref())
                }
            };
            println!("{}", output);
            Ok(ExitCode::SUCCESS)
        }

        Command::ListTools => {
            let tools = McpToolGateway::new(
                config.tool_servers.clone(),
                config.pipeline_params().tool_timeout,
            );
            let registry = tools.list_capabilities().await?;
            let output = match format {
                OutputFormat::Json => ConsoleFormatter::format_json(&registry),
                OutputFormat::Pretty => ConsoleFormatter::format_registry(&registry),
            };
            println!("{}", output);
            Ok(ExitCode::SUCCESS)
        }

        Command::Plan { prompt } => {
            let request = UserRequest::new(read_input(prompt)?)?;
            let pipeline = build_pipeline(&config)?;
            let progress = progress_notifier(cli.quiet);

            let (plan, _registry) = pipeline
                .plan_with_progress(&request, progress.as_ref())
                .await
                .map_err(report_pipeline_error)?;

            // A plan is printed as JSON unless pretty output was asked for.
            let output = match cli.output.map(OutputFormat::from) {
                Some(OutputFormat::Pretty) => ConsoleFormatter::format_plan(&plan),
                _ => ConsoleFormatter::format_json(&plan),
            };
            println!("{}", output);
            Ok(ExitCode::SUCCESS)
        }

        Command::Run { prompt } => {
            let request = UserRequest::new(read_input(prompt)?)?;
            let pipeline = build_pipeline(&config)?;
            let progress = progress_notifier(cli.quiet);

            let report = pipeline
                .execute_with_progress(&request, progress.as_ref())
                .await
                .map_err(report_pipeline_error)?;

            let output = match format {
                OutputFormat::Json => ConsoleFormatter::format_json(&report),
                OutputFormat::Pretty => ConsoleFormatter::format_report(&report),
            };
            println!("{}", output);

            if report.has_failures() {
                Ok(ExitCode::from(EXIT_STEP_FAILURES))
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

/// Install the tracing subscriber; the returned guard must outlive `main`
/// so buffered file logs are flushed.
fn init_tracing(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    match log_file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .with_context(|| format!("Invalid log file path: {}", path.display()))?;
            std::fs::create_dir_all(directory)
                .with_context(|| format!("Cannot create log directory {}", directory.display()))?;

            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
            Ok(None)
        }
    }
}

/// Merge configuration files, then apply CLI overrides and validate.
fn load_config(cli: &Cli) -> Result<FileConfig> {
    let mut config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        if let Some(path) = &cli.config
            && !path.exists()
        {
            bail!("Config file not found: {}", path.display());
        }
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?
    };

    if let Some(provider) = cli.provider {
        config.planner.provider = provider.as_str().to_string();
        config.executor.provider = provider.as_str().to_string();
    }
    if let Some(model) = &cli.model {
        config.planner.model = model.clone();
        config.executor.model = model.clone();
    }
    if let Some(url) = &cli.ollama_url {
        for section in [&mut config.planner, &mut config.executor] {
            if section.provider == ProviderArg::Ollama.as_str() {
                section.base_url = Some(url.clone());
            }
        }
    }

    let errors = config.validate();
    if !errors.is_empty() {
        for error in &errors {
            eprintln!("config error: {}", error);
        }
        bail!("Configuration has {} error(s)", errors.len());
    }

    info!(
        planner = %config.planner.model,
        executor = %config.executor.model,
        tool_servers = config.tool_servers.len(),
        "Configuration loaded"
    );
    Ok(config)
}

fn conversation_logger(config: &FileConfig) -> Arc<dyn ConversationLogger> {
    let Some(path) = &config.logging.conversation_log else {
        return Arc::new(NoConversationLogger);
    };
    match JsonlConversationLogger::new(path) {
        Ok(logger) => {
            info!("Conversation log: {}", logger.path().display());
            Arc::new(logger)
        }
        Err(e) => {
            warn!(
                "Could not open conversation log {}: {}",
                path.display(),
                e
            );
            Arc::new(NoConversationLogger)
        }
    }
}

// === Dependency Injection ===
fn build_pipeline(config: &FileConfig) -> Result<RunPipelineUseCase> {
    let params = config.pipeline_params();
    let logger = conversation_logger(config);

    let redactor = Arc::new(build_redactor(&config.redaction)?);
    let planner = build_gateway(&config.planner)?;
    let executor = build_gateway(&config.executor)?;
    let planner_model = Model::new(config.planner.model.as_str())?;
    let executor_model = Model::new(config.executor.model.as_str())?;

    let tools: Arc<dyn ToolGatewayPort> = Arc::new(McpToolGateway::new(
        config.tool_servers.clone(),
        params.tool_timeout,
    ));

    let orchestrator = PlanningOrchestrator::new(redactor, params.clone())
        .with_conversation_logger(logger.clone());
    let step_executor = StepExecutor::new(executor, executor_model, params.executor_timeout)
        .with_conversation_logger(logger.clone());
    let execution_gateway =
        ExecutionGateway::new(tools.clone(), params.tool_timeout).with_conversation_logger(logger);

    Ok(RunPipelineUseCase::new(
        planner,
        planner_model,
        tools,
        orchestrator,
        step_executor,
        execution_gateway,
    ))
}

fn progress_notifier(quiet: bool) -> Box<dyn ProgressNotifier> {
    if quiet {
        Box::new(NoProgress)
    } else if std::io::stderr().is_terminal() {
        Box::new(ProgressReporter::new())
    } else {
        Box::new(SimpleProgress)
    }
}

/// Use the positional argument, or read all of stdin when it is absent.
fn read_input(arg: Option<String>) -> Result<String> {
    match arg {
        Some(text) => Ok(text),
        None => {
            if std::io::stdin().is_terminal() {
                bail!("No input given. Pass it as an argument or pipe it on stdin.");
            }
            std::io::read_to_string(std::io::stdin()).context("Failed to read stdin")
        }
    }
}

fn report_pipeline_error(error: PipelineError) -> anyhow::Error {
    warn!("Pipeline stopped: {}", error);
    anyhow::Error::new(error)
}
