// crates/stepcli/src/main.rs

mod render;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use stepactions::GatewayCall;
use stepcore::{
    CleanupHandler, GatewayConfig, StepSpec, Value, WorkflowDef, WorkflowResult,
};
use stepruntime::{ActionRegistry, ProcessHooks, RuntimeConfig, StepRuntime};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "steprun")]
#[command(about = "Sequential provisioning and transaction runner", long_about = None)]
struct Cli {
    /// Show debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow file
    Run {
        /// Path to workflow JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Inputs for the first step as a JSON object
        #[arg(short, long)]
        input: Option<String>,

        /// Gateway base URL, overriding the workflow settings
        #[arg(long)]
        gateway: Option<String>,

        /// Timeout for steps that do not set their own
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Validate a workflow file
    Validate {
        /// Path to workflow JSON file
        file: PathBuf,
    },

    /// List available action types
    Actions,

    /// Create an example provisioning workflow
    Init {
        /// Output file path
        #[arg(short, long, default_value = "workflow.json")]
        output: PathBuf,
    },

    /// Submit a single chaincode transaction
    Invoke(CallArgs),

    /// Query chaincode state
    Query(CallArgs),
}

#[derive(Args)]
struct CallArgs {
    /// Organization of the calling user
    #[arg(long)]
    org: String,

    /// Chaincode function name
    #[arg(long)]
    function: String,

    /// Arguments as a JSON array
    #[arg(long, default_value = "[]")]
    args: String,

    /// Calling user
    #[arg(long, default_value = "admin")]
    user: String,

    /// Gateway base URL
    #[arg(long)]
    gateway: Option<String>,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_level))
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let code = match cli.command {
        Commands::Run { file, input, gateway, timeout_ms } => {
            run_workflow(&file, input, gateway, timeout_ms).await?
        }

        Commands::Validate { file } => {
            validate_workflow(&file)?;
            0
        }

        Commands::Actions => {
            list_actions();
            0
        }

        Commands::Init { output } => {
            create_example_workflow(&output)?;
            0
        }

        Commands::Invoke(args) => call_chaincode(GatewayCall::Invoke, args).await?,

        Commands::Query(args) => call_chaincode(GatewayCall::Query, args).await?,
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

fn load_workflow(file: &Path) -> Result<WorkflowDef> {
    WorkflowDef::load(file).with_context(|| format!("loading {}", file.display()))
}

fn build_registry(gateway: &GatewayConfig) -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    stepactions::register_all(&mut registry, gateway);
    registry
}

/// Parse a JSON object into step inputs
fn parse_inputs(input: Option<String>) -> Result<HashMap<String, Value>> {
    let Some(input_str) = input else {
        return Ok(HashMap::new());
    };

    match serde_json::from_str(&input_str)? {
        serde_json::Value::Object(obj) => Ok(obj
            .into_iter()
            .map(|(k, v)| (k, Value::from_plain_json(v)))
            .collect()),
        _ => bail!("Input must be a JSON object"),
    }
}

/// Run a workflow with console progress; the event listener is the
/// resource the cleanup handler releases.
async fn execute_with_progress(
    runtime: &StepRuntime,
    workflow: &WorkflowDef,
    inputs: HashMap<String, Value>,
) -> Result<WorkflowResult> {
    let listening = CancellationToken::new();
    let printer = tokio::spawn(render::print_events(
        runtime.subscribe_events(),
        listening.clone(),
    ));

    let stop_listening = listening.clone();
    let cleanup = CleanupHandler::new(move || stop_listening.cancel());

    let result = runtime.execute(workflow, cleanup, inputs).await;
    printer.await?;

    Ok(result?)
}

async fn run_workflow(
    file: &Path,
    input: Option<String>,
    gateway_url: Option<String>,
    timeout_ms: Option<u64>,
) -> Result<i32> {
    println!("🚀 Loading workflow from: {}", file.display());

    let workflow = load_workflow(file)?;
    let inputs = parse_inputs(input)?;

    let mut gateway = workflow.settings.gateway.clone().unwrap_or_default();
    if let Some(url) = gateway_url {
        gateway.url = url;
    }

    println!("📋 Workflow: {}", workflow.name);
    println!("   Steps: {}", workflow.steps.len());
    println!("   Gateway: {}", gateway.url);
    println!();

    let config = RuntimeConfig {
        default_timeout_ms: timeout_ms,
        ..RuntimeConfig::default()
    };
    let runtime = StepRuntime::with_registry(Arc::new(build_registry(&gateway)), config)
        .with_hooks(ProcessHooks::install());

    let result = execute_with_progress(&runtime, &workflow, inputs).await?;

    match &result {
        WorkflowResult::Success(output) => {
            render::banner("WORKFLOW COMPLETE");
            render::print_outputs(output);
        }
        WorkflowResult::Failure(failure) => {
            render::banner(&format!("WORKFLOW FAILED AT '{}': {}", failure.step, failure.error));
        }
    }

    Ok(result.exit_code())
}

/// One-step workflow around a single gateway call
async fn call_chaincode(call: GatewayCall, args: CallArgs) -> Result<i32> {
    let call_args = Value::from_plain_json(
        serde_json::from_str(&args.args).context("--args must be JSON")?,
    );
    if call_args.as_list().is_none() {
        bail!("--args must be a JSON array");
    }

    let mut gateway = GatewayConfig::default();
    if let Some(url) = args.gateway {
        gateway.url = url;
    }

    let mut workflow = WorkflowDef::new(format!("{} {}", call.action_type(), args.function));
    workflow.add_step(
        StepSpec::new(args.function.clone(), call.action_type())
            .with_config("org", args.org)
            .with_config("user", args.user)
            .with_config("function", args.function.clone())
            .with_config("args", call_args)
            .terminal(),
    );

    let runtime = StepRuntime::with_registry(
        Arc::new(build_registry(&gateway)),
        RuntimeConfig::default(),
    )
    .with_hooks(ProcessHooks::install());

    let result = execute_with_progress(&runtime, &workflow, HashMap::new()).await?;

    if let WorkflowResult::Success(output) = &result {
        match output.get(call.output_key()) {
            Some(value) if call == GatewayCall::Query => println!("VALUE: {}", value),
            Some(value) => println!("{} SUCCEEDED: {}", args.function, value),
            None => println!("{} SUCCEEDED", args.function),
        }
    }

    Ok(result.exit_code())
}

fn validate_workflow(file: &Path) -> Result<()> {
    println!("🔍 Validating workflow: {}", file.display());

    let workflow = load_workflow(file)?;
    let gateway = workflow.settings.gateway.clone().unwrap_or_default();
    let runtime = StepRuntime::with_registry(
        Arc::new(build_registry(&gateway)),
        RuntimeConfig::default(),
    );

    // Building instantiates every action and checks its config.
    runtime.build_steps(&workflow)?;

    println!("✅ Workflow is valid:");
    println!("   Name: {}", workflow.name);
    for (index, step) in workflow.steps.iter().enumerate() {
        let marker = if step.terminal { " (terminal)" } else { "" };
        println!("   {}. {} [{}]{}", index + 1, step.name, step.action_type, marker);
    }

    Ok(())
}

fn list_actions() {
    println!("📦 Available Action Types:");
    println!();

    let registry = build_registry(&GatewayConfig::default());

    for action_type in registry.list_action_types() {
        match registry.get_metadata(&action_type) {
            Some(metadata) => {
                println!("  • {} ({})", action_type, metadata.category);
                println!("    {}", metadata.description);
                for field in &metadata.config {
                    let required = if field.required { " (required)" } else { "" };
                    println!("      - {}{}: {}", field.name, required, field.description);
                }
            }
            None => println!("  • {}", action_type),
        }
    }
}

fn create_example_workflow(output: &Path) -> Result<()> {
    let gateway = GatewayConfig::default();
    let mut workflow = WorkflowDef::new("Provision channel and chaincode")
        .with_description("Create the channel, join peers, install and instantiate chaincode, then query it");
    workflow.settings.gateway = Some(gateway.clone());

    workflow.add_step(
        StepSpec::new("Channel creation", "shell.exec")
            .with_config("command", "peer")
            .with_config("args", vec![
                "channel", "create", "-c", gateway.channel.as_str(), "-f", "channel-artifacts/channel.tx",
            ])
            .with_timeout(60_000),
    );
    workflow.add_step(
        StepSpec::new("Channel join", "shell.exec")
            .with_config("command", "peer")
            .with_config("args", vec!["channel", "join", "-b", "fullchannel.block"])
            .with_timeout(60_000),
    );
    workflow.add_step(
        StepSpec::new("Chaincode install", "shell.exec")
            .with_config("command", "peer")
            .with_config("args", vec![
                "chaincode", "install", "-n", gateway.chaincode_id.as_str(),
                "-v", gateway.chaincode_version.as_str(), "-p", "../chaincode",
            ])
            .with_timeout(120_000),
    );
    workflow.add_step(
        StepSpec::new("Chaincode instantiate", "gateway.invoke")
            .with_config("org", "appdevorg")
            .with_config("function", "init")
            .with_config("args", vec![
                "1000", "1111", "1111", "0.1", "1000", "2222", "2222", "1.00", "2020-06-01", "1000",
            ])
            .with_timeout(120_000),
    );
    workflow.add_step(
        StepSpec::new("Chaincode query", "gateway.query")
            .with_config("org", "appdevorg")
            .with_config("function", "ListBankAccounts")
            .terminal(),
    );

    let json = workflow.to_json_pretty()?;
    std::fs::write(output, json)
        .with_context(|| format!("writing {}", output.display()))?;

    println!("✨ Created example workflow: {}", output.display());
    println!();
    println!("Run it with:");
    println!("  steprun run --file {}", output.display());

    Ok(())
}
