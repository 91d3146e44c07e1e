//! Baton CLI: run and supervise agent workflows from a goal document.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Baton: hand work between agents along a declared flow
#[derive(Parser)]
#[command(name = "baton", version, about = "Baton: hand work between agents along a declared flow")]
pub struct Cli {
    /// Workspace directory holding the goal and `.baton/` state
    #[arg(long, env = "BATON_WORKSPACE", default_value = ".")]
    workspace: PathBuf,

    /// Goal document, relative to the workspace
    #[arg(long, default_value = "GOAL.md")]
    goal: PathBuf,

    /// Agent Runner command line (e.g. "claude -p")
    #[arg(long, env = "BATON_RUNNER")]
    runner: Option<String>,

    /// RPC endpoint handed to agent processes
    #[arg(long, env = "BATON_RPC_URL")]
    rpc_url: Option<String>,

    /// Continuous-mode poll interval in milliseconds
    #[arg(long)]
    poll_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the workflow once, until it completes or needs a human
    Run {
        /// Wait for answers instead of stopping at a question
        #[arg(long)]
        interactive: bool,
    },

    /// Re-run the workflow on goal edits, steering messages and timers (Ctrl-C to stop)
    Continuous,

    /// Print the normalized flow as DOT
    Dag,

    /// Print the workflow state document
    Status,

    /// Send a steering message from the Human Partner
    Steer {
        /// Message text
        message: String,
        /// Recipient (defaults to the coordinator)
        #[arg(long)]
        to: Option<String>,
    },

    /// Answer the pending question, one answer per question
    Answer {
        #[arg(required = true)]
        answers: Vec<String>,
    },

    /// Invoke a tool as an agent. Agent processes inherit their identity
    /// from the runner environment.
    Tool {
        /// Tool name (e.g. "check_inbox")
        name: String,
        /// Calling agent
        #[arg(long, env = "BATON_AGENT", default_value = "coordinator")]
        agent: String,
        /// Calling agent's model variant
        #[arg(long, env = "BATON_MODEL")]
        model: Option<String>,
        /// Tool arguments as a JSON string
        #[arg(long, default_value = "{}")]
        args: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "baton_core=info,baton_cli=info".into()),
        )
        .init();

    let ctx = commands::Context::new(
        &cli.workspace,
        &cli.goal,
        cli.runner.as_deref(),
        cli.rpc_url.as_deref(),
        cli.poll_ms,
    );

    let result = match cli.command {
        Commands::Run { interactive } => commands::run::run(&ctx, interactive).await,
        Commands::Continuous => commands::continuous::run(&ctx).await,
        Commands::Dag => commands::dag::run(&ctx).await,
        Commands::Status => commands::status::run(&ctx).await,
        Commands::Steer { message, to } => commands::steer::run(&ctx, &message, to.as_deref()).await,
        Commands::Answer { answers } => commands::steer::answer(&ctx, &answers).await,
        Commands::Tool {
            name,
            agent,
            model,
            args,
        } => commands::tool::run(&ctx, &name, &agent, model.as_deref(), &args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
