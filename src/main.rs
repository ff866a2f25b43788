//! # Grounded Research Agent
//!
//! Command-line front end for the iterative research agent: it writes search
//! queries for a question, runs search-grounded research, reflects on gaps,
//! loops with follow-up queries and prints a cited answer.
//!
//! ## Quick Start
//! ```bash
//! GEMINI_API_KEY=... cargo run -- "What is the capital of France?"
//! ```

// =============================================================================
// MODULE DECLARATIONS
// =============================================================================

/// Configuration management
mod config;

/// Backend selection and report formatting
mod agent;

// =============================================================================
// IMPORTS
// =============================================================================
use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use rig_research::{ResearchRequest, RunContext};

use crate::agent::{format_report, Researcher};
use crate::config::{Backend, Config};

// =============================================================================
// CLI ARGUMENTS
// =============================================================================
#[derive(Parser, Debug)]
#[command(
    name = "grounded-research",
    version,
    about = "An iterative research agent that answers questions with cited web sources",
    long_about = r#"
Grounded Research Agent

For each question the agent:
  1. Writes a few diverse web search queries
  2. Runs search-grounded research for every query
  3. Reflects on what is still missing and loops with follow-up queries
  4. Writes a final answer with the cited source URLs

CONFIGURATION (environment or .env):
  GEMINI_API_KEY              API key for the gemini backend
  QUERY_GENERATOR_MODEL       default: gemini-2.0-flash
  REASONING_MODEL             default: gemini-2.5-flash-preview-04-17
  NUMBER_OF_INITIAL_QUERIES   default: 3
  MAX_RESEARCH_LOOPS          default: 2

EXAMPLES:
  grounded-research "What is the capital of France?"
  grounded-research --max-loops 3 --reasoning-model gemini-2.5-pro "State of fusion power"
  grounded-research --backend ollama "Rust async runtimes"
"#
)]
struct Args {
    /// The research question
    #[arg(value_name = "QUESTION")]
    question: String,

    /// Generation backend
    #[arg(short = 'b', long, value_enum, env = "RESEARCH_BACKEND")]
    backend: Option<Backend>,

    /// Reasoning model for reflection and the final answer
    #[arg(short = 'r', long = "reasoning-model")]
    reasoning_model: Option<String>,

    /// Maximum reflection rounds
    #[arg(short = 'l', long = "max-loops")]
    max_loops: Option<usize>,

    /// Number of initial search queries
    #[arg(short = 'n', long = "initial-queries")]
    initial_queries: Option<usize>,

    /// Maximum node invocations for this run
    #[arg(long = "max-iterations")]
    max_iterations: Option<usize>,

    /// Print the final state as JSON instead of the formatted answer
    #[arg(long, default_value = "false")]
    json: bool,

    /// Enable verbose/debug logging
    #[arg(short = 'v', long, default_value = "false")]
    verbose: bool,
}

impl Args {
    fn request(&self) -> ResearchRequest {
        let mut request = ResearchRequest::question(self.question.clone());
        request.reasoning_model = self.reasoning_model.clone();
        request.max_research_loops = self.max_loops;
        request.initial_search_query_count = self.initial_queries;
        request.max_iterations = self.max_iterations;
        request
    }
}

// =============================================================================
// MAIN FUNCTION
// =============================================================================
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose)?;

    info!("Grounded research agent starting up...");

    let mut config = Config::from_env()?;
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    config.validate()?;

    info!(
        backend = ?config.backend,
        query_model = %config.research.query_generator_model,
        reasoning_model = %config.research.reasoning_model,
        "Configuration loaded"
    );

    let researcher = Researcher::new(config)?;

    // Ctrl-C cancels the run; the active node aborts its model call
    let token = CancellationToken::new();
    let ctx = RunContext::with_cancellation_token(token.clone());
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling research");
            token.cancel();
        }
    });

    match researcher.research(&ctx, args.request()).await {
        Ok(state) => {
            if args.json {
                let json = serde_json::to_string_pretty(&state)
                    .context("Failed to serialize the final state")?;
                println!("{}", json);
            } else {
                println!("\n{}", "=".repeat(60));
                println!("RESEARCH RESULTS");
                println!("{}\n", "=".repeat(60));
                println!("{}", format_report(&state));
                println!("{}", "=".repeat(60));
            }
        }
        Err(e) => {
            error!(error = %e, "Research failed");
            eprintln!("\nResearch failed: {:#}", e);

            let message = format!("{:#}", e);
            if message.contains("Unauthorized") {
                eprintln!("\nTip: check GEMINI_API_KEY");
            } else if message.contains("Connection failed") || message.contains("connection refused") {
                eprintln!("\nTip: check network access, or start Ollama with `ollama serve`");
            }

            return Err(e);
        }
    }

    info!(run_id = %ctx.run_id, "Research completed successfully");
    Ok(())
}

// =============================================================================
// LOGGING INITIALIZATION
// =============================================================================
/// Install the global tracing subscriber.
///
/// `RUST_LOG` narrows logging per module; `--verbose` forces DEBUG. Logs go to
/// stderr so `--json` output stays machine-readable.
fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}
