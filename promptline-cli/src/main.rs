use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use promptline_core::config::{self, PromptlineConfig};
use promptline_core::http::HttpClient;
use promptline_core::protocol::{BackendMode, Provider};
use promptline_core::session::{Orchestrator, SubmitOutcome};

mod repl;

#[derive(Parser)]
#[command(name = "promptline")]
#[command(author, version, about = "Stream chat answers from an LLM backend", long_about = None)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    /// YAML or JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Interpret a final line that arrives without a trailing newline
    #[arg(long, global = true)]
    flush_trailing_line: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message and print the streamed answer
    Ask {
        message: String,

        #[arg(short, long)]
        system: Option<String>,

        /// nextjs or python
        #[arg(short, long)]
        backend: Option<BackendMode>,

        /// OpenAI or Anthropic
        #[arg(short, long)]
        provider: Option<Provider>,
    },

    /// Interactive session with history
    Chat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => config::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => PromptlineConfig::default(),
    };
    if cli.flush_trailing_line {
        config.stream.flush_trailing_line = true;
    }
    debug!("Using endpoints {:?}", config.endpoints);

    let client = HttpClient::from_config(&config.connection, config.endpoints.clone())?;
    let mut orchestrator = Orchestrator::from_config(client, &config);

    match cli.command {
        Commands::Ask {
            message,
            system,
            backend,
            provider,
        } => {
            if let Some(backend) = backend {
                orchestrator.set_backend_mode(backend)?;
            }
            if let Some(provider) = provider {
                orchestrator.set_provider(provider)?;
            }
            if let Some(system) = system {
                orchestrator.set_system_prompt(system)?;
            }
            orchestrator.set_user_input(message)?;
            ask(&mut orchestrator).await
        }
        Commands::Chat => repl::run(&mut orchestrator).await,
    }
}

async fn ask(orchestrator: &mut Orchestrator<HttpClient>) -> Result<()> {
    let outcome = submit_printing(orchestrator).await;
    match outcome {
        SubmitOutcome::Completed { .. } => Ok(()),
        SubmitOutcome::Rejected(rejection) => bail!(
            "{}",
            orchestrator
                .error_message()
                .unwrap_or_else(|| rejection.to_string())
        ),
        SubmitOutcome::Failed(e) => {
            Err(e).context(orchestrator.error_message().unwrap_or_default())
        }
    }
}

/// Submit the form, echoing tokens to stdout as they arrive
///
/// Echoing stops at the first write error (a closed pipe, for instance); the
/// answer is still streamed to completion and recorded.
pub(crate) async fn submit_printing(orchestrator: &mut Orchestrator<HttpClient>) -> SubmitOutcome {
    let mut echo = Echo::new(std::io::stdout());
    let outcome = orchestrator.submit_with(|token| echo.write(token)).await;
    echo.finish();
    outcome
}

/// Token sink that goes quiet after its writer fails
struct Echo<W: Write> {
    out: W,
    broken: bool,
}

impl<W: Write> Echo<W> {
    fn new(out: W) -> Self {
        Self { out, broken: false }
    }

    fn write(&mut self, token: &str) {
        if self.broken {
            return;
        }
        if let Err(e) = self.out.write_all(token.as_bytes()).and_then(|_| self.out.flush()) {
            debug!("Stopped echoing tokens: {}", e);
            self.broken = true;
        }
    }

    fn finish(mut self) {
        self.write("\n");
    }
}
