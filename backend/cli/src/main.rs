mod terminal_output;

use std::io::IsTerminal;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use signshuffle_client::{
    select_single, Celebration, HttpGateway, ImageUpload, Orchestrator, OrchestratorConfig,
    RunOutcome,
};
use signshuffle_config::{config_file_path, load_and_prepare, SignShuffleConfig, ValidationReport};
use signshuffle_core::{check, tally, LetterCount, Verdict};
use signshuffle_gateway::{build_router, start_server, GatewayState};
use signshuffle_logging::init_logger;
use signshuffle_oracle::GeminiOracle;

use terminal_output::{
    celebration_banner, format_verdict, format_violation, note_error, note_info, note_success,
    note_warn, progress_bar, stream_write, supports_color,
};

#[derive(Parser)]
#[command(name = "signshuffle")]
#[command(about = "Photograph a sign, get sentences made from its letters")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $SIGNSHUFFLE_CONFIG or ~/.signshuffle/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the oracle gateway server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
        /// Address to bind the HTTP server to
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Upload one image and print the generated sentences with verdicts
    Anagram {
        /// Exactly one JPEG or PNG image
        #[arg(required = true)]
        images: Vec<PathBuf>,
        /// Gateway base URL
        #[arg(short, long)]
        gateway: Option<String>,
    },
    /// Check a sentence against a letter mapping such as '{"A":2,"B":1}'
    Check {
        sentence: String,
        #[arg(short, long)]
        letters: String,
    },
    /// Print the letter mapping of some text
    Tally { text: String },
}

impl Commands {
    /// `check` and `tally` work offline and never read the config file.
    fn reads_config(&self) -> bool {
        matches!(self, Commands::Serve { .. } | Commands::Anagram { .. })
    }
}

/// Load the config for commands that need it; offline commands get defaults.
async fn prepare(command: &Commands, path: &Path) -> Result<(SignShuffleConfig, ValidationReport)> {
    if command.reads_config() {
        load_and_prepare(path).await
    } else {
        Ok((SignShuffleConfig::default(), ValidationReport::default()))
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let path = cli.config.clone().unwrap_or_else(config_file_path);
    let (config, report) = prepare(&cli.command, &path).await?;

    let level = match cli.command {
        Commands::Serve { .. } => config.logging.level.as_str(),
        _ => "warn",
    };
    init_logger(level, config.logging.dir.as_deref());

    match cli.command {
        Commands::Serve { port, bind } => {
            report.log();
            if !report.is_valid() {
                for e in &report.errors {
                    note_error(&e.to_string());
                }
                anyhow::bail!("Invalid configuration in {}", path.display());
            }
            let mut config = config;
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(bind) = bind {
                config.server.bind_address = bind;
            }
            run_server(config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Anagram { images, gateway } => run_anagram(config, images, gateway).await,
        Commands::Check { sentence, letters } => run_check(&sentence, &letters),
        Commands::Tally { text } => {
            println!("{}", serde_json::to_string(&tally(&text))?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_server(config: SignShuffleConfig) -> Result<()> {
    let api_key = config
        .oracle
        .api_key
        .clone()
        .filter(|k| !k.is_empty())
        .context("No oracle API key: set GEMINI_API_KEY or oracle.api_key")?;

    let addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid bind address {}:{}",
                config.server.bind_address, config.server.port
            )
        })?;

    info!(
        model = %config.oracle.model,
        max_upload_bytes = config.upload.policy().max_bytes(),
        "Starting signshuffle gateway"
    );

    let oracle = Arc::new(GeminiOracle::new(api_key).with_base_url(&config.oracle.base_url));
    let state = GatewayState::new(oracle, config.oracle.model.clone())
        .with_policy(config.upload.policy())
        .with_temperature(config.oracle.temperature);

    let router = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    start_server(addr, router).await
}

struct TerminalCelebration {
    color: bool,
}

impl Celebration for TerminalCelebration {
    fn celebrate(&self, _verdicts: &[Verdict]) {
        println!("{}", celebration_banner(self.color));
    }
}

async fn run_anagram(
    config: SignShuffleConfig,
    images: Vec<PathBuf>,
    gateway: Option<String>,
) -> Result<ExitCode> {
    let policy = config.upload.policy();
    let mut uploads = Vec::with_capacity(images.len());
    for path in &images {
        uploads.push(ImageUpload::from_path(path).await?);
    }
    let upload = match select_single(uploads, &policy) {
        Ok(upload) => upload,
        Err(violation) => {
            note_error(&violation.to_string());
            return Ok(ExitCode::FAILURE);
        }
    };

    let url = gateway.unwrap_or(config.client.gateway_url);
    let color = supports_color();
    let orchestrator = Orchestrator::new(
        Arc::new(HttpGateway::new(url.clone())),
        OrchestratorConfig {
            segment_duration: Duration::from_millis(config.client.progress_duration_ms),
            tick: Duration::from_millis(config.client.progress_tick_ms),
            policy,
            ..OrchestratorConfig::default()
        },
    )
    .with_celebration(Arc::new(TerminalCelebration { color }));

    note_info(&format!("Reading {} via {}", upload.filename, url));
    let outcome = upload_with_progress(&orchestrator, upload).await;

    match outcome {
        RunOutcome::Completed(verdicts) => {
            if verdicts.is_empty() {
                note_warn("The oracle proposed no sentences.");
            }
            for verdict in &verdicts {
                println!("{}", format_verdict(verdict, color));
            }
            Ok(ExitCode::SUCCESS)
        }
        RunOutcome::Failed(error) => {
            note_error(&error.to_string());
            Ok(ExitCode::FAILURE)
        }
        RunOutcome::Superseded => Ok(ExitCode::FAILURE),
    }
}

/// Run the upload, redrawing a progress bar on stderr while it is in flight.
async fn upload_with_progress(orchestrator: &Orchestrator, upload: ImageUpload) -> RunOutcome {
    let mut stderr = std::io::stderr();
    if !stderr.is_terminal() {
        return orchestrator.upload(upload).await;
    }

    let store = orchestrator.store();
    let run = orchestrator.upload(upload);
    tokio::pin!(run);
    let mut redraw = tokio::time::interval(Duration::from_millis(100));
    let outcome = loop {
        tokio::select! {
            outcome = &mut run => break outcome,
            _ = redraw.tick() => {
                let bar = progress_bar(store.snapshot().progress);
                let _ = stream_write(&mut stderr, &format!("\r{bar}"));
            }
        }
    };
    let _ = stream_write(&mut stderr, "\r\x1b[2K");
    outcome
}

fn run_check(sentence: &str, letters: &str) -> Result<ExitCode> {
    let reference: LetterCount =
        serde_json::from_str(letters).context("--letters must be a JSON object like {\"A\":2}")?;
    let violations = check(sentence, &reference);
    let verdict = Verdict {
        sentence: sentence.to_string(),
        valid: violations.is_empty(),
    };

    let color = supports_color();
    println!("{}", format_verdict(&verdict, color));
    for violation in &violations {
        println!("   {}", format_violation(violation));
    }
    if verdict.valid {
        note_success(&format!("Fits within {reference}"));
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
