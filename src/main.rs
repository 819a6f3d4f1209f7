use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use oxidized_extract::{
    config::Config, create_router, cycle::UploadedDocument, utils::init_logger, AppState,
};

#[derive(Parser)]
#[command(name = "oxidized-extract")]
#[command(about = "Ask a language model to pull information out of a document")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server (default)
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run a single extraction cycle against a local file
    Extract {
        /// Document to read
        #[arg(short, long)]
        file: PathBuf,
        /// What to extract from the document
        #[arg(short, long)]
        query: String,
        /// Print the answer fragment by fragment as it arrives
        #[arg(long)]
        stream: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = Config::from_env()?;
    let _log_guard = init_logger(&config.logging);

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            let mut config = config;
            if let Some(port) = port {
                config.server.port = port;
            }
            run_server(config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Extract { file, query, stream } => {
            // The log guard has to drop for the file writer to flush
            match run_extract(config, file, &query, stream).await {
                Ok(()) => Ok(ExitCode::SUCCESS),
                Err(e) => {
                    error!(error = %e, "Extraction failed");
                    eprintln!("{}", e);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    info!("Configuration loaded: {:?}", config.server);

    let state = AppState::new(config.clone())?;
    if !state.cycle.agent().llm().has_credentials() {
        warn!("GEMINI_API_KEY is not set; extraction requests will be refused");
    }

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}

async fn run_extract(
    config: Config,
    file: PathBuf,
    query: &str,
    stream: bool,
) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(&file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let filename = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());
    let document = UploadedDocument::new(filename, bytes);

    let state = AppState::new(config)?;

    if stream {
        let mut cycle = state.cycle.run_streaming(Some(document), query).await?;
        let mut stdout = std::io::stdout();
        while let Some(fragment) = cycle.fragments.next().await {
            write!(stdout, "{}", fragment?)?;
            stdout.flush()?;
        }
        writeln!(stdout)?;
    } else {
        let outcome = state.cycle.run(Some(document), query).await?;
        println!("{}", outcome.answer);
    }

    Ok(())
}
