use anyhow::Result;
use chroma_viewer::console::{Console, TerminalConsole, Tone};
use chroma_viewer::db::{ChromaClient, ConnectionInfo};
use chroma_viewer::repl::{self, Interrupt, StdinLines};
use chroma_viewer::session::{PreviewOptions, Session};
use chroma_viewer::{Settings, logging};
use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "chroma-viewer")]
#[command(about = "ChromaDB CLI Viewer", long_about = None)]
struct Cli {
    /// ChromaDB host
    #[arg(long)]
    host: String,
    /// ChromaDB port
    #[arg(long)]
    port: u16,
    /// Username for authentication
    #[arg(long)]
    username: String,
    /// Password for authentication
    #[arg(long)]
    password: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging() {
        eprintln!("Warning: {}", e);
    }

    let mut console = TerminalConsole::stdout();
    match run(cli, &mut console).await {
        Ok(code) => code,
        Err(err) => {
            console.message(&format!("Error: {:#}", err), Tone::Error);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, console: &mut dyn Console) -> Result<ExitCode> {
    // Load settings
    let settings = Settings::load()?;
    debug!(?settings, "loaded settings");

    // Build the client
    let info = ConnectionInfo {
        host: cli.host,
        port: cli.port,
        username: cli.username,
        password: cli.password,
    };
    let client = ChromaClient::new(&info, &settings)?;

    // Make sure the server answers before showing the menu
    if let Err(err) = client.heartbeat().await {
        console.message(&format!("Failed to connect to ChromaDB: {}", err), Tone::Error);
        return Ok(ExitCode::FAILURE);
    }
    info!(host = %info.host, port = info.port, "connected");

    let greeting = match client.version().await {
        Ok(version) => format!("Connected to ChromaDB successfully! (server version {})", version),
        Err(err) => {
            debug!(error = %err, "could not read server version");
            "Connected to ChromaDB successfully!".to_string()
        }
    };
    console.panel(&greeting, Tone::Success);

    // Hand over to the menu until the user leaves
    let session = Session::new(client).with_preview(PreviewOptions::from(&settings));
    let interrupt = Interrupt::listen();
    let mut input = StdinLines::new();
    let exit = repl::run(&session, console, &mut input, &interrupt).await;
    debug!(?exit, "interactive loop finished");

    Ok(ExitCode::SUCCESS)
}
