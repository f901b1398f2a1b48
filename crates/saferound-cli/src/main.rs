use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod hardware;

#[derive(Parser)]
#[command(name = "saferound-cli", version, about = "SafeRound CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write or inspect drink tags (bar side)
    Tag {
        #[command(subcommand)]
        action: commands::tag::TagAction,
    },
    /// Scan a drink tag and validate it against the pacing policy
    Scan(commands::scan::ScanArgs),
    /// Sobriety self-test
    Sobriety {
        #[command(subcommand)]
        action: commands::sobriety::SobrietyAction,
    },
    /// Periodic safety check-in
    Checkin {
        #[command(subcommand)]
        action: commands::checkin::CheckinAction,
    },
    /// Friend groups
    Group {
        #[command(subcommand)]
        action: commands::group::GroupAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Logs go to stderr; stdout carries one JSON event per line.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Tag { action } => commands::tag::run(action).await,
        Commands::Scan(args) => commands::scan::run(args).await,
        Commands::Sobriety { action } => commands::sobriety::run(action).await,
        Commands::Checkin { action } => commands::checkin::run(action).await,
        Commands::Group { action } => commands::group::run(action).await,
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
