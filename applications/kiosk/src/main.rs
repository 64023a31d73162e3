/// Signage Kiosk - headless slideshow host
use clap::Parser;
use signage_kiosk::{Kiosk, KioskSettings};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "signage-kiosk")]
#[command(about = "Signage Player headless kiosk host", long_about = None)]
struct Cli {
    /// Playlist document ({"items": [...]} or a bare array)
    #[arg(short, long)]
    playlist: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base URL for relative slide locators
    #[arg(long)]
    base_url: Option<String>,

    /// Seconds to run (virtual seconds unless --realtime)
    #[arg(long, default_value_t = 60)]
    run_for: u64,

    /// Follow the wall clock and read operator commands from stdin
    #[arg(long)]
    realtime: bool,

    /// Print the diagnostic log as JSON when done
    #[arg(long)]
    dump_log: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "signage_kiosk=info,signage_playback=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut settings = KioskSettings::load(cli.config.as_deref())?;
    if let Some(path) = cli.playlist {
        settings.playlist.path = Some(path);
    }
    if let Some(base_url) = cli.base_url {
        settings.playlist.base_url = Some(base_url);
    }
    settings.validate()?;

    let playlist = settings.load_playlist()?;
    tracing::info!(
        slides = playlist.len(),
        profile = ?settings.engine.profile,
        "Starting Signage Kiosk"
    );

    let mut kiosk = Kiosk::new(&settings, playlist)?;
    let limit = Duration::from_secs(cli.run_for);
    let report = if cli.realtime {
        kiosk.run_realtime(Some(limit)).await?
    } else {
        kiosk.run_for(limit)
    };

    tracing::info!(
        elapsed = ?report.elapsed,
        slide_changes = report.changes.len(),
        exit_requested = report.exit_requested,
        "Run finished"
    );

    if cli.dump_log {
        println!("{}", serde_json::to_string_pretty(&kiosk.log_entries())?);
    }

    Ok(())
}
