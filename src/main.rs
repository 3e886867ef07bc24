mod config;
mod core;
mod daemon;
mod enrich;
mod fetch;
mod notify;
mod scheduler;
mod traits;
mod types;
mod utils;
mod wallpaper;
mod worker;

#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::traits::PictureSource;
use crate::types::WallpaperTarget;

fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = PathBuf::from("config.toml");

    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        match args[1].as_str() {
            "--version" | "-V" => {
                println!("apodd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" => {
                println!("apodd {}", env!("CARGO_PKG_VERSION"));
                println!("{}\n", env!("CARGO_PKG_DESCRIPTION"));
                println!("Usage: apodd [COMMAND]\n");
                println!("Commands:");
                println!("  install-service              Install as a system service (launchd/systemd)");
                println!("  fetch-now                    Run one fetch-and-notify cycle immediately");
                println!("  set-wallpaper <TARGET> [DATE]");
                println!("                               Apply the picture as wallpaper; TARGET is");
                println!("                               home, lock, or both; DATE is YYYY-MM-DD");
                println!("                               (default: today)");
                println!("\nOptions:");
                println!("  -h, --help       Print help");
                println!("  -V, --version    Print version");
                return Ok(());
            }
            "install-service" => {
                return daemon::install_service();
            }
            "fetch-now" => {
                let config = AppConfig::load_or_default(&config_path)?;
                return runtime()?.block_on(fetch_now(config));
            }
            "set-wallpaper" => {
                let target = args
                    .get(2)
                    .and_then(|s| WallpaperTarget::parse(s))
                    .ok_or_else(|| {
                        anyhow::anyhow!("Usage: apodd set-wallpaper <home|lock|both> [YYYY-MM-DD]")
                    })?;
                let date = match args.get(3) {
                    Some(raw) => Some(raw.parse::<chrono::NaiveDate>().map_err(|_| {
                        anyhow::anyhow!("Invalid date '{}', expected YYYY-MM-DD", raw)
                    })?),
                    None => None,
                };
                let config = AppConfig::load_or_default(&config_path)?;
                return runtime()?.block_on(set_wallpaper(config, target, date));
            }
            other => {
                eprintln!("Unknown command: '{}'. See apodd --help.", other);
                std::process::exit(1);
            }
        }
    }

    let config = AppConfig::load_or_default(&config_path)?;
    runtime()?.block_on(core::run(config))
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

/// One immediate fetch-and-notify cycle, outside the schedule.
async fn fetch_now(config: AppConfig) -> anyhow::Result<()> {
    let source = Arc::new(fetch::ApodClient::new(&config.apod)?);
    let notifier = Arc::new(notify::NtfyNotifier::new(&config.notify)?);
    let worker = worker::Worker::new(source, notifier);

    let outcome = worker.run_cycle().await;
    println!("Cycle finished: {}", outcome);
    Ok(())
}

async fn set_wallpaper(
    config: AppConfig,
    target: WallpaperTarget,
    date: Option<chrono::NaiveDate>,
) -> anyhow::Result<()> {
    let source = fetch::ApodClient::new(&config.apod)?;
    let pipeline = wallpaper::WallpaperPipeline::new(config.wallpaper)?;

    println!("Fetching picture metadata...");
    let record = source.fetch(date).await?;
    println!("Applying \"{}\" to {} screen(s)...", record.title, target);

    if pipeline.apply(&record, target).await {
        println!("Wallpaper set successfully");
        Ok(())
    } else {
        anyhow::bail!("Failed to set wallpaper")
    }
}
