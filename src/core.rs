use std::sync::Arc;

use chrono::Local;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::daemon;
use crate::fetch::ApodClient;
use crate::notify::NtfyNotifier;
use crate::scheduler::Scheduler;
use crate::worker::{RunState, Worker};

/// Wire everything together and run until shutdown.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let source = Arc::new(ApodClient::new(&config.apod)?);
    let notifier = Arc::new(NtfyNotifier::new(&config.notify)?);
    let worker = Arc::new(Worker::new(source, notifier));

    let (fire_tx, mut fire_rx) = broadcast::channel(8);
    let scheduler = Arc::new(Scheduler::new(
        config.scheduler.hour,
        config.scheduler.minute,
        fire_tx,
    ));

    // Arming on every start is safe: schedule() replaces any prior arm.
    if config.scheduler.enabled {
        scheduler.schedule(Local::now());
    } else {
        warn!("Scheduler disabled by config; daily notifications will not fire");
    }

    let health_state = daemon::HealthState {
        scheduler: scheduler.clone(),
        worker: worker.clone(),
    };
    let bind = config.daemon.health_bind.clone();
    let port = config.daemon.health_port;
    tokio::spawn(async move {
        if let Err(e) = daemon::start_health_server(&bind, port, health_state).await {
            error!("Health server stopped: {}", e);
        }
    });

    info!("apodd running");

    loop {
        tokio::select! {
            event = fire_rx.recv() => match event {
                Ok(event) => {
                    info!(source = %event.source, "Starting daily cycle");
                    let _ = dispatch_cycle(&worker);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped = skipped, "Fire events lagged; continuing");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                scheduler.cancel();
                break;
            }
        }
    }

    Ok(())
}

/// Run a cycle on its own task. A cycle can back off for half an hour
/// between attempts; the caller's event loop must keep servicing fire
/// events and shutdown signals in the meantime.
pub(crate) fn dispatch_cycle(worker: &Arc<Worker>) -> tokio::task::JoinHandle<RunState> {
    let worker = worker.clone();
    tokio::spawn(async move {
        let outcome = worker.run_cycle().await;
        info!(outcome = %outcome, "Daily cycle finished");
        outcome
    })
}
