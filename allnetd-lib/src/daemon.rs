use std::time::{Duration, Instant};

use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::dispatch::{DispatchOutcome, DropReason, Dispatcher};
use crate::error::{DaemonError, Result};
use crate::pipes::PipeRegistry;
use crate::scope::Scope;
use crate::social::SocialTable;
use crate::telemetry::{init_metrics, start_metrics_server, Metrics};

/// Run the main loop until a fatal framing error or a shutdown signal.
///
/// On a clean SIGINT/SIGTERM this returns `Ok(())`, which `main.rs` turns
/// into exit code 0. A fatal framing error returns `Err`, which `main.rs`
/// turns into a nonzero exit code.
pub async fn run(mut pipes: PipeRegistry, config: Config) -> Result<()> {
    if pipes.pipe_count() < 3 {
        return Err(DaemonError::NoPipes);
    }

    let social = SocialTable::init(
        config.social.max_bytes,
        config.social.max_checks,
        config.social.contacts_dir.clone(),
    );
    let update_period = Duration::from_secs(config.social.update_secs);

    let metrics = match config.metrics.listen {
        Some(addr) => match init_metrics() {
            Ok((metrics, registry)) => {
                tokio::spawn(async move {
                    if let Err(e) = start_metrics_server(addr, registry).await {
                        error!(error = %e, "metrics server exited");
                    }
                });
                Some(metrics)
            }
            Err(e) => {
                warn!(error = %e, "failed to initialize metrics, continuing without them");
                None
            }
        },
        None => None,
    };

    let mut dispatcher = Dispatcher::new(
        Duration::from_secs(config.duplicate.window_secs),
        config.duplicate.capacity,
        Duration::from_secs(config.trace.grace_secs),
        Duration::from_secs(1),
    );

    let mut next_deadline = social.update(update_period, metrics.as_ref()).await;

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| DaemonError::Fatal(format!("failed to install SIGTERM handler: {e}")))?;

    info!("allnetd main loop starting, {} pipes registered", pipes.pipe_count());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("received SIGINT, shutting down");
                return Ok(());
            }
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
                return Ok(());
            }
            received = pipes.receive_any() => {
                match received {
                    Ok((payload, pipe_id, claimed_priority)) => {
                        if let Some(m) = &metrics {
                            m.packets_received_total.with_label_values(&[&pipe_id.to_string()]).inc();
                        }
                        handle_message(&mut pipes, &mut dispatcher, &social, metrics.as_ref(), payload, pipe_id, claimed_priority).await;
                    }
                    Err((pipe_id, e)) => {
                        return Err(DaemonError::Framing { pipe: pipe_id, reason: e.to_string() });
                    }
                }
            }
        }

        if Instant::now() >= next_deadline {
            next_deadline = social.update(update_period, metrics.as_ref()).await;
        }
    }
}

async fn handle_message(
    pipes: &mut PipeRegistry,
    dispatcher: &mut Dispatcher,
    social: &SocialTable,
    metrics: Option<&Metrics>,
    payload: Vec<u8>,
    pipe_id: usize,
    claimed_priority: u32,
) {
    let is_local = pipe_id == 0 || pipe_id == 1;
    let snapshot = social.current();
    let DispatchOutcome { scope, priority, packet, reason } =
        dispatcher.dispatch(payload, is_local, claimed_priority, &snapshot);

    if reason == DropReason::Duplicate {
        if let Some(m) = metrics {
            m.duplicate_hits_total.inc();
        }
    }

    match scope {
        Scope::Drop => {
            let reason_label = match reason {
                DropReason::Invalid => "invalid",
                DropReason::Duplicate => "duplicate",
                DropReason::ManagementDrop => "management",
                DropReason::None => "unspecified",
            };
            debug!(pipe = pipe_id, reason = reason_label, "dropped");
            if let Some(m) = metrics {
                m.drops_total.with_label_values(&[reason_label]).inc();
            }
        }
        Scope::Local => {
            for target in 0..2.min(pipes.pipe_count()) {
                if !pipes.send(target, &packet, 0).await {
                    warn!(pipe = target, "send failed, pipe no longer valid");
                }
            }
            if let Some(m) = metrics {
                m.forwards_total.with_label_values(&["local"]).inc();
            }
        }
        Scope::All => {
            for target in 0..pipes.pipe_count() {
                if !pipes.send(target, &packet, priority).await {
                    warn!(pipe = target, "send failed, pipe no longer valid");
                }
            }
            if let Some(m) = metrics {
                m.forwards_total.with_label_values(&["all"]).inc();
            }
        }
    }
}
