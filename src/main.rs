use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use drowsiness_alert::actuator::{ActuatorChannel, LinkOpener, MemoryOpener, SerialOpener};
use drowsiness_alert::clock::MonotonicClock;
use drowsiness_alert::config::Config;
use drowsiness_alert::constants::SHUTDOWN_POLL_MS;
use drowsiness_alert::debounce::DebounceEngine;
use drowsiness_alert::logging::{init_tracing, LogConfig};
use drowsiness_alert::session::Session;
use drowsiness_alert::source::{BackgroundSource, ScriptedSource};
use tokio::sync::broadcast;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let mut config = Config::from_env();
    if let Some(script) = std::env::args().nth(1) {
        config.replay.script = script;
    }

    init_tracing(&LogConfig::from(&config));
    tracing::info!(?config, "Starting drowsiness-alert");

    let script = match ScriptedSource::open(&config.replay.script) {
        Ok(script) => script,
        Err(e) => {
            tracing::error!(error = %e, script = %config.replay.script, "cannot open signal script");
            return ExitCode::FAILURE;
        }
    };

    let (shutdown_tx, _) = broadcast::channel::<()>(8);
    let mut shutdown_rx = shutdown_tx.subscribe();
    tokio::spawn(shutdown_signal(shutdown_tx.clone()));

    // 读取脚本（尤其是 stdin）可能一直阻塞，放到读取线程上，等待期间照样响应停止信号
    let mut source = match BackgroundSource::spawn(
        script,
        shutdown_tx.subscribe(),
        Duration::from_millis(SHUTDOWN_POLL_MS),
    ) {
        Ok(source) => source,
        Err(e) => {
            tracing::error!(error = %e, "cannot start signal reader");
            return ExitCode::FAILURE;
        }
    };

    // 帧循环是同步的；放到阻塞线程上，异步侧只负责转发停止信号
    let frame_loop = tokio::task::spawn_blocking(move || {
        let mut session = build_session(&config);
        if config.actuator.enabled {
            session.start();
        } else {
            tracing::info!("actuator disabled by configuration");
        }

        let outcome = session.run(&mut source, &mut shutdown_rx);

        if let Some(path) = &config.replay.history_export_path {
            match session.history().export_json(Path::new(path)) {
                Ok(()) => tracing::info!(%path, "state history exported"),
                Err(e) => tracing::error!(error = %e, %path, "failed to export state history"),
            }
        }
        outcome
    });

    let code = match frame_loop.await {
        Ok(Ok(report)) => {
            tracing::info!(frames = report.frames, reason = ?report.reason, "frame loop finished");
            ExitCode::SUCCESS
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "frame loop aborted");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!(error = %e, "frame loop panicked");
            ExitCode::FAILURE
        }
    };

    drop(shutdown_tx);
    tracing::info!("Shutdown complete");
    code
}

fn build_session(config: &Config) -> Session<MonotonicClock> {
    let opener: Box<dyn LinkOpener> = if config.actuator.mock {
        tracing::info!("using in-memory actuator link");
        Box::new(MemoryOpener::new())
    } else {
        Box::new(SerialOpener::new(config.actuator.write_timeout()))
    };
    let channel = ActuatorChannel::new(
        opener,
        config.actuator.endpoint(),
        config.actuator.settle(),
    );
    let engine = DebounceEngine::new(config.detection.threshold());

    Session::new(engine, channel, MonotonicClock::new()).with_frame_rate(config.replay.frame_rate)
}

async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to install SIGTERM handler");
                    let _ = tokio::signal::ctrl_c().await;
                    tracing::info!("Shutdown signal received");
                    let _ = shutdown_tx.send(());
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = sigterm.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("Shutdown signal received");
    let _ = shutdown_tx.send(());
}
