//! injectord — runs the application injector against a replayed manager.
//!
//! Usage: `injectord [inbound-trace]`

use std::path::PathBuf;

use anyhow::Result;

use injector_core::InjectorConfig;
use injector_engine::{AppInjector, Link, MonitorState};
use injector_repo::{FileRepository, RepositoryAccess};

mod report;
mod trace;

use report::RunReport;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = InjectorConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = InjectorConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        InjectorConfig::default()
    });

    let repo = FileRepository::from_config(&config);
    tracing::info!(
        schedule = %repo.schedule_file().display(),
        applications = %config.paths.applications_dir.display(),
        ticks_per_time_unit = config.timing.ticks_per_time_unit,
        "injectord starting"
    );

    let mut link = Link::new();
    if let Some(path) = std::env::args().nth(1).map(PathBuf::from) {
        let packets = trace::load(&path)?;
        tracing::info!(path = %path.display(), packets = packets.len(), "inbound trace loaded");
        for packet in packets {
            link.source.push_packet(packet);
        }
    }

    let mut injector = AppInjector::new(repo, &config);
    let reason = run(&mut injector, &mut link, config.timing.max_ticks);
    tracing::info!(
        reason,
        ticks = injector.ticks(),
        sent = link.sink.packets().len(),
        "injectord stopped"
    );

    RunReport::collect(&injector, &mut link, reason).write(config.report.path.as_deref())
}

/// Tick until `max_ticks`, or, when that is 0, until nothing more can happen.
fn run<R: RepositoryAccess>(injector: &mut AppInjector<R>, link: &mut Link, max_ticks: u64) -> &'static str {
    loop {
        if max_ticks != 0 && injector.ticks() >= max_ticks {
            return "max_ticks";
        }

        link.step(injector);

        if max_ticks != 0 || !link.is_idle() || injector.outstanding_buffers() != 0 {
            continue;
        }
        if injector.is_quiescent() {
            return "schedule_complete";
        }
        if injector.is_stalled() {
            tracing::error!(view = ?injector.view(), "injector stalled on bad input");
            return "stalled";
        }
        if injector.monitor_state() == MonitorState::IdleMonitor && injector.view().is_receiver_idle() {
            tracing::warn!("trace exhausted while waiting for the manager");
            return "trace_exhausted";
        }
    }
}
