use std::sync::Arc;
use std::time::Duration;

use clap::Subcommand;
use saferound_core::checkin::{spawn_monitor, DeepLinkNotifier, LocateNotifier};
use saferound_core::{CheckInHandle, CheckInMonitor, CheckInThresholds, Clock, Config, SystemClock};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use super::{is_quit, print_event, CmdResult};

#[derive(Subcommand)]
pub enum CheckinAction {
    /// Run the dead-man's switch: Enter checks in, q stops
    Watch {
        /// Report the locate hand-off instead of opening the app
        #[arg(long)]
        dry_run: bool,
        /// Seconds between evaluations (defaults to checkin.tick_secs)
        #[arg(long)]
        tick_secs: Option<u64>,
    },
}

/// Stands in for the location app when `--dry-run` is given.
struct ReportNotifier {
    url: String,
}

impl LocateNotifier for ReportNotifier {
    fn notify(&self) -> saferound_core::error::Result<()> {
        eprintln!("LOCATE: would open {}", self.url);
        Ok(())
    }
}

pub async fn run(action: CheckinAction) -> CmdResult {
    match action {
        CheckinAction::Watch { dry_run, tick_secs } => {
            let config = Config::load()?;
            let period = Duration::from_secs(tick_secs.unwrap_or(config.checkin.tick_secs).max(1));
            if dry_run {
                let notifier = ReportNotifier {
                    url: config.locate.app_uri.clone(),
                };
                watch(&config, notifier, period).await
            } else {
                watch(&config, DeepLinkNotifier::from_config(&config.locate), period).await
            }
        }
    }
}

async fn watch<N: LocateNotifier + 'static>(config: &Config, notifier: N, period: Duration) -> CmdResult {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let thresholds = CheckInThresholds::from_config(&config.checkin);
    let handle = CheckInHandle::new(CheckInMonitor::new(clock.now(), thresholds));

    let (tx, mut events) = mpsc::unbounded_channel();
    let task = spawn_monitor(handle.clone(), clock.clone(), notifier, period, tx);
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    eprintln!("Press Enter to check in. Type q + Enter to stop.");

    loop {
        tokio::select! {
            Some(event) = events.recv() => print_event(&event)?,
            line = input.next_line() => match line? {
                Some(line) if is_quit(&line) => break,
                Some(_) => print_event(&handle.check_in(clock.now()))?,
                None => break,
            },
        }
    }

    task.abort();
    Ok(())
}
