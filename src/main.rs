//! lagwire daemon entry point: argument parsing, startup validation, and
//! pipeline wiring.

use clap::Parser;
use lagwire::{
    AuditLog, ConfigHandle, ControlChannel, DelayConfig, DelayRange, Distribution, EventSource,
    Result, Scheduler, VirtualOutput, run_pipeline,
};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

/// Default path of the on-disk audit log.
const AUDIT_LOG_PATH: &str = "event_log.csv";

/// Sentinel for "no control channel".
const CONTROL_DISABLED: &str = "none";

/// Inject artificial latency into a Linux input device.
///
/// Grabs the source device exclusively, delays every event by an interval
/// drawn from the configured range, and re-emits it on a virtual clone.
/// Use the same value for min and max to get a constant delay.
#[derive(Debug, Parser)]
#[command(name = "lagwire", version, about)]
struct Cli {
    /// Path to the input device to delay (e.g. /dev/input/event5)
    device: std::path::PathBuf,

    /// Minimum delay added to key/button events, in milliseconds
    min_click: u64,

    /// Maximum delay added to key/button events, in milliseconds
    max_click: u64,

    /// Minimum delay added to motion events, in milliseconds
    min_move: u64,

    /// Maximum delay added to motion events, in milliseconds
    max_move: u64,

    /// Delay distribution: l = uniform, n = truncated normal
    #[arg(default_value = "l")]
    distribution: String,

    /// Path for the control FIFO, or "none" to disable live reconfiguration
    #[arg(default_value = CONTROL_DISABLED)]
    control: String,

    /// Mean for the truncated normal distribution
    /// (defaults to the midpoint of the click range)
    mean: Option<f64>,

    /// Standard deviation for the truncated normal distribution
    /// (defaults to mean / 20)
    std_dev: Option<f64>,
}

impl Cli {
    /// Build and validate the startup delay configuration.
    fn delay_config(&self) -> Result<DelayConfig> {
        let click = DelayRange::new(self.min_click, self.max_click);
        let motion = DelayRange::new(self.min_move, self.max_move);

        let mean = self
            .mean
            .unwrap_or_else(|| (self.min_click + self.max_click) as f64 / 2.0);
        let std_dev = self.std_dev.unwrap_or(mean / 20.0);

        if mean < click.min as f64 || mean > click.max as f64 {
            return Err(lagwire::Error::InvalidConfig(format!(
                "mean {mean} must lie between min and max click delay [{}, {}]",
                click.min, click.max
            )));
        }

        // Only the first character selects, so "normal" works as well as "n".
        let distribution = match self.distribution.chars().next() {
            Some('n') => Distribution::TruncatedNormal { mean, std_dev },
            Some('l') | None => Distribution::Uniform,
            Some(other) => {
                log::warn!("unknown distribution {other:?}, falling back to uniform");
                Distribution::Uniform
            }
        };

        Ok(DelayConfig {
            click,
            motion,
            distribution,
        })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("lagwire: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let startup = cli.delay_config()?;

    log::info!(
        "click delay: {} - {}, move delay: {} - {}",
        startup.click.min,
        startup.click.max,
        startup.motion.min,
        startup.motion.max
    );
    if let Distribution::TruncatedNormal { mean, std_dev } = startup.distribution {
        log::info!("truncated normal: mean {mean}, std {std_dev}");
    }

    // Grabbing immediately would swallow the release of the Enter keypress
    // that launched us, leaving the terminal with a key stuck down.
    tokio::time::sleep(Duration::from_secs(1)).await;

    let source = EventSource::open(&cli.device)?;
    let output = Arc::new(VirtualOutput::clone_of(source.device())?);

    let config = ConfigHandle::new(startup);

    let control = if cli.control == CONTROL_DISABLED {
        None
    } else {
        let channel = ControlChannel::create(&cli.control)?;
        log::info!("control channel at {}", channel.path().display());
        let _listener = channel.spawn_listener(config.clone());
        Some(channel)
    };

    let audit = Arc::new(AuditLog::new(AUDIT_LOG_PATH));
    let scheduler = Scheduler::new(config, output, audit.clone());

    let (tx, rx) = tokio::sync::mpsc::channel(512);
    let _capture = source.spawn(tx);

    // Registered once, before the loop, so an interrupt arriving at any point
    // from here on is never missed.
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("failed to listen for interrupt: {e}");
            std::future::pending::<()>().await;
        }
        log::info!("interrupt received, shutting down");
    };

    // Runs until ctrl-c or the source device disappears, then persists the
    // audit buffer. Delay tasks still in flight are abandoned; the virtual
    // device drops on return.
    match run_pipeline(rx, scheduler, audit, interrupt).await {
        Ok(count) => log::info!("flushed {count} audit records to {AUDIT_LOG_PATH}"),
        Err(e) => log::error!("{e}"),
    }
    if let Some(channel) = control {
        channel.remove();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(["lagwire"].iter().chain(args).copied())
    }

    #[test]
    fn test_distribution_selects_on_first_letter() {
        let parsed = cli(&["/dev/input/event5", "40", "60", "0", "0", "normal"]);
        assert!(matches!(
            parsed.delay_config().unwrap().distribution,
            Distribution::TruncatedNormal { .. }
        ));

        let parsed = cli(&["/dev/input/event5", "40", "60", "0", "0", "linear"]);
        assert_eq!(
            parsed.delay_config().unwrap().distribution,
            Distribution::Uniform
        );

        // Unknown letter falls back to uniform instead of failing.
        let parsed = cli(&["/dev/input/event5", "40", "60", "0", "0", "x"]);
        assert_eq!(
            parsed.delay_config().unwrap().distribution,
            Distribution::Uniform
        );
    }

    #[test]
    fn test_normal_defaults_to_midpoint_mean() {
        let parsed = cli(&["/dev/input/event5", "40", "60", "0", "0", "n"]);
        match parsed.delay_config().unwrap().distribution {
            Distribution::TruncatedNormal { mean, std_dev } => {
                assert_eq!(mean, 50.0);
                assert_eq!(std_dev, 2.5);
            }
            other => panic!("expected truncated normal, got {other:?}"),
        }
    }

    #[test]
    fn test_mean_outside_click_range_is_fatal() {
        let parsed = cli(&["/dev/input/event5", "40", "60", "0", "0", "n", "none", "100"]);
        assert!(parsed.delay_config().is_err());
    }
}
