use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::Parser;
use gimbal_link::{Poll, ReportKind, Session, SessionPhase};
use tracing::{debug, info, warn};

mod config;
mod hub;
mod smooth;

use config::{FeatureKind, HarnessConfig};
use hub::SimulatedHub;
use smooth::QuatFilter;

#[derive(Parser)]
#[command(name = "gimbal-harness")]
#[command(about = "Drives a session against a simulated motion hub")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "gimbal-harness.toml")]
    config: PathBuf,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "gimbal_link=info,gimbal_harness=info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .init();

    let cli = Cli::parse();

    let config = if cli.config.exists() {
        info!(path = ?cli.config, "Loading configuration");
        HarnessConfig::load(&cli.config)?
    } else {
        info!("No configuration file found, using defaults");
        HarnessConfig::default()
    };

    let hub = SimulatedHub::new(config.hub.fault_rate, config.hub.jitter);
    let mut session = Session::new(hub, config.session.clone());

    let mut opened = false;
    for attempt in 1..=3 {
        match session.open() {
            Ok(()) => {
                opened = true;
                break;
            }
            Err(error) => warn!(attempt, error = %error, "session open failed"),
        }
    }
    if !opened {
        color_eyre::eyre::bail!("could not open the hub session");
    }

    for feature in &config.run.features {
        match feature.report {
            // report on every activity class the hub knows
            FeatureKind::ActivityClassifier => {
                session.enable_activity_classifier(feature.interval_ms, 0x1FF)?
            }
            kind => session.enable(kind.into(), feature.interval_ms)?,
        }
    }
    info!(features = config.run.features.len(), "streams enabled");

    let mut quiet = 0u32;
    let mut updated = 0u32;
    let mut skipped = 0u32;
    let mut faults = 0u32;
    let mut smoother = QuatFilter::new();

    for _ in 0..config.run.polls {
        match session.poll() {
            Ok(Poll::Quiet) => quiet += 1,
            Ok(Poll::Updated(kind)) => {
                updated += 1;
                if kind == ReportKind::RotationVector
                    && let Some(reading) = session.state().rotation_vector
                {
                    let q = smoother.apply([reading.real, reading.i, reading.j, reading.k]);
                    debug!(real = q[0], i = q[1], j = q[2], k = q[3], "orientation");
                }
            }
            Ok(Poll::Skipped) => skipped += 1,
            Err(error) => {
                faults += 1;
                warn!(error = %error, "poll failed");
                if session.phase() != SessionPhase::Ready {
                    return Err(error.into());
                }
            }
        }
        thread::sleep(Duration::from_millis(config.run.poll_interval_ms));
    }

    info!(quiet, updated, skipped, faults, "run finished");

    let state = session.state();
    if let Some(accel) = state.accelerometer {
        info!(x = accel.x, y = accel.y, z = accel.z, "last acceleration");
    }
    if let Some(quat) = state.rotation_vector {
        info!(
            real = quat.real,
            i = quat.i,
            j = quat.j,
            k = quat.k,
            radian_accuracy = quat.radian_accuracy,
            "last orientation"
        );
    }
    if let Some(steps) = state.steps {
        info!(steps, "step count");
    }
    if let Some(activity) = state.activity {
        info!(class = activity.most_likely, "most likely activity");
    }

    Ok(())
}
