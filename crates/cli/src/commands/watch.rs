use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};

use crown::{PollOutcome, SessionController, SubscriptionConfig};

use crate::backend::RestSessionClient;
use crate::error::Result;

pub struct WatchOptions {
    pub nickname: String,
    pub interval_ms: u64,
    pub kinesis: Vec<String>,
    pub status_only: bool,
}

pub async fn execute(
    backend: RestSessionClient,
    email: &str,
    password: &str,
    options: WatchOptions,
) -> Result<()> {
    let config = if options.status_only {
        SubscriptionConfig { calm: false, focus: false, accelerometer: false }
    } else {
        SubscriptionConfig::default()
    };
    let controller = SessionController::with_config(backend, config);

    controller.login(email, password).await?;
    controller.select_device(&options.nickname).await?;
    for label in &options.kinesis {
        controller.subscribe_kinesis(label).await?;
    }

    let mut ticker = time::interval(Duration::from_millis(options.interval_ms.max(100)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match controller.poll().await {
                    PollOutcome::Updated(_) => print_line(&controller, &options.kinesis),
                    PollOutcome::Skipped(reason) => {
                        debug!(target: "crown.cli", ?reason, "poll skipped");
                    }
                }
            }
            result = &mut shutdown => {
                if let Err(error) = result {
                    warn!(target: "crown.cli", %error, "signal listener failed");
                }
                break;
            }
        }
    }

    controller.logout().await?;
    Ok(())
}

fn print_line(controller: &SessionController<RestSessionClient>, kinesis: &[String]) {
    let view = controller.view();
    let accel = view.metrics.accelerometer;
    let mut line = format!(
        "{:<12} battery {:>5.1}%  calm {:.2}  focus {:.2}  pitch {:+6.2}  roll {:+6.2}",
        view.status_label, view.battery_percent, view.metrics.calm, view.metrics.focus,
        accel.pitch, accel.roll,
    );
    for label in kinesis {
        if let Some(score) = controller.kinesis_score(label) {
            line.push_str(&format!("  {label} {score:.2}"));
        }
    }
    println!("{line}");
}
