use std::time::Duration;

use tokio::{
    sync::{mpsc::UnboundedSender, watch},
    time::{self, Instant, MissedTickBehavior},
};

const POLL_TIMER_ARMED: &str = "POLL_TIMER_ARMED";
const POLL_TIMER_STOPPED: &str = "POLL_TIMER_STOPPED";

/// Tick delivered by a `PollTimer`, tagged with the arming generation so
/// ticks queued by a cancelled schedule can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTick {
    pub generation: u64,
}

/// Repeating schedule that owns its cancellation.
///
/// Every `arm` cancels the previous schedule and starts a new one whose first
/// tick fires one full period later. Dropping the timer cancels it.
#[derive(Debug)]
pub struct PollTimer {
    tick_tx: UnboundedSender<PollTick>,
    stop_tx: Option<watch::Sender<bool>>,
    generation: u64,
    period: Option<Duration>,
}

impl PollTimer {
    pub fn new(tick_tx: UnboundedSender<PollTick>) -> Self {
        Self {
            tick_tx,
            stop_tx: None,
            generation: 0,
            period: None,
        }
    }

    /// Must be called from within a tokio runtime.
    pub fn arm(&mut self, period: Duration) {
        self.cancel();

        self.generation += 1;
        let (stop_tx, stop_rx) = watch::channel(false);
        tokio::spawn(run_schedule(
            period,
            self.generation,
            self.tick_tx.clone(),
            stop_rx,
        ));

        tracing::debug!(
            code = POLL_TIMER_ARMED,
            generation = self.generation,
            period_ms = period.as_millis() as u64,
            "poll timer armed"
        );

        self.stop_tx = Some(stop_tx);
        self.period = Some(period);
    }

    pub fn cancel(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
        self.period = None;
    }

    /// Period of the active schedule, `None` when cancelled.
    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    /// True when `tick` belongs to the active schedule.
    pub fn is_current(&self, tick: PollTick) -> bool {
        self.stop_tx.is_some() && tick.generation == self.generation
    }
}

impl Drop for PollTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run_schedule(
    period: Duration,
    generation: u64,
    tick_tx: UnboundedSender<PollTick>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    tracing::debug!(code = POLL_TIMER_STOPPED, generation, "poll timer stopped");
                    return;
                }
            }
            _ = interval.tick() => {
                if tick_tx.send(PollTick { generation }).is_err() {
                    return;
                }
            }
        }
    }
}
