use crate::config::HandConfig;
use crate::hand::animator::{Collecting, HandAnimator, HandBoundary};
use crate::hand::HandError;
use crate::input::HandEvent;
use chrono::Local;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Running hand, ticking on a tokio task
pub struct HandHandle {
    event_sender: mpsc::Sender<HandEvent>,
    shutdown_sender: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Result<(), HandError>>>,
}

impl HandHandle {
    /// Creates the hand and starts ticking every `tick_interval_ms`
    pub fn spawn(config: HandConfig, boundary: HandBoundary) -> Result<Self, HandError> {
        info!("Spawning hand with {}ms tick", config.tick_interval_ms);
        let tick = Duration::from_millis(config.tick_interval_ms);
        let hand = HandAnimator::create(config, boundary)?;
        let event_sender = hand.event_sender();
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        let task = tokio::spawn(async move {
            let result = run_hand_loop(hand, tick, shutdown_receiver).await;
            if let Err(e) = &result {
                error!("Hand task terminated with error: {}", e);
            }
            result
        });
        info!("Hand task started");

        Ok(Self {
            event_sender,
            shutdown_sender: Some(shutdown_sender),
            task: Some(task),
        })
    }

    /// Sender into the hand's event queue
    pub fn event_sender(&self) -> mpsc::Sender<HandEvent> {
        self.event_sender.clone()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stops the tick loop and deactivates the hand
    pub async fn shutdown(&mut self) -> Result<(), HandError> {
        info!("Shutting down hand");
        if let Some(sender) = self.shutdown_sender.take() {
            if sender.send(()).is_err() {
                debug!("Hand task already stopped");
            }
        }

        match self.task.take() {
            Some(task) => task
                .await
                .map_err(|e| HandError::TaskError(e.to_string()))?,
            None => Ok(()),
        }
    }
}

async fn run_hand_loop(
    mut hand: HandAnimator<Collecting>,
    tick: Duration,
    mut shutdown_receiver: oneshot::Receiver<()>,
) -> Result<(), HandError> {
    let mut interval_timer = tokio::time::interval(tick);
    let mut last_tick = Instant::now();

    let mut cycles: u64 = 0;
    let mut last_stats_time = Local::now();
    let stats_interval = chrono::Duration::seconds(30);

    info!("Entering hand loop");
    loop {
        tokio::select! {
            _ = interval_timer.tick() => {}
            _ = &mut shutdown_receiver => {
                info!("Shutdown signal received for hand");
                break;
            }
        }

        let now = Instant::now();
        let dt = now - last_tick;
        last_tick = now;

        hand = match hand.run_cycle(dt) {
            Ok(hand) => hand,
            Err(e) => {
                error!("Hand cycle failed: {}", e);
                return Err(e);
            }
        };
        cycles += 1;

        let now = Local::now();
        if now - last_stats_time > stats_interval {
            let elapsed_seconds = (now - last_stats_time).num_seconds().max(1);
            info!(
                "Hand stats: {} cycles in {} seconds ({:.1} cycles/sec), controller {:?}",
                cycles,
                elapsed_seconds,
                cycles as f64 / elapsed_seconds as f64,
                hand.controller_type()
            );
            cycles = 0;
            last_stats_time = now;
        }
    }

    hand.deactivate();
    info!("Hand loop finished");
    Ok(())
}
