use avatarhand::config;
use avatarhand::hand::{
    AnimationSink, Digit, HandBoundary, HandHandle, InteractionPhase, ObjectId, SharedWeights,
};
use avatarhand::input::{
    AxisButton, BridgeHandle, BridgeSettings, ButtonAlias, ControllerType, EventHub,
    InteractionEdge,
};
use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let hand_config = config::load_or_create().await?;
    info!("Hand config: {:?}", hand_config);

    let hub = Arc::new(EventHub::new());
    let weights = SharedWeights::new();
    let sink: Box<dyn AnimationSink> = Box::new(weights.clone());

    let mut hand = HandHandle::spawn(hand_config, HandBoundary::from_hub(&hub, Some(sink)))
        .map_err(|e| eyre!("Failed to spawn hand: {}", e))?;

    let demo_token = CancellationToken::new();
    let mut demo: Option<JoinHandle<()>> = None;
    let mut bridge = match BridgeHandle::spawn(BridgeSettings::default(), hub.clone()) {
        Ok(bridge) => Some(bridge),
        Err(e) => {
            warn!("Gamepad unavailable ({}), running scripted demo", e);
            demo = Some(tokio::spawn(run_demo(hub.clone(), demo_token.clone())));
            None
        }
    };

    let report_weights = weights.clone();
    let reporter = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        loop {
            interval.tick().await;
            let w = report_weights.weights();
            info!(
                "Weights T:{:.2} I:{:.2} M:{:.2} R:{:.2} P:{:.2}",
                w[Digit::Thumb],
                w[Digit::Index],
                w[Digit::Middle],
                w[Digit::Ring],
                w[Digit::Pinky]
            );
        }
    });

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| eyre!("Failed to wait for Ctrl+C: {}", e))?;
    info!("Ctrl+C received, shutting down");

    reporter.abort();
    demo_token.cancel();
    if let Some(demo) = demo {
        if let Err(e) = demo.await {
            warn!("Demo task failed to join: {}", e);
        }
    }
    if let Some(bridge) = bridge.as_mut() {
        bridge
            .stop()
            .map_err(|e| eyre!("Failed to stop gamepad bridge: {}", e))?;
    }
    hand.shutdown()
        .await
        .map_err(|e| eyre!("Hand shutdown failed: {}", e))?;

    info!("Final weights: {:?}", weights.weights());
    Ok(())
}

/// Replays a short press/touch/grab/use sequence until cancelled
async fn run_demo(hub: Arc<EventHub>, token: CancellationToken) {
    let object = ObjectId(42);
    hub.set_controller_type(ControllerType::SteamVrViveWand);

    let step = Duration::from_millis(600);
    while !token.is_cancelled() {
        hub.button(ButtonAlias::GripPress, 1.0);
        tokio::time::sleep(step).await;
        hub.button(ButtonAlias::GripPress, 0.0);

        for pressure in [0.25, 0.5, 0.75, 1.0, 0.5, 0.0] {
            hub.axis(AxisButton::Trigger, false, pressure);
            tokio::time::sleep(step / 4).await;
        }

        for (phase, edge) in [
            (InteractionPhase::Touch, InteractionEdge::Enter),
            (InteractionPhase::Grab, InteractionEdge::Enter),
            (InteractionPhase::Use, InteractionEdge::Enter),
            (InteractionPhase::Use, InteractionEdge::Exit),
            (InteractionPhase::Grab, InteractionEdge::Exit),
            (InteractionPhase::Touch, InteractionEdge::Exit),
        ] {
            hub.interaction(phase, edge, object);
            tokio::time::sleep(step).await;
        }
    }
    info!("Demo finished");
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
