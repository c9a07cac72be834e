use crate::config::{FingerBindings, HandConfig};
use crate::hand::animation::{AnimationSink, FingerAnimator};
use crate::hand::channel::FingerChannels;
use crate::hand::overrides::{InteractionPhase, OverrideResolver};
use crate::hand::profile::{ProfileChange, ProfileSelector};
use crate::hand::HandError;
use crate::input::{
    AxisButton, AxisMode, ButtonAlias, ControllerEvents, ControllerType, ControllerTypeQuery,
    EventHub, HandEvent, InputListener, InteractionEdge, InteractionSource, Subscription,
};
use statum::{machine, state};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

const EVENT_QUEUE_SIZE: usize = 1000;

/// Events drained from the queue in one tick
#[derive(Debug, Clone, Default)]
pub struct EventBatch {
    pub events: Vec<HandEvent>,
}

/// Everything the hand talks to; any part may be missing
#[derive(Default)]
pub struct HandBoundary {
    pub controller_events: Option<Arc<dyn ControllerEvents>>,
    pub interact_touch: Option<Arc<dyn InteractionSource>>,
    pub interact_grab: Option<Arc<dyn InteractionSource>>,
    pub interact_use: Option<Arc<dyn InteractionSource>>,
    pub controller_type: Option<Arc<dyn ControllerTypeQuery>>,
    pub sink: Option<Box<dyn AnimationSink>>,
}

impl HandBoundary {
    /// Wires every source to one hub
    pub fn from_hub(hub: &Arc<EventHub>, sink: Option<Box<dyn AnimationSink>>) -> Self {
        Self {
            controller_events: Some(hub.clone()),
            interact_touch: Some(hub.clone()),
            interact_grab: Some(hub.clone()),
            interact_use: Some(hub.clone()),
            controller_type: Some(hub.clone()),
            sink,
        }
    }

    fn interaction_source(&self, phase: InteractionPhase) -> Option<&Arc<dyn InteractionSource>> {
        match phase {
            InteractionPhase::Touch => self.interact_touch.as_ref(),
            InteractionPhase::Grab => self.interact_grab.as_ref(),
            InteractionPhase::Use => self.interact_use.as_ref(),
        }
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum HandCycle {
    Collecting,
    Resolving(EventBatch),
    Animating,
}

#[machine]
pub struct HandAnimator<S: HandCycle> {
    config: HandConfig,

    // Live bindings, rewritten by controller profiles
    axis_modes: FingerBindings<AxisMode>,
    axis_buttons: FingerBindings<AxisButton>,

    channels: FingerChannels,
    resolver: OverrideResolver,
    animator: FingerAnimator,
    profiles: ProfileSelector,
    boundary: HandBoundary,
    subscriptions: Vec<Subscription>,

    event_sender: mpsc::Sender<HandEvent>,
    event_receiver: mpsc::Receiver<HandEvent>,
}

impl<S: HandCycle> HandAnimator<S> {
    pub fn config(&self) -> &HandConfig {
        &self.config
    }

    pub fn channels(&self) -> &FingerChannels {
        &self.channels
    }

    pub fn resolver(&self) -> &OverrideResolver {
        &self.resolver
    }

    pub fn animator(&self) -> &FingerAnimator {
        &self.animator
    }

    pub fn axis_modes(&self) -> &FingerBindings<AxisMode> {
        &self.axis_modes
    }

    pub fn axis_buttons(&self) -> &FingerBindings<AxisButton> {
        &self.axis_buttons
    }

    pub fn controller_type(&self) -> ControllerType {
        self.profiles.controller_type()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Sender feeding this hand's queue, for sources outside the boundary
    pub fn event_sender(&self) -> mpsc::Sender<HandEvent> {
        self.event_sender.clone()
    }

    /// Releases every subscription and stops all blends
    ///
    /// The controller type is forgotten, so the next tick detects it again
    /// and re-subscribes.
    pub fn deactivate(&mut self) {
        info!(
            "Deactivating hand, releasing {} subscriptions",
            self.subscriptions.len()
        );
        self.subscriptions.clear();
        self.animator.cancel_all();
        self.profiles.reset();
        self.resolver.reset();
    }

    fn apply_profile_change(&mut self, change: ProfileChange) {
        if let Some(profile) = change.profile {
            info!("Applying {:?} finger profile", change.controller_type);
            self.axis_modes = profile.modes;
            if let Some(button) = profile.three_finger_axis_button {
                debug!("Three-finger axis rebound to {:?}", button);
                self.axis_buttons.three_finger = button;
            }
        }

        self.subscriptions.clear();
        self.subscriptions = self.subscribe_all();
        debug!("Hand holds {} subscriptions", self.subscriptions.len());

        if change.mirror {
            match self.boundary.sink.as_mut() {
                Some(sink) => {
                    info!("Mirroring hand model");
                    sink.mirror_model();
                }
                None => debug!("Mirror requested without an animation sink"),
            }
        }
    }

    fn subscribe_all(&self) -> Vec<Subscription> {
        let mut subscriptions = Vec::new();

        if let Some(events) = &self.boundary.controller_events {
            for (target, alias) in self.config.buttons.iter() {
                if *alias == ButtonAlias::Undefined {
                    continue;
                }
                for pressed_edge in [true, false] {
                    subscriptions.push(events.subscribe_button(
                        *alias,
                        pressed_edge,
                        InputListener {
                            target,
                            sender: self.event_sender.clone(),
                        },
                    ));
                }
            }
            for (target, button) in self.axis_buttons.iter() {
                subscriptions.push(events.subscribe_axis(
                    *button,
                    *self.axis_modes.get(target),
                    InputListener {
                        target,
                        sender: self.event_sender.clone(),
                    },
                ));
            }
        } else {
            debug!("No controller events, finger input disabled");
        }

        for phase in InteractionPhase::ALL {
            if let Some(source) = self.boundary.interaction_source(phase) {
                subscriptions.push(source.subscribe_interaction(phase, self.event_sender.clone()));
            }
        }

        subscriptions
    }
}

impl HandAnimator<Collecting> {
    pub fn create(config: HandConfig, boundary: HandBoundary) -> Result<Self, HandError> {
        config.validate()?;
        info!(
            "Creating hand (auto detect: {}, mirror: {}, snap: {}s)",
            config.auto_detect_controller, config.mirror_model, config.animation_snap_speed
        );

        let (event_sender, event_receiver) = mpsc::channel(EVENT_QUEUE_SIZE);
        let resolver = OverrideResolver::new(
            config.touch_overrides.clone(),
            config.grab_overrides.clone(),
            config.use_overrides.clone(),
        );

        Ok(Self::new(
            config.clone(),
            config.axis_modes,
            config.axis_buttons,
            FingerChannels::new(),
            resolver,
            FingerAnimator::new(config.animation_snap_speed),
            ProfileSelector::new(config.auto_detect_controller, config.mirror_model),
            boundary,
            Vec::new(),
            event_sender,
            event_receiver,
        ))
    }

    /// Detects the controller, then drains queued events
    pub fn collect_events(mut self) -> Result<HandAnimator<Resolving>, HandError> {
        let detected = self.profiles.detect(self.boundary.controller_type.as_deref());
        if let Some(change) = detected {
            self.apply_profile_change(change);
        }

        let mut events = Vec::new();
        loop {
            match self.event_receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    error!("Hand event channel disconnected");
                    return Err(HandError::ChannelError(
                        "Hand event channel disconnected".to_string(),
                    ));
                }
            }
        }

        if !events.is_empty() {
            debug!("Collected {} hand events", events.len());
        }
        Ok(self.transition_with(EventBatch { events }))
    }

    /// Runs one full tick: collect, resolve, animate
    pub fn run_cycle(self, dt: Duration) -> Result<HandAnimator<Collecting>, HandError> {
        let resolving = self.collect_events()?;
        let animating = resolving.resolve_events()?;
        Ok(animating.animate(dt))
    }
}

impl HandAnimator<Resolving> {
    pub fn event_count(&self) -> usize {
        self.get_state_data().map_or(0, |batch| batch.events.len())
    }

    /// Feeds input into the channels, then applies interaction edges
    pub fn resolve_events(mut self) -> Result<HandAnimator<Animating>, HandError> {
        let events = match self.get_state_data() {
            Some(batch) => batch.events.clone(),
            None => Vec::new(),
        };

        for event in &events {
            match event {
                HandEvent::Button {
                    target, pressure, ..
                } => {
                    debug!("{} button pressure {:.2}", target, pressure);
                    self.channels.on_button_event(*target, *pressure);
                }
                HandEvent::Axis {
                    target, pressure, ..
                } => self.channels.on_axis_event(*target, *pressure),
                HandEvent::Interaction { .. } => {}
            }
        }

        for event in &events {
            if let HandEvent::Interaction {
                phase,
                edge,
                object,
                timestamp,
            } = event
            {
                debug!(
                    "{} {:?} at {}",
                    phase,
                    edge,
                    timestamp.format("%H:%M:%S.%3f")
                );
                match edge {
                    InteractionEdge::Enter => {
                        self.resolver.enter(*phase, *object, &mut self.channels)
                    }
                    InteractionEdge::Exit => self.resolver.exit(*phase, *object, &mut self.channels),
                }
            }
        }

        Ok(self.transition())
    }
}

impl HandAnimator<Animating> {
    /// Advances every finger by `dt` and writes the weights
    pub fn animate(mut self, dt: Duration) -> HandAnimator<Collecting> {
        match self.boundary.sink.as_mut() {
            Some(sink) => {
                let modes = self.axis_modes.digit_map();
                self.animator
                    .process(&mut self.channels, &modes, dt.as_secs_f32(), &mut **sink);
            }
            None => debug!("No animation sink, skipping finger pass"),
        }
        self.transition()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::animation::SharedWeights;
    use crate::hand::digit::Digit;

    #[test]
    fn invalid_config_is_rejected() {
        let config = HandConfig {
            tick_interval_ms: 0,
            ..HandConfig::default()
        };
        assert!(matches!(
            HandAnimator::create(config, HandBoundary::default()),
            Err(HandError::InvalidConfig(_))
        ));
    }

    #[test]
    fn no_boundary_runs_as_custom_controller() {
        let hand = HandAnimator::create(HandConfig::default(), HandBoundary::default()).unwrap();
        let hand = hand.run_cycle(Duration::from_millis(10)).unwrap();

        assert_eq!(hand.controller_type(), ControllerType::Custom);
        assert_eq!(hand.subscription_count(), 0);
    }

    #[test]
    fn queued_events_reach_the_channels() {
        let weights = SharedWeights::new();
        let boundary = HandBoundary {
            sink: Some(Box::new(weights.clone())),
            ..HandBoundary::default()
        };
        let hand = HandAnimator::create(HandConfig::default(), boundary).unwrap();
        hand.event_sender()
            .try_send(HandEvent::Axis {
                target: crate::hand::digit::FingerTarget::Digit(Digit::Index),
                pressure: 0.5,
                timestamp: chrono::Local::now(),
            })
            .unwrap();

        let resolving = hand.collect_events().unwrap();
        assert_eq!(resolving.event_count(), 1);
        let hand = resolving.resolve_events().unwrap();
        assert_eq!(hand.channels()[Digit::Index].raw_axis, 0.5);
    }

    #[test]
    fn knuckles_profile_rewrites_live_bindings() {
        let hub = Arc::new(EventHub::new());
        hub.set_controller_type(ControllerType::SteamVrValveKnuckles);
        let hand = HandAnimator::create(
            HandConfig::default(),
            HandBoundary::from_hub(&hub, None),
        )
        .unwrap();

        let hand = hand.run_cycle(Duration::from_millis(10)).unwrap();

        assert_eq!(hand.axis_modes().index, AxisMode::SenseAxis);
        assert_eq!(hand.axis_buttons().three_finger, AxisButton::StartMenu);
        assert_eq!(hand.config().axis_buttons.three_finger, AxisButton::Grip);
        // 3 defined aliases x 2 edges + 6 axes + 3 interaction phases
        assert_eq!(hand.subscription_count(), 15);
        assert_eq!(hub.listener_count(), 15);
    }
}
