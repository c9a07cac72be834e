use avatarhand::config::HandConfig;
use avatarhand::hand::{
    AxisOverrides, Collecting, Digit, HandAnimator, HandBoundary, HandHandle, InteractionPhase,
    ObjectId, OverrideState, SharedWeights,
};
use avatarhand::input::{AxisButton, AxisMode, ButtonAlias, ControllerType, EventHub, InteractionEdge};
use std::sync::Arc;
use std::time::Duration;

const TICK: Duration = Duration::from_millis(25);
const OBJECT: ObjectId = ObjectId(7);

struct Rig {
    hub: Arc<EventHub>,
    weights: SharedWeights,
    hand: Option<HandAnimator<Collecting>>,
}

impl Rig {
    fn new(config: HandConfig, controller: ControllerType) -> Self {
        let hub = Arc::new(EventHub::new());
        hub.set_controller_type(controller);
        let weights = SharedWeights::new();
        let boundary = HandBoundary::from_hub(&hub, Some(Box::new(weights.clone())));
        let hand = HandAnimator::create(config, boundary).unwrap();
        let mut rig = Self {
            hub,
            weights,
            hand: Some(hand),
        };
        rig.tick(1);
        rig
    }

    fn tick(&mut self, cycles: usize) {
        for _ in 0..cycles {
            let hand = self.hand.take().unwrap();
            self.hand = Some(hand.run_cycle(TICK).unwrap());
        }
    }

    /// Enough ticks for any blend to finish and settle
    fn settle(&mut self) {
        self.tick(12);
    }

    fn hand(&self) -> &HandAnimator<Collecting> {
        self.hand.as_ref().unwrap()
    }

    fn hand_mut(&mut self) -> &mut HandAnimator<Collecting> {
        self.hand.as_mut().unwrap()
    }

    fn interact(&mut self, phase: InteractionPhase, edge: InteractionEdge) {
        self.hub.interaction(phase, edge, OBJECT);
        self.settle();
    }

    fn state(&self, digit: Digit) -> OverrideState {
        self.hand().channels()[digit].override_state
    }
}

fn config_with(touch: AxisOverrides, grab: AxisOverrides, use_: AxisOverrides) -> HandConfig {
    HandConfig {
        animation_snap_speed: 0.1,
        touch_overrides: touch,
        grab_overrides: grab,
        use_overrides: use_,
        ..HandConfig::default()
    }
}

#[test]
fn hand_waits_for_a_controller_before_subscribing() {
    let mut rig = Rig::new(HandConfig::default(), ControllerType::Undefined);
    assert_eq!(rig.hand().subscription_count(), 0);
    assert_eq!(rig.hub.listener_count(), 0);

    rig.hub.set_controller_type(ControllerType::SteamVrViveWand);
    rig.tick(1);
    assert_eq!(rig.hand().controller_type(), ControllerType::SteamVrViveWand);
    assert_eq!(rig.hub.listener_count(), 15);
}

#[test]
fn analog_index_follows_the_trigger() {
    let mut rig = Rig::new(HandConfig::default(), ControllerType::SteamVrViveWand);
    assert_eq!(rig.hand().axis_modes().index, AxisMode::Axis);

    for pressure in [0.2, 0.6, 0.35] {
        rig.hub.axis(AxisButton::Trigger, false, pressure);
        rig.tick(1);
        assert_eq!(rig.weights.weight(Digit::Index), pressure);
    }
}

#[test]
fn grip_press_curls_three_fingers() {
    let mut rig = Rig::new(HandConfig::default(), ControllerType::SteamVrGeneric);

    rig.hub.button(ButtonAlias::GripPress, 1.0);
    rig.settle();
    for digit in Digit::THREE_FINGER {
        assert_eq!(rig.weights.weight(digit), 1.0);
    }
    assert_eq!(rig.weights.weight(Digit::Index), 0.0);

    rig.hub.button(ButtonAlias::GripPress, 0.0);
    rig.settle();
    for digit in Digit::THREE_FINGER {
        assert_eq!(rig.weights.weight(digit), 0.0);
    }
}

#[test]
fn touch_round_trip_returns_every_digit_to_free() {
    let config = config_with(
        AxisOverrides::forcing([0.5; 5]),
        AxisOverrides::default(),
        AxisOverrides::default(),
    );
    let mut rig = Rig::new(config, ControllerType::SteamVrGeneric);

    rig.interact(InteractionPhase::Touch, InteractionEdge::Enter);
    for digit in Digit::ALL {
        assert_eq!(rig.weights.weight(digit), 0.5);
        assert_eq!(rig.state(digit), OverrideState::Overriding);
    }

    rig.interact(InteractionPhase::Touch, InteractionEdge::Exit);
    for digit in Digit::ALL {
        assert_eq!(rig.weights.weight(digit), 0.0);
        assert_eq!(rig.state(digit), OverrideState::None);
    }
}

#[test]
fn pressed_finger_is_not_overridden_on_touch() {
    let config = config_with(
        AxisOverrides::forcing([0.5; 5]),
        AxisOverrides::default(),
        AxisOverrides::default(),
    );
    let mut rig = Rig::new(config, ControllerType::SteamVrGeneric);

    rig.hub.button(ButtonAlias::TriggerPress, 1.0);
    rig.settle();
    rig.interact(InteractionPhase::Touch, InteractionEdge::Enter);

    assert_eq!(rig.state(Digit::Index), OverrideState::None);
    assert_eq!(rig.weights.weight(Digit::Index), 1.0);
    assert_eq!(rig.state(Digit::Thumb), OverrideState::Overriding);
}

#[test]
fn grab_while_using_keeps_the_use_pose() {
    let config = config_with(
        AxisOverrides::default(),
        AxisOverrides::forcing([0.75; 5]),
        AxisOverrides::forcing([0.25; 5]),
    );
    let mut rig = Rig::new(config, ControllerType::SteamVrGeneric);

    rig.interact(InteractionPhase::Use, InteractionEdge::Enter);
    rig.interact(InteractionPhase::Grab, InteractionEdge::Enter);

    for digit in Digit::ALL {
        assert_eq!(rig.weights.weight(digit), 0.25);
        assert_eq!(rig.hand().channels()[digit].saved_axis, 0.75);
    }
}

#[test]
fn ungrab_inside_touch_returns_to_the_touch_pose() {
    let config = config_with(
        AxisOverrides::forcing([0.5; 5]),
        AxisOverrides::forcing([1.0; 5]),
        AxisOverrides::default(),
    );
    let mut rig = Rig::new(config, ControllerType::SteamVrGeneric);

    rig.interact(InteractionPhase::Touch, InteractionEdge::Enter);
    rig.interact(InteractionPhase::Grab, InteractionEdge::Enter);
    assert_eq!(rig.weights.weight(Digit::Ring), 1.0);

    rig.interact(InteractionPhase::Grab, InteractionEdge::Exit);
    for digit in Digit::ALL {
        assert_eq!(rig.weights.weight(digit), 0.5);
    }
}

#[test]
fn use_release_holds_until_untouched() {
    let config = config_with(
        AxisOverrides::forcing([0.5; 5]),
        AxisOverrides::default(),
        AxisOverrides::forcing([1.0; 5]),
    );
    let mut rig = Rig::new(config, ControllerType::SteamVrGeneric);

    rig.interact(InteractionPhase::Touch, InteractionEdge::Enter);
    rig.interact(InteractionPhase::Use, InteractionEdge::Enter);
    rig.interact(InteractionPhase::Use, InteractionEdge::Exit);
    assert_eq!(rig.state(Digit::Pinky), OverrideState::HeldReleased);
    assert_eq!(rig.weights.weight(Digit::Pinky), 0.5);

    rig.interact(InteractionPhase::Touch, InteractionEdge::Exit);
    assert_eq!(rig.state(Digit::Pinky), OverrideState::None);
    assert_eq!(rig.weights.weight(Digit::Pinky), 0.0);
}

#[test]
fn ignored_policy_leaves_fingers_free() {
    let mut rig = Rig::new(HandConfig::default(), ControllerType::SteamVrGeneric);
    rig.interact(InteractionPhase::Grab, InteractionEdge::Enter);
    for digit in Digit::ALL {
        assert_eq!(rig.state(digit), OverrideState::None);
    }
    assert!(rig.hand().resolver().is_active(InteractionPhase::Grab));
}

#[test]
fn model_is_mirrored_once() {
    let config = HandConfig {
        mirror_model: true,
        ..HandConfig::default()
    };
    let mut rig = Rig::new(config, ControllerType::OculusTouch);
    assert!(rig.weights.is_mirrored());

    rig.hub.set_controller_type(ControllerType::SteamVrValveKnuckles);
    rig.tick(1);
    assert!(rig.weights.is_mirrored());
}

#[test]
fn deactivation_releases_and_redetects() {
    let mut rig = Rig::new(HandConfig::default(), ControllerType::SteamVrViveWand);
    assert_eq!(rig.hub.listener_count(), 15);

    rig.hand_mut().deactivate();
    assert_eq!(rig.hub.listener_count(), 0);
    assert_eq!(rig.hand().controller_type(), ControllerType::Undefined);

    rig.tick(1);
    assert_eq!(rig.hub.listener_count(), 15);
}

#[test]
fn missing_sink_skips_animation() {
    let hub = Arc::new(EventHub::new());
    hub.set_controller_type(ControllerType::SteamVrGeneric);
    let hand = HandAnimator::create(HandConfig::default(), HandBoundary::from_hub(&hub, None))
        .unwrap();
    let hand = hand.run_cycle(TICK).unwrap();

    hub.button(ButtonAlias::TriggerPress, 1.0);
    let hand = hand.run_cycle(TICK).unwrap();

    assert!(hand.channels()[Digit::Index].pressure_changed);
    assert!(!hand.animator().interpolation(Digit::Index).active);
}

#[tokio::test]
async fn handle_ticks_and_shuts_down() {
    let hub = Arc::new(EventHub::new());
    hub.set_controller_type(ControllerType::SteamVrGeneric);
    let weights = SharedWeights::new();
    let config = HandConfig {
        tick_interval_ms: 5,
        animation_snap_speed: 0.05,
        ..HandConfig::default()
    };

    let mut handle =
        HandHandle::spawn(config, HandBoundary::from_hub(&hub, Some(Box::new(weights.clone()))))
            .unwrap();
    assert!(handle.is_running());

    tokio::time::sleep(Duration::from_millis(50)).await;
    hub.button(ButtonAlias::GripPress, 1.0);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(weights.weight(Digit::Middle), 1.0);

    handle.shutdown().await.unwrap();
    assert!(!handle.is_running());
    assert_eq!(hub.listener_count(), 0);
}
