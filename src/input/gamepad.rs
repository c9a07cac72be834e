//! Gamepad input through gilrs
//!
//! Stands in for a VR controller during development. Pads have no finger
//! sensors, so the mapping is fixed:
//!
//! | Pad                 | Hand input                               |
//! |---------------------|------------------------------------------|
//! | Right trigger (R2)  | `TriggerPress` + `Trigger` axis (plain and sensed) |
//! | Left trigger (L2)   | `GripPress` + `Grip` axis (plain and sensed)       |
//! | South / East        | `ButtonOnePress` / `ButtonTwoPress`      |
//! | North               | `TouchpadTouch`                          |
//! | Left stick click    | `TouchpadPress`                          |
//! | Start               | `StartMenuPress`                         |
//! | West                | touch interaction                        |
//! | Right bumper (R1)   | grab interaction                         |
//! | Left bumper (L1)    | use interaction                          |

use crate::hand::overrides::{InteractionPhase, ObjectId};
use crate::input::{AxisButton, ButtonAlias, ControllerType, EventHub, InteractionEdge};
use chrono::Local;
use gilrs::{Axis, Button, Event, EventType, Gamepad, GamepadId, Gilrs};
use statum::{machine, state};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Clone, Debug)]
pub struct BridgeSettings {
    /// Controller type reported while a pad is connected
    pub controller_type: ControllerType,
    /// Object the interaction buttons act on
    pub object: ObjectId,
    pub poll_interval: Duration,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            controller_type: ControllerType::SteamVrViveWand,
            object: ObjectId(1),
            poll_interval: Duration::from_millis(1),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Failed to initialize gamepad bridge: {0}")]
    InitializationError(String),

    #[error("No gamepad connected")]
    NoGamepad,

    #[error("Bridge thread error: {0}")]
    ThreadError(String),
}

/// What one pad event turns into
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BridgeAction {
    Button(ButtonAlias, f32),
    Axis(AxisButton, f32),
    Interaction(InteractionPhase, InteractionEdge),
}

fn button_alias(button: Button) -> Option<ButtonAlias> {
    match button {
        Button::RightTrigger2 => Some(ButtonAlias::TriggerPress),
        Button::LeftTrigger2 => Some(ButtonAlias::GripPress),
        Button::South => Some(ButtonAlias::ButtonOnePress),
        Button::East => Some(ButtonAlias::ButtonTwoPress),
        Button::North => Some(ButtonAlias::TouchpadTouch),
        Button::LeftThumb => Some(ButtonAlias::TouchpadPress),
        Button::Start => Some(ButtonAlias::StartMenuPress),
        _ => None,
    }
}

fn interaction_phase(button: Button) -> Option<InteractionPhase> {
    match button {
        Button::West => Some(InteractionPhase::Touch),
        Button::RightTrigger => Some(InteractionPhase::Grab),
        Button::LeftTrigger => Some(InteractionPhase::Use),
        _ => None,
    }
}

fn analog_button(button: Button) -> Option<AxisButton> {
    match button {
        Button::RightTrigger2 => Some(AxisButton::Trigger),
        Button::LeftTrigger2 => Some(AxisButton::Grip),
        _ => None,
    }
}

/// Edge of a digital pad button
pub fn map_button(button: Button, pressed: bool) -> Option<BridgeAction> {
    if let Some(alias) = button_alias(button) {
        return Some(BridgeAction::Button(alias, if pressed { 1.0 } else { 0.0 }));
    }
    let edge = if pressed {
        InteractionEdge::Enter
    } else {
        InteractionEdge::Exit
    };
    interaction_phase(button).map(|phase| BridgeAction::Interaction(phase, edge))
}

/// Analog reading of a pad button or axis
pub fn map_analog(button: Option<Button>, axis: Option<Axis>, value: f32) -> Option<BridgeAction> {
    let target = match (button, axis) {
        (Some(button), _) => analog_button(button),
        // Some pads report the triggers as Z axes instead
        (None, Some(Axis::RightZ)) => Some(AxisButton::Trigger),
        (None, Some(Axis::LeftZ)) => Some(AxisButton::Grip),
        _ => None,
    };
    target.map(|target| BridgeAction::Axis(target, value))
}

/// Translates a gilrs event into hand input
pub fn map_event(event: &EventType) -> Option<BridgeAction> {
    match event {
        EventType::ButtonPressed(button, _) => map_button(*button, true),
        EventType::ButtonReleased(button, _) => map_button(*button, false),
        EventType::ButtonChanged(button, value, _) => map_analog(Some(*button), None, *value),
        EventType::AxisChanged(axis, value, _) => map_analog(None, Some(*axis), *value),
        _ => None,
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum BridgeState {
    Initializing,
    Bridging,
}

#[machine]
pub struct GamepadBridge<S: BridgeState> {
    gilrs: Gilrs,
    active_gamepad: Option<GamepadId>,
    settings: BridgeSettings,
    hub: Arc<EventHub>,
}

impl<S: BridgeState> GamepadBridge<S> {
    pub fn settings(&self) -> &BridgeSettings {
        &self.settings
    }
}

impl GamepadBridge<Initializing> {
    pub fn create(settings: BridgeSettings, hub: Arc<EventHub>) -> Result<Self, BridgeError> {
        info!("Initializing gilrs for gamepad bridge");
        let gilrs = Gilrs::new().map_err(|e| {
            error!("Failed to initialize gilrs: {}", e);
            BridgeError::InitializationError(e.to_string())
        })?;
        Ok(Self::new(gilrs, None, settings, hub))
    }

    /// Picks the first connected pad and reports its controller type
    pub fn initialize(mut self) -> Result<GamepadBridge<Bridging>, BridgeError> {
        let gamepads: Vec<(GamepadId, Gamepad<'_>)> = self.gilrs.gamepads().collect();
        let Some((id, gamepad)) = gamepads.first() else {
            warn!("No gamepad connected");
            return Err(BridgeError::NoGamepad);
        };
        info!("Bridging gamepad: {} ({})", gamepad.name(), id);
        self.active_gamepad = Some(*id);
        self.hub.set_controller_type(self.settings.controller_type);
        Ok(self.transition())
    }
}

impl GamepadBridge<Bridging> {
    /// Forwards every pending pad event to the hub
    pub fn poll(&mut self) -> usize {
        let mut forwarded = 0;
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            if self.active_gamepad.is_some_and(|active| active != id) {
                debug!("Skipping event from non-active gamepad: {:?}", id);
                continue;
            }
            match event {
                EventType::Connected => {
                    info!("Gamepad reconnected");
                    self.hub.set_controller_type(self.settings.controller_type);
                }
                EventType::Disconnected => {
                    warn!("Gamepad disconnected");
                    self.hub.set_controller_type(ControllerType::Undefined);
                }
                _ => {}
            }
            if let Some(action) = map_event(&event) {
                self.forward(action);
                forwarded += 1;
            }
        }
        forwarded
    }

    fn forward(&self, action: BridgeAction) {
        match action {
            BridgeAction::Button(alias, pressure) => {
                info!(
                    "{:?} {} at {}",
                    alias,
                    if pressure > 0.0 { "pressed" } else { "released" },
                    Local::now().format("%H:%M:%S.%3f")
                );
                self.hub.button(alias, pressure);
            }
            BridgeAction::Axis(button, value) => {
                self.hub.axis(button, false, value);
                self.hub.axis(button, true, value);
            }
            BridgeAction::Interaction(phase, edge) => {
                info!("{} {:?} from gamepad", phase, edge);
                self.hub.interaction(phase, edge, self.settings.object);
            }
        }
    }

    /// Polls until `token` is cancelled
    pub fn run(mut self, token: CancellationToken) {
        info!("Gamepad bridge running");
        let mut forwarded = 0usize;
        let mut last_log_time = Local::now();
        let log_interval = chrono::Duration::seconds(30);

        while !token.is_cancelled() {
            forwarded += self.poll();

            let now = Local::now();
            if now - last_log_time > log_interval {
                info!(
                    "Gamepad bridge stats: {} events in {} seconds",
                    forwarded,
                    log_interval.num_seconds()
                );
                forwarded = 0;
                last_log_time = now;
            }
            std::thread::sleep(self.settings.poll_interval);
        }
        self.hub.set_controller_type(ControllerType::Undefined);
        info!("Gamepad bridge stopped");
    }
}

/// Bridge running on its own thread
pub struct BridgeHandle {
    token: CancellationToken,
    thread: Option<JoinHandle<()>>,
}

impl BridgeHandle {
    pub fn spawn(settings: BridgeSettings, hub: Arc<EventHub>) -> Result<Self, BridgeError> {
        let bridge = GamepadBridge::create(settings, hub)?.initialize()?;
        let token = CancellationToken::new();
        let thread_token = token.clone();
        let thread = std::thread::Builder::new()
            .name("gamepad-bridge".to_string())
            .spawn(move || bridge.run(thread_token))
            .map_err(|e| BridgeError::ThreadError(e.to_string()))?;
        Ok(Self {
            token,
            thread: Some(thread),
        })
    }

    pub fn stop(&mut self) -> Result<(), BridgeError> {
        self.token.cancel();
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| BridgeError::ThreadError("Bridge thread panicked".to_string())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_edges_map_to_press_alias() {
        assert_eq!(
            map_button(Button::RightTrigger2, true),
            Some(BridgeAction::Button(ButtonAlias::TriggerPress, 1.0))
        );
        assert_eq!(
            map_button(Button::LeftTrigger2, false),
            Some(BridgeAction::Button(ButtonAlias::GripPress, 0.0))
        );
        assert_eq!(map_button(Button::DPadUp, true), None);
    }

    #[test]
    fn bumpers_drive_interactions() {
        assert_eq!(
            map_button(Button::RightTrigger, true),
            Some(BridgeAction::Interaction(
                InteractionPhase::Grab,
                InteractionEdge::Enter
            ))
        );
        assert_eq!(
            map_button(Button::LeftTrigger, false),
            Some(BridgeAction::Interaction(
                InteractionPhase::Use,
                InteractionEdge::Exit
            ))
        );
    }

    #[test]
    fn analog_triggers_become_axes() {
        assert_eq!(
            map_analog(Some(Button::RightTrigger2), None, 0.4),
            Some(BridgeAction::Axis(AxisButton::Trigger, 0.4))
        );
        assert_eq!(
            map_analog(None, Some(Axis::LeftZ), 0.7),
            Some(BridgeAction::Axis(AxisButton::Grip, 0.7))
        );
        assert_eq!(map_analog(None, Some(Axis::LeftStickX), 0.7), None);
        assert_eq!(map_analog(Some(Button::South), None, 1.0), None);
    }
}
