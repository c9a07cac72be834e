//! Input boundary of the hand
//!
//! Everything the hand consumes from the outside world goes through the traits
//! in this module:
//!
//! 1. [`ControllerEvents`] - button alias and axis events per finger binding
//! 2. [`InteractionSource`] - touch/grab/use enter and exit events
//! 3. [`ControllerTypeQuery`] - which controller hardware is connected
//!
//! # Architecture
//!
//! ```text
//! Device ──► EventHub ──[HandEvent]──► mpsc ──► HandAnimator
//!  (gilrs)   (listeners)               (1000)    (per tick)
//! ```
//!
//! Listeners are registered with an owned [`Subscription`]; dropping it
//! unregisters the listener.

pub mod event_hub;
pub mod gamepad;

use crate::hand::digit::FingerTarget;
use crate::hand::overrides::{InteractionPhase, ObjectId};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

pub use event_hub::EventHub;
pub use gamepad::{BridgeError, BridgeHandle, BridgeSettings, GamepadBridge};

/// How a finger reads its input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AxisMode {
    /// Pressed/released, blended over the snap time
    #[default]
    Digital,
    /// Analog pressure, written through
    Axis,
    /// Capacitive proximity, written through
    SenseAxis,
}

impl AxisMode {
    pub fn is_sense(self) -> bool {
        self == AxisMode::SenseAxis
    }
}

/// Digital button alias a finger can follow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ButtonAlias {
    Undefined,
    TriggerHairline,
    TriggerTouch,
    TriggerPress,
    TriggerClick,
    GripHairline,
    GripTouch,
    GripPress,
    GripClick,
    TouchpadTouch,
    TouchpadPress,
    ButtonOneTouch,
    ButtonOnePress,
    ButtonTwoTouch,
    ButtonTwoPress,
    StartMenuPress,
}

/// Physical control an axis binding listens to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisButton {
    Trigger,
    Grip,
    Touchpad,
    ButtonOne,
    ButtonTwo,
    StartMenu,
    MiddleFinger,
    RingFinger,
    PinkyFinger,
}

/// Controller hardware family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ControllerType {
    #[default]
    Undefined,
    Custom,
    SimulatorHand,
    SteamVrViveWand,
    SteamVrOculusTouch,
    SteamVrValveKnuckles,
    SteamVrGeneric,
    OculusTouch,
    OculusGamepad,
    DaydreamController,
    WindowsMixedReality,
}

/// Direction of an interaction event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionEdge {
    Enter,
    Exit,
}

/// Event delivered to the hand
#[derive(Debug, Clone)]
pub enum HandEvent {
    Button {
        target: FingerTarget,
        pressure: f32,
        timestamp: DateTime<Local>,
    },
    Axis {
        target: FingerTarget,
        pressure: f32,
        timestamp: DateTime<Local>,
    },
    Interaction {
        phase: InteractionPhase,
        edge: InteractionEdge,
        object: ObjectId,
        timestamp: DateTime<Local>,
    },
}

/// Where a button or axis source delivers events for one binding
#[derive(Debug, Clone)]
pub struct InputListener {
    pub target: FingerTarget,
    pub sender: mpsc::Sender<HandEvent>,
}

/// Owned registration with an event source
///
/// The source sees the registration as cancelled once this handle drops.
#[derive(Debug)]
pub struct Subscription {
    _guard: DropGuard,
}

impl Subscription {
    /// Creates a handle and the token the source keeps alongside its listener
    pub fn new() -> (Self, CancellationToken) {
        let token = CancellationToken::new();
        let subscription = Self {
            _guard: token.clone().drop_guard(),
        };
        (subscription, token)
    }
}

/// Source of button alias and axis events
pub trait ControllerEvents: Send + Sync {
    /// Registers for press (`pressed_edge = true`) or release edges of `alias`
    fn subscribe_button(
        &self,
        alias: ButtonAlias,
        pressed_edge: bool,
        listener: InputListener,
    ) -> Subscription;

    /// Registers for pressure changes of `button` read in `mode`
    fn subscribe_axis(
        &self,
        button: AxisButton,
        mode: AxisMode,
        listener: InputListener,
    ) -> Subscription;
}

/// Source of touch, grab or use interactions
pub trait InteractionSource: Send + Sync {
    fn subscribe_interaction(
        &self,
        phase: InteractionPhase,
        sender: mpsc::Sender<HandEvent>,
    ) -> Subscription;
}

/// Reports the connected controller hardware
pub trait ControllerTypeQuery: Send + Sync {
    fn controller_type(&self) -> ControllerType;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropping_subscription_cancels_token() {
        let (subscription, token) = Subscription::new();
        assert!(!token.is_cancelled());
        drop(subscription);
        assert!(token.is_cancelled());
    }
}
