//! In-process event source
//!
//! [`EventHub`] implements every input boundary trait. Device bridges and
//! tests push raw input into it; the hub fans each event out to the
//! listeners registered for it.

use crate::hand::overrides::{InteractionPhase, ObjectId};
use crate::input::{
    AxisButton, AxisMode, ButtonAlias, ControllerEvents, ControllerType, ControllerTypeQuery,
    HandEvent, InputListener, InteractionEdge, InteractionSource, Subscription,
};
use chrono::Local;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

struct ButtonRegistration {
    alias: ButtonAlias,
    pressed_edge: bool,
    listener: InputListener,
    token: CancellationToken,
}

struct AxisRegistration {
    button: AxisButton,
    mode: AxisMode,
    listener: InputListener,
    token: CancellationToken,
}

struct InteractionRegistration {
    phase: InteractionPhase,
    sender: mpsc::Sender<HandEvent>,
    token: CancellationToken,
}

#[derive(Default)]
struct HubState {
    controller_type: ControllerType,
    buttons: Vec<ButtonRegistration>,
    axes: Vec<AxisRegistration>,
    interactions: Vec<InteractionRegistration>,
}

impl HubState {
    fn prune(&mut self) {
        self.buttons.retain(|r| !r.token.is_cancelled());
        self.axes.retain(|r| !r.token.is_cancelled());
        self.interactions.retain(|r| !r.token.is_cancelled());
    }
}

/// Shared fan-out point between input producers and hands
#[derive(Default)]
pub struct EventHub {
    state: Mutex<HubState>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Event hub state poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Reports new controller hardware to the hands
    pub fn set_controller_type(&self, controller_type: ControllerType) {
        info!("Controller type set to {:?}", controller_type);
        self.lock().controller_type = controller_type;
    }

    /// Emits a press (`pressure > 0`) or release of `alias`
    pub fn button(&self, alias: ButtonAlias, pressure: f32) {
        let pressed = pressure != 0.0;
        let mut state = self.lock();
        state.prune();
        let timestamp = Local::now();
        for registration in state
            .buttons
            .iter()
            .filter(|r| r.alias == alias && r.pressed_edge == pressed)
        {
            deliver(
                &registration.listener.sender,
                HandEvent::Button {
                    target: registration.listener.target,
                    pressure,
                    timestamp,
                },
            );
        }
    }

    /// Emits an analog reading of `button`; `sensed` selects the proximity channel
    pub fn axis(&self, button: AxisButton, sensed: bool, pressure: f32) {
        let mut state = self.lock();
        state.prune();
        let timestamp = Local::now();
        for registration in state
            .axes
            .iter()
            .filter(|r| r.button == button && r.mode.is_sense() == sensed)
        {
            deliver(
                &registration.listener.sender,
                HandEvent::Axis {
                    target: registration.listener.target,
                    pressure,
                    timestamp,
                },
            );
        }
    }

    pub fn interaction(&self, phase: InteractionPhase, edge: InteractionEdge, object: ObjectId) {
        let mut state = self.lock();
        state.prune();
        let timestamp = Local::now();
        for registration in state.interactions.iter().filter(|r| r.phase == phase) {
            deliver(
                &registration.sender,
                HandEvent::Interaction {
                    phase,
                    edge,
                    object,
                    timestamp,
                },
            );
        }
    }

    /// Number of live registrations (buttons, axes, interactions)
    pub fn listener_count(&self) -> usize {
        let mut state = self.lock();
        state.prune();
        state.buttons.len() + state.axes.len() + state.interactions.len()
    }
}

fn deliver(sender: &mpsc::Sender<HandEvent>, event: HandEvent) {
    match sender.try_send(event) {
        Ok(_) => debug!("Event queued for hand"),
        Err(e) => warn!("Failed to queue hand event: {}", e),
    }
}

impl ControllerEvents for EventHub {
    fn subscribe_button(
        &self,
        alias: ButtonAlias,
        pressed_edge: bool,
        listener: InputListener,
    ) -> Subscription {
        debug!(
            "Subscribing {} to {:?} ({})",
            listener.target,
            alias,
            if pressed_edge { "press" } else { "release" }
        );
        let (subscription, token) = Subscription::new();
        self.lock().buttons.push(ButtonRegistration {
            alias,
            pressed_edge,
            listener,
            token,
        });
        subscription
    }

    fn subscribe_axis(
        &self,
        button: AxisButton,
        mode: AxisMode,
        listener: InputListener,
    ) -> Subscription {
        debug!(
            "Subscribing {} to {:?} axis as {:?}",
            listener.target, button, mode
        );
        let (subscription, token) = Subscription::new();
        self.lock().axes.push(AxisRegistration {
            button,
            mode,
            listener,
            token,
        });
        subscription
    }
}

impl InteractionSource for EventHub {
    fn subscribe_interaction(
        &self,
        phase: InteractionPhase,
        sender: mpsc::Sender<HandEvent>,
    ) -> Subscription {
        debug!("Subscribing to {} interactions", phase);
        let (subscription, token) = Subscription::new();
        self.lock().interactions.push(InteractionRegistration {
            phase,
            sender,
            token,
        });
        subscription
    }
}

impl ControllerTypeQuery for EventHub {
    fn controller_type(&self) -> ControllerType {
        self.lock().controller_type
    }
}
