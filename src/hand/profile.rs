//! Controller profiles
//!
//! Maps the connected controller family to the axis mode of every finger
//! binding. Detection runs each tick; a change of controller type means the
//! hand has to re-subscribe its listeners.

use crate::config::FingerBindings;
use crate::input::{AxisButton, AxisMode, ControllerType, ControllerTypeQuery};
use tracing::{debug, info};

/// Axis modes suited to one controller family
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FingerProfile {
    pub modes: FingerBindings<AxisMode>,
    /// Replacement axis button for the three-finger group
    pub three_finger_axis_button: Option<AxisButton>,
}

pub fn profile_for(controller_type: ControllerType) -> FingerProfile {
    use AxisMode::{Axis, Digital, SenseAxis};

    let modes = match controller_type {
        ControllerType::SteamVrViveWand => FingerBindings {
            index: Axis,
            ..FingerBindings::uniform(Digital)
        },
        ControllerType::OculusTouch | ControllerType::SteamVrOculusTouch => FingerBindings {
            index: Axis,
            three_finger: Axis,
            ..FingerBindings::uniform(Digital)
        },
        ControllerType::SteamVrValveKnuckles => FingerBindings {
            thumb: Digital,
            ..FingerBindings::uniform(SenseAxis)
        },
        _ => FingerBindings::uniform(Digital),
    };

    let three_finger_axis_button = match controller_type {
        ControllerType::SteamVrValveKnuckles => Some(AxisButton::StartMenu),
        _ => None,
    };

    FingerProfile {
        modes,
        three_finger_axis_button,
    }
}

/// Outcome of a detection that saw a new controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileChange {
    pub controller_type: ControllerType,
    /// Profile to apply, `None` when auto detection is off
    pub profile: Option<FingerProfile>,
    /// The model should be mirrored now
    pub mirror: bool,
}

/// Tracks the controller type and decides when a profile applies
#[derive(Debug, Clone)]
pub struct ProfileSelector {
    controller_type: ControllerType,
    auto_detect: bool,
    mirror_pending: bool,
}

impl ProfileSelector {
    pub fn new(auto_detect: bool, mirror_model: bool) -> Self {
        Self {
            controller_type: ControllerType::Undefined,
            auto_detect,
            mirror_pending: mirror_model,
        }
    }

    pub fn controller_type(&self) -> ControllerType {
        self.controller_type
    }

    /// Checks the connected controller
    ///
    /// Returns a change only when a defined controller type differs from the
    /// last one seen. Without a query the hand runs on its configured modes as
    /// a [`ControllerType::Custom`] controller.
    pub fn detect(&mut self, query: Option<&dyn ControllerTypeQuery>) -> Option<ProfileChange> {
        let detected = match query {
            Some(query) => query.controller_type(),
            None => ControllerType::Custom,
        };

        if detected == self.controller_type {
            return None;
        }
        if detected == ControllerType::Undefined {
            debug!("Controller went away, keeping current subscriptions");
            self.controller_type = detected;
            return None;
        }

        info!(
            "Controller changed: {:?} -> {:?}",
            self.controller_type, detected
        );
        self.controller_type = detected;

        let profile = if self.auto_detect && query.is_some() {
            Some(profile_for(detected))
        } else {
            None
        };
        let mirror = std::mem::take(&mut self.mirror_pending);

        Some(ProfileChange {
            controller_type: detected,
            profile,
            mirror,
        })
    }

    /// Forgets the controller so the next activation detects again
    pub fn reset(&mut self) {
        self.controller_type = ControllerType::Undefined;
    }
}
