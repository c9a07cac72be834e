//! Interaction override policies and the resolver that applies them
//!
//! Touching, grabbing and using an object can force the fingers into a pose.
//! Each phase has its own [`AxisOverrides`] policy; the [`OverrideResolver`]
//! layers them onto the finger channels.
//!
//! ```text
//!               enter (enabled, not pressed, not JustReleased)
//!   None ──────────────────────────────────────────► Overriding
//!    ▲                                                 │
//!    │ settled                     touch/grab exit     │  use exit
//!    └──────────── JustReleased ◄──────────────────────┤
//!                       ▲                              ▼
//!                       └────── touch exit ────── HeldReleased
//! ```

use crate::hand::channel::{FingerChannels, OverrideState};
use crate::hand::digit::{Digit, DigitMap};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Substitute for a zero force value so a forced open hand differs from "no force"
pub const FORCED_ZERO: f32 = 0.0001;

/// Interaction phase that can impose a finger pose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionPhase {
    Touch,
    Grab,
    Use,
}

impl InteractionPhase {
    pub const ALL: [InteractionPhase; 3] = [
        InteractionPhase::Touch,
        InteractionPhase::Grab,
        InteractionPhase::Use,
    ];

    const fn slot(self) -> usize {
        match self {
            InteractionPhase::Touch => 0,
            InteractionPhase::Grab => 1,
            InteractionPhase::Use => 2,
        }
    }
}

impl fmt::Display for InteractionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InteractionPhase::Touch => write!(f, "Touch"),
            InteractionPhase::Grab => write!(f, "Grab"),
            InteractionPhase::Use => write!(f, "Use"),
        }
    }
}

/// Identity of the interactable object carried by interaction events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

/// Override for a single digit
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq)]
pub struct DigitOverride {
    /// Whether the override is applied to this digit at all
    pub apply: bool,
    /// Target curl in [0, 1]
    pub value: f32,
}

impl Default for DigitOverride {
    fn default() -> Self {
        Self {
            apply: true,
            value: 0.0,
        }
    }
}

/// Finger pose forced during one interaction phase
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct AxisOverrides {
    /// Skip every override of this phase
    pub ignore_all_overrides: bool,
    pub thumb: DigitOverride,
    pub index: DigitOverride,
    pub middle: DigitOverride,
    pub ring: DigitOverride,
    pub pinky: DigitOverride,
}

impl Default for AxisOverrides {
    fn default() -> Self {
        Self {
            ignore_all_overrides: true,
            thumb: DigitOverride::default(),
            index: DigitOverride::default(),
            middle: DigitOverride::default(),
            ring: DigitOverride::default(),
            pinky: DigitOverride::default(),
        }
    }
}

impl AxisOverrides {
    /// Builds an active policy forcing every digit to the given values
    pub fn forcing(values: [f32; 5]) -> Self {
        let digit = |value| DigitOverride { apply: true, value };
        Self {
            ignore_all_overrides: false,
            thumb: digit(values[0]),
            index: digit(values[1]),
            middle: digit(values[2]),
            ring: digit(values[3]),
            pinky: digit(values[4]),
        }
    }

    pub fn digit(&self, digit: Digit) -> &DigitOverride {
        match digit {
            Digit::Thumb => &self.thumb,
            Digit::Index => &self.index,
            Digit::Middle => &self.middle,
            Digit::Ring => &self.ring,
            Digit::Pinky => &self.pinky,
        }
    }

    pub fn digit_mut(&mut self, digit: Digit) -> &mut DigitOverride {
        match digit {
            Digit::Thumb => &mut self.thumb,
            Digit::Index => &mut self.index,
            Digit::Middle => &mut self.middle,
            Digit::Ring => &mut self.ring,
            Digit::Pinky => &mut self.pinky,
        }
    }

    pub fn permissions(&self) -> DigitMap<bool> {
        DigitMap::from_fn(|digit| self.digit(digit).apply)
    }

    /// Force values with zero replaced by [`FORCED_ZERO`]
    pub fn values(&self) -> DigitMap<f32> {
        DigitMap::from_fn(|digit| correct_override_value(self.digit(digit).value))
    }
}

pub fn correct_override_value(value: f32) -> f32 {
    if value == 0.0 {
        FORCED_ZERO
    } else {
        value
    }
}

/// Applies and releases interaction overrides on the finger channels
#[derive(Debug, Clone)]
pub struct OverrideResolver {
    touch: AxisOverrides,
    grab: AxisOverrides,
    use_: AxisOverrides,
    active_objects: [Option<ObjectId>; 3],
}

impl OverrideResolver {
    pub fn new(touch: AxisOverrides, grab: AxisOverrides, use_: AxisOverrides) -> Self {
        Self {
            touch,
            grab,
            use_,
            active_objects: [None; 3],
        }
    }

    pub fn policy(&self, phase: InteractionPhase) -> &AxisOverrides {
        match phase {
            InteractionPhase::Touch => &self.touch,
            InteractionPhase::Grab => &self.grab,
            InteractionPhase::Use => &self.use_,
        }
    }

    /// Object currently engaged in `phase`, if any
    pub fn active_object(&self, phase: InteractionPhase) -> Option<ObjectId> {
        self.active_objects[phase.slot()]
    }

    pub fn is_active(&self, phase: InteractionPhase) -> bool {
        self.active_object(phase).is_some()
    }

    /// Handles the start of an interaction
    pub fn enter(
        &mut self,
        phase: InteractionPhase,
        object: ObjectId,
        channels: &mut FingerChannels,
    ) {
        info!("{} started on object {:?}", phase, object);
        match phase {
            InteractionPhase::Touch => {
                let policy = &self.touch;
                let baseline = channels.axes();
                override_on(
                    channels,
                    policy.ignore_all_overrides,
                    baseline,
                    policy.permissions(),
                    policy.values(),
                );
            }
            InteractionPhase::Grab => {
                // A used object keeps the use pose dominant while grabbed
                let is_using = self.is_active(InteractionPhase::Use);
                let values = if is_using {
                    self.use_.values()
                } else {
                    self.grab.values()
                };
                let baseline = if is_using {
                    self.grab.values()
                } else {
                    channels.axes()
                };
                debug!("Grab override (using: {})", is_using);
                override_on(
                    channels,
                    self.grab.ignore_all_overrides,
                    baseline,
                    self.grab.permissions(),
                    values,
                );
            }
            InteractionPhase::Use => {
                let is_grabbing = self.is_active(InteractionPhase::Grab);
                let baseline = if is_grabbing {
                    self.grab.values()
                } else {
                    channels.axes()
                };
                debug!("Use override (grabbing: {})", is_grabbing);
                override_on(
                    channels,
                    self.use_.ignore_all_overrides,
                    baseline,
                    self.use_.permissions(),
                    self.use_.values(),
                );
            }
        }
        self.active_objects[phase.slot()] = Some(object);
    }

    /// Handles the end of an interaction
    pub fn exit(
        &mut self,
        phase: InteractionPhase,
        object: ObjectId,
        channels: &mut FingerChannels,
    ) {
        info!("{} ended on object {:?}", phase, object);
        self.active_objects[phase.slot()] = None;
        match phase {
            InteractionPhase::Touch => {
                for (digit, channel) in channels.iter_mut() {
                    if channel.is_overridden() && !channel.is_button_active() {
                        debug!(
                            "{} returns to untouched axis {:.3}",
                            digit, channel.untouched_axis
                        );
                        channel.override_state = OverrideState::JustReleased;
                        channel.forced_axis = channel.untouched_axis;
                    }
                }
                override_off(
                    channels,
                    self.touch.ignore_all_overrides,
                    self.touch.permissions(),
                    false,
                );
            }
            // Permissions come from the grab policy, not the touch policy
            InteractionPhase::Grab => override_off(
                channels,
                self.grab.ignore_all_overrides,
                self.grab.permissions(),
                false,
            ),
            InteractionPhase::Use => override_off(
                channels,
                self.use_.ignore_all_overrides,
                self.use_.permissions(),
                true,
            ),
        }
    }

    /// Forgets every engaged object
    pub fn reset(&mut self) {
        self.active_objects = [None; 3];
    }
}

fn override_on(
    channels: &mut FingerChannels,
    ignore_all: bool,
    baseline: DigitMap<f32>,
    permissions: DigitMap<bool>,
    values: DigitMap<f32>,
) {
    if ignore_all {
        debug!("Overrides ignored for this interaction");
        return;
    }

    for (digit, channel) in channels.iter_mut() {
        if !permissions[digit]
            || channel.is_button_active()
            || channel.override_state == OverrideState::JustReleased
        {
            continue;
        }

        let given = baseline[digit];
        if channel.override_state == OverrideState::None {
            channel.untouched_axis = channel.axis;
            channel.saved_axis = given;
        } else if channel.saved_axis != channel.forced_axis {
            channel.saved_axis = given;
        }
        channel.override_state = OverrideState::Overriding;
        channel.forced_axis = values[digit];
        debug!(
            "{} overriding towards {:.4} (saved {:.3})",
            digit, channel.forced_axis, channel.saved_axis
        );
    }
}

fn override_off(
    channels: &mut FingerChannels,
    ignore_all: bool,
    permissions: DigitMap<bool>,
    keep_overriding: bool,
) {
    if ignore_all {
        return;
    }

    for (digit, channel) in channels.iter_mut() {
        if permissions[digit]
            && !channel.is_button_active()
            && channel.override_state == OverrideState::Overriding
        {
            channel.override_state = if keep_overriding {
                OverrideState::HeldReleased
            } else {
                OverrideState::JustReleased
            };
            channel.axis = channel.forced_axis;
            channel.forced_axis = channel.saved_axis;
            debug!(
                "{} released as {:?}, heading to {:.3}",
                digit, channel.override_state, channel.forced_axis
            );
        }
    }
}
