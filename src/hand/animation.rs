//! Finger animation driver
//!
//! Turns channel state into layer weights once per tick. Digital fingers and
//! overrides blend over `animation_snap_speed` seconds; continuous and sensed
//! fingers are written straight through.

use crate::hand::channel::{FingerChannel, FingerChannels, OverrideState};
use crate::hand::digit::{Digit, DigitMap};
use crate::input::AxisMode;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Receiver of finger layer weights, typically an animator
pub trait AnimationSink: Send {
    /// Sets the weight of an animation layer; layer = digit index + 1
    fn set_layer_weight(&mut self, layer: usize, weight: f32);

    /// Flips the hand model for use on the other side
    fn mirror_model(&mut self) {}
}

/// In-flight blend of one digit
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Interpolation {
    pub active: bool,
    pub start: f32,
    pub target: f32,
    pub elapsed: f32,
}

impl Interpolation {
    pub fn begin(start: f32, target: f32) -> Self {
        Self {
            active: true,
            start,
            target,
            elapsed: 0.0,
        }
    }

    /// Advances by `dt` seconds and returns the value to show
    ///
    /// Finishes exactly on `target` once `duration` has elapsed; a zero
    /// duration finishes on the first step.
    pub fn advance(&mut self, dt: f32, duration: f32) -> f32 {
        self.elapsed += dt;
        if duration <= 0.0 || self.elapsed >= duration {
            self.active = false;
            return self.target;
        }
        let t = (self.elapsed / duration).clamp(0.0, 1.0);
        self.start + (self.target - self.start) * t
    }
}

/// Per-tick resolver of finger weights
#[derive(Debug, Clone)]
pub struct FingerAnimator {
    snap_speed: f32,
    interpolations: DigitMap<Interpolation>,
}

impl FingerAnimator {
    pub fn new(snap_speed: f32) -> Self {
        Self {
            snap_speed,
            interpolations: DigitMap::default(),
        }
    }

    pub fn interpolation(&self, digit: Digit) -> &Interpolation {
        &self.interpolations[digit]
    }

    /// Resolves every digit for one tick of `dt` seconds
    pub fn process(
        &mut self,
        channels: &mut FingerChannels,
        modes: &DigitMap<AxisMode>,
        dt: f32,
        sink: &mut dyn AnimationSink,
    ) {
        for digit in Digit::ALL {
            self.process_finger(digit, &mut channels[digit], modes[digit], dt, sink);
        }
    }

    fn process_finger(
        &mut self,
        digit: Digit,
        channel: &mut FingerChannel,
        mode: AxisMode,
        dt: f32,
        sink: &mut dyn AnimationSink,
    ) {
        if channel.is_overridden() {
            if channel.axis != channel.forced_axis {
                self.lerp_towards(digit, channel.axis, channel.forced_axis);
            } else if channel.override_state == OverrideState::JustReleased {
                debug!("{} override settled at {:.3}", digit, channel.axis);
                channel.override_state = OverrideState::None;
            }
        } else if mode == AxisMode::Digital {
            if channel.pressure_changed {
                channel.pressure_changed = false;
                let (start, target) = if channel.is_pressed {
                    (0.0, 1.0)
                } else {
                    (1.0, 0.0)
                };
                self.start(digit, start, target);
            }
        } else {
            self.cancel(digit);
            let axis = channel.axis;
            set_finger_position(digit, channel, axis, sink);
        }

        let interpolation = &mut self.interpolations[digit];
        if interpolation.active {
            let value = interpolation.advance(dt, self.snap_speed);
            set_finger_position(digit, channel, value, sink);
        }
    }

    /// Continues a blend already heading for `target`, otherwise starts one
    fn lerp_towards(&mut self, digit: Digit, from: f32, target: f32) {
        let current = &self.interpolations[digit];
        if current.active && current.target == target {
            return;
        }
        self.start(digit, from, target);
    }

    fn start(&mut self, digit: Digit, start: f32, target: f32) {
        if self.interpolations[digit].active {
            debug!(
                "{} blend towards {:.3} replaced",
                digit, self.interpolations[digit].target
            );
        }
        debug!("{} blending {:.3} -> {:.3}", digit, start, target);
        self.interpolations[digit] = Interpolation::begin(start, target);
    }

    fn cancel(&mut self, digit: Digit) {
        self.interpolations[digit] = Interpolation::default();
    }

    /// Stops every blend
    pub fn cancel_all(&mut self) {
        for digit in Digit::ALL {
            self.cancel(digit);
        }
    }
}

fn set_finger_position(
    digit: Digit,
    channel: &mut FingerChannel,
    value: f32,
    sink: &mut dyn AnimationSink,
) {
    sink.set_layer_weight(digit.layer(), value);
    channel.axis = value;
}

#[derive(Debug, Default)]
struct WeightState {
    weights: [f32; 6],
    writes: usize,
    mirrored: bool,
}

/// Sink that stores the latest weight of every layer behind a shared handle
///
/// Clones share the same storage, so a host can keep one clone for reading
/// while the hand owns another.
#[derive(Debug, Clone, Default)]
pub struct SharedWeights {
    state: Arc<Mutex<WeightState>>,
}

impl SharedWeights {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut WeightState) -> R) -> R {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Weight storage poisoned, recovering");
                poisoned.into_inner()
            }
        };
        f(&mut guard)
    }

    pub fn weight(&self, digit: Digit) -> f32 {
        self.with_state(|state| state.weights[digit.layer()])
    }

    pub fn weights(&self) -> DigitMap<f32> {
        self.with_state(|state| DigitMap::from_fn(|digit| state.weights[digit.layer()]))
    }

    /// Number of weight writes received so far
    pub fn writes(&self) -> usize {
        self.with_state(|state| state.writes)
    }

    pub fn is_mirrored(&self) -> bool {
        self.with_state(|state| state.mirrored)
    }
}

impl AnimationSink for SharedWeights {
    fn set_layer_weight(&mut self, layer: usize, weight: f32) {
        self.with_state(|state| {
            if let Some(slot) = state.weights.get_mut(layer) {
                *slot = weight;
                state.writes += 1;
            }
        });
    }

    fn mirror_model(&mut self) {
        self.with_state(|state| state.mirrored = !state.mirrored);
    }
}
