//! Procedural finger animation for one avatar hand
//!
//! Five independent finger channels are fed by controller input, overridden by
//! touch/grab/use interactions and turned into animation layer weights once per
//! tick.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  HandEvent  ┌───────────────────────────────────────────┐
//! │  EventHub /  │────────────►│ HandAnimator                              │
//! │  boundary    │   (mpsc)    │  Collecting ──► Resolving ──► Animating   │
//! └──────────────┘             │      ▲         (channels,      │         │
//!        ▲                     │      │          overrides)     ▼         │
//!        │ controller type     │      └─────────────────── sink weights   │
//!        └─────────────────────┤  ProfileSelector                          │
//!                              └───────────────────────────────────────────┘
//! ```
//!
//! [`HandHandle`] runs the machine on a tokio interval; tests drive
//! [`HandAnimator::run_cycle`] directly with a fixed delta.

pub mod animation;
pub mod animator;
pub mod channel;
pub mod digit;
pub mod hand_handle;
pub mod overrides;
pub mod profile;

use crate::config::ConfigError;

pub use animation::{AnimationSink, FingerAnimator, Interpolation, SharedWeights};
pub use animator::{Animating, Collecting, EventBatch, HandAnimator, HandBoundary, HandCycle, Resolving};
pub use channel::{FingerChannel, FingerChannels, OverrideState};
pub use digit::{Digit, DigitMap, FingerTarget};
pub use hand_handle::HandHandle;
pub use overrides::{AxisOverrides, DigitOverride, InteractionPhase, ObjectId, OverrideResolver};
pub use profile::{profile_for, FingerProfile, ProfileSelector};

#[derive(Debug, thiserror::Error)]
pub enum HandError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("Channel error: {0}")]
    ChannelError(String),

    #[error("Task error: {0}")]
    TaskError(String),
}
