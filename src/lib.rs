//! Procedural finger animation for VR avatar hands
//!
//! Controller buttons and axes curl the fingers; touching, grabbing and using
//! objects can force a pose on top. See [`hand`] for the state machine and
//! [`input`] for the event boundary.

pub mod config;
pub mod hand;
pub mod input;
