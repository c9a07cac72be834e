//! Hand configuration
//!
//! [`HandConfig`] is read once at construction. On disk it lives as TOML under
//! `~/.config/avatarhand/hand_config.toml`; a default file is written the first
//! time the hand starts.

use crate::hand::digit::{Digit, DigitMap, FingerTarget};
use crate::hand::overrides::{AxisOverrides, InteractionPhase};
use crate::input::{AxisButton, AxisMode, ButtonAlias};
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

const CONFIG_DIR: &str = ".config/avatarhand";
const CONFIG_FILE: &str = "hand_config.toml";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid animation snap speed: {0}")]
    InvalidSnapSpeed(f32),

    #[error("Tick interval must be at least 1 ms")]
    ZeroTickInterval,

    #[error("Override value out of range: {0}")]
    OverrideOutOfRange(String),
}

/// One setting per finger binding: the five digits and the three-finger group
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Default)]
pub struct FingerBindings<T> {
    pub thumb: T,
    pub index: T,
    pub middle: T,
    pub ring: T,
    pub pinky: T,
    pub three_finger: T,
}

impl<T> FingerBindings<T> {
    pub fn get(&self, target: FingerTarget) -> &T {
        match target {
            FingerTarget::Digit(Digit::Thumb) => &self.thumb,
            FingerTarget::Digit(Digit::Index) => &self.index,
            FingerTarget::Digit(Digit::Middle) => &self.middle,
            FingerTarget::Digit(Digit::Ring) => &self.ring,
            FingerTarget::Digit(Digit::Pinky) => &self.pinky,
            FingerTarget::ThreeFinger => &self.three_finger,
        }
    }

    /// Every binding, digits first and the three-finger group last
    pub fn iter(&self) -> impl Iterator<Item = (FingerTarget, &T)> {
        Digit::ALL
            .into_iter()
            .map(FingerTarget::Digit)
            .chain(std::iter::once(FingerTarget::ThreeFinger))
            .map(move |target| (target, self.get(target)))
    }
}

impl<T: Copy> FingerBindings<T> {
    pub fn uniform(value: T) -> Self {
        Self {
            thumb: value,
            index: value,
            middle: value,
            ring: value,
            pinky: value,
            three_finger: value,
        }
    }

    /// Per-digit values, without the three-finger group
    pub fn digit_map(&self) -> DigitMap<T> {
        DigitMap::from_fn(|digit| *self.get(FingerTarget::Digit(digit)))
    }
}

fn default_buttons() -> FingerBindings<ButtonAlias> {
    FingerBindings {
        thumb: ButtonAlias::TouchpadTouch,
        index: ButtonAlias::TriggerPress,
        middle: ButtonAlias::Undefined,
        ring: ButtonAlias::Undefined,
        pinky: ButtonAlias::Undefined,
        three_finger: ButtonAlias::GripPress,
    }
}

fn default_axis_buttons() -> FingerBindings<AxisButton> {
    FingerBindings {
        thumb: AxisButton::Touchpad,
        index: AxisButton::Trigger,
        middle: AxisButton::MiddleFinger,
        ring: AxisButton::RingFinger,
        pinky: AxisButton::PinkyFinger,
        three_finger: AxisButton::Grip,
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct HandConfig {
    /// Pick axis modes from the detected controller
    pub auto_detect_controller: bool,
    /// Mirror the model once after detection (left hand)
    pub mirror_model: bool,
    /// Seconds a digital finger takes to reach its target
    pub animation_snap_speed: f32,
    pub tick_interval_ms: u64,
    pub buttons: FingerBindings<ButtonAlias>,
    pub axis_buttons: FingerBindings<AxisButton>,
    pub axis_modes: FingerBindings<AxisMode>,
    pub touch_overrides: AxisOverrides,
    pub grab_overrides: AxisOverrides,
    pub use_overrides: AxisOverrides,
}

impl Default for HandConfig {
    fn default() -> Self {
        Self {
            auto_detect_controller: true,
            mirror_model: false,
            animation_snap_speed: 0.1,
            tick_interval_ms: 11,
            buttons: default_buttons(),
            axis_buttons: default_axis_buttons(),
            axis_modes: FingerBindings::uniform(AxisMode::Digital),
            touch_overrides: AxisOverrides::default(),
            grab_overrides: AxisOverrides::default(),
            use_overrides: AxisOverrides::default(),
        }
    }
}

impl HandConfig {
    pub fn overrides(&self, phase: InteractionPhase) -> &AxisOverrides {
        match phase {
            InteractionPhase::Touch => &self.touch_overrides,
            InteractionPhase::Grab => &self.grab_overrides,
            InteractionPhase::Use => &self.use_overrides,
        }
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !self.animation_snap_speed.is_finite() || self.animation_snap_speed < 0.0 {
            return Err(ConfigError::InvalidSnapSpeed(self.animation_snap_speed));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ZeroTickInterval);
        }
        for phase in InteractionPhase::ALL {
            let policy = self.overrides(phase);
            for digit in Digit::ALL {
                let value = policy.digit(digit).value;
                if !(0.0..=1.0).contains(&value) {
                    return Err(ConfigError::OverrideOutOfRange(format!(
                        "{} {} = {}",
                        phase, digit, value
                    )));
                }
            }
        }
        Ok(())
    }
}

fn get_home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| {
        warn!("Could not determine home directory, using current directory");
        PathBuf::from(".")
    })
}

pub fn default_config_path() -> PathBuf {
    let mut path = get_home_dir();
    path.push(CONFIG_DIR);
    path.push(CONFIG_FILE);
    path
}

/// Loads the config from the default location, creating it when missing
pub async fn load_or_create() -> Result<HandConfig> {
    let path = default_config_path();
    if tokio::fs::try_exists(&path)
        .await
        .map_err(|e| eyre!("Failed to check if config file exists: {}", e))?
    {
        load_from(&path).await
    } else {
        info!("No hand config at {}, writing defaults", path.display());
        let config = HandConfig::default();
        save_to(&path, &config).await?;
        Ok(config)
    }
}

pub async fn load_from(path: &Path) -> Result<HandConfig> {
    debug!("Reading hand config from {}", path.display());
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| eyre!("Failed to read hand config file: {}", e))?;
    let config: HandConfig =
        toml::from_str(&content).map_err(|e| eyre!("Failed to parse hand config file: {}", e))?;
    config
        .validate()
        .map_err(|e| eyre!("Invalid hand config {}: {}", path.display(), e))?;
    info!("Loaded hand config from {}", path.display());
    Ok(config)
}

pub async fn save_to(path: &Path, config: &HandConfig) -> Result<()> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| eyre!("Failed to serialize hand config: {}", e))?;
    tokio::fs::write(path, content)
        .await
        .map_err(|e| eyre!("Failed to write hand config file: {}", e))?;
    debug!("Hand config written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_stock_bindings() {
        let config = HandConfig::default();
        assert_eq!(config.buttons.thumb, ButtonAlias::TouchpadTouch);
        assert_eq!(config.buttons.three_finger, ButtonAlias::GripPress);
        assert_eq!(config.axis_buttons.three_finger, AxisButton::Grip);
        assert_eq!(config.animation_snap_speed, 0.1);
        assert!(config.touch_overrides.ignore_all_overrides);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn bindings_iterate_digits_then_group() {
        let targets: Vec<FingerTarget> = default_buttons().iter().map(|(t, _)| t).collect();
        assert_eq!(targets.len(), 6);
        assert_eq!(targets[0], FingerTarget::Digit(Digit::Thumb));
        assert_eq!(targets[5], FingerTarget::ThreeFinger);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: HandConfig = toml::from_str(
            r#"
            mirror_model = true
            animation_snap_speed = 0.25

            [grab_overrides]
            ignore_all_overrides = false
            thumb = { apply = true, value = 0.5 }
            index = { apply = false, value = 0.0 }
            middle = { apply = true, value = 1.0 }
            ring = { apply = true, value = 1.0 }
            pinky = { apply = true, value = 1.0 }
            "#,
        )
        .unwrap();

        assert!(config.mirror_model);
        assert_eq!(config.animation_snap_speed, 0.25);
        assert_eq!(config.tick_interval_ms, 11);
        assert!(!config.grab_overrides.ignore_all_overrides);
        assert!(!config.grab_overrides.index.apply);
        assert!(config.use_overrides.ignore_all_overrides);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = HandConfig {
            animation_snap_speed: -1.0,
            ..HandConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidSnapSpeed(-1.0)));

        config.animation_snap_speed = 0.0;
        config.tick_interval_ms = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroTickInterval));

        config.tick_interval_ms = 11;
        config.use_overrides.pinky.value = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OverrideOutOfRange(_))
        ));
    }

    #[tokio::test]
    async fn save_then_load_from_disk() {
        let dir = std::env::temp_dir().join(format!("avatarhand-test-{}", std::process::id()));
        let path = dir.join(CONFIG_FILE);
        let config = HandConfig {
            auto_detect_controller: false,
            touch_overrides: AxisOverrides::forcing([0.0, 0.2, 0.4, 0.6, 0.8]),
            ..HandConfig::default()
        };

        save_to(&path, &config).await.unwrap();
        let loaded = load_from(&path).await.unwrap();
        let _ = tokio::fs::remove_dir_all(&dir).await;

        assert_eq!(loaded, config);
    }
}
