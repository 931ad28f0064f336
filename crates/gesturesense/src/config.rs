//! Runtime configuration read from `GESTURESENSE_*` environment variables.

use std::{env, path::PathBuf};

use anyhow::Context;

use crate::{
    geometry::Dimensions,
    gesture::GestureThresholds,
    tracking::TrackerOptions,
};

const PALM_MODEL_VAR: &str = "GESTURESENSE_PALM_MODEL";
const LANDMARK_MODEL_VAR: &str = "GESTURESENSE_LANDMARK_MODEL";
const DRY_RUN_VAR: &str = "GESTURESENSE_DRY_RUN";
const FULLSCREEN_VAR: &str = "GESTURESENSE_FULLSCREEN";
const RESOLUTION_VAR: &str = "GESTURESENSE_RESOLUTION";

const DEFAULT_PALM_MODEL: &str = "models/palm_detection_full.onnx";
const DEFAULT_LANDMARK_MODEL: &str = "models/hand_landmark_full.onnx";

/// Settings for one run of the control loop.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the palm detection ONNX model.
    pub palm_model: PathBuf,
    /// Path of the hand landmark ONNX model.
    pub landmark_model: PathBuf,
    /// Log actions instead of injecting input events.
    pub dry_run: bool,
    /// Show the preview window in borderless fullscreen mode.
    pub fullscreen: bool,
    /// Requested camera resolution, also used as the initial window size.
    pub resolution: Dimensions,
    pub thresholds: GestureThresholds,
    pub tracker: TrackerOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            palm_model: DEFAULT_PALM_MODEL.into(),
            landmark_model: DEFAULT_LANDMARK_MODEL.into(),
            dry_run: false,
            fullscreen: false,
            resolution: Dimensions::RES_720P,
            thresholds: GestureThresholds::default(),
            tracker: TrackerOptions::default(),
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// Unset variables keep their defaults. Invalid values are reported as errors.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(path) = lookup(PALM_MODEL_VAR) {
            config.palm_model = path.into();
        }
        if let Some(path) = lookup(LANDMARK_MODEL_VAR) {
            config.landmark_model = path.into();
        }
        if let Some(value) = lookup(DRY_RUN_VAR) {
            config.dry_run = parse_bool(&value).with_context(|| format!("invalid {DRY_RUN_VAR}"))?;
        }
        if let Some(value) = lookup(FULLSCREEN_VAR) {
            config.fullscreen =
                parse_bool(&value).with_context(|| format!("invalid {FULLSCREEN_VAR}"))?;
        }
        if let Some(value) = lookup(RESOLUTION_VAR) {
            config.resolution = value
                .trim()
                .parse::<Dimensions>()
                .with_context(|| format!("invalid {RESOLUTION_VAR}"))?;
        }

        Ok(config)
    }
}

fn parse_bool(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" => Ok(true),
        "0" | "false" | "off" => Ok(false),
        _ => anyhow::bail!("'{value}' is not a boolean (use 1/true/on or 0/false/off)"),
    }
}
