//! TOML configuration for a complete journey.

use std::{fs, path::Path, path::PathBuf};

use serde::Deserialize;
use skyride_world::WorldConfig;
use thiserror::Error;

/// Errors raised while loading or validating a [`JourneyConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration from {}", .path.display())]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The configuration was not valid TOML for the expected schema.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// The configuration parsed but describes an unusable journey.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

/// Every tunable of a journey, grouped by owner.
///
/// World sections (`[path]`, `[clock]`, `[markers]`, `[gates]`, `[timers]`)
/// sit at the top level next to the system sections.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct JourneyConfig {
    /// Path, clock, gate layout, markers, and timers.
    #[serde(flatten)]
    pub world: WorldConfig,
    /// When the finale is raised.
    pub finale: skyride_system_gates::Config,
    /// Cruising speed per segment.
    pub pacing: skyride_system_pacing::Config,
    /// Actor flight and descent.
    pub actor: skyride_system_pose::Config,
    /// Camera framing and shake.
    pub camera: skyride_system_camera::Config,
    /// Per-segment sky and fog.
    pub atmosphere: skyride_system_atmosphere::Config,
}

impl JourneyConfig {
    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Rejects configurations the engine cannot run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let path = &self.world.path;
        if path.segment_count == 0 {
            return Err(ConfigError::invalid("path.segment_count must be at least 1"));
        }
        if path.subdivisions == 0 {
            return Err(ConfigError::invalid("path.subdivisions must be at least 1"));
        }
        if !(path.segment_length.is_finite() && path.segment_length > 0.0) {
            return Err(ConfigError::invalid(format!(
                "path.segment_length must be positive (received {})",
                path.segment_length
            )));
        }

        let follow = self.camera.follow_distance;
        if !(0.0..0.5).contains(&follow) {
            return Err(ConfigError::invalid(format!(
                "camera.follow_distance must lie in [0, 0.5) (received {follow})"
            )));
        }

        if self.pacing.segment_speeds().is_empty() {
            return Err(ConfigError::invalid(
                "pacing.segment_speeds needs at least one entry",
            ));
        }
        if let Some(speed) = self
            .pacing
            .segment_speeds()
            .iter()
            .find(|speed| !(speed.is_finite() && **speed >= 0.0))
        {
            return Err(ConfigError::invalid(format!(
                "pacing.segment_speeds must be non-negative (received {speed})"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = JourneyConfig::from_toml_str("").expect("defaults are valid");
        assert_eq!(config, JourneyConfig::default());
        assert_eq!(config.world.path.segment_count, 6);
        assert_eq!(config.pacing.segment_speeds().len(), 6);
    }

    #[test]
    fn sections_override_their_own_fields() {
        let config = JourneyConfig::from_toml_str(
            r#"
            [path]
            segment_count = 4
            segment_length = 90

            [pacing]
            segment_speeds = [0.02, 0.03]

            [camera]
            follow_distance = 0.02
            chase_offset = [1.0, 2.0, 3.0]

            [finale]
            finale_fraction = 0.9

            [[atmosphere.palettes]]
            background = 0x000000
            fog = 0xffffff
            fog_density = 0.01
            "#,
        )
        .expect("valid configuration");

        assert_eq!(config.world.path.segment_count, 4);
        assert_eq!(config.world.path.segment_length, 90.0);
        assert_eq!(config.world.path.subdivisions, 16, "untouched fields keep defaults");
        assert_eq!(config.pacing.segment_speeds(), &[0.02_f32, 0.03][..]);
        assert_eq!(config.camera.follow_distance, 0.02);
        assert_eq!(config.camera.chase_offset, glam::Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(config.finale.finale_fraction(), 0.9);
        assert_eq!(config.atmosphere.palettes.len(), 1);
        assert_eq!(config.atmosphere.palettes[0].fog, 0xffffff);
    }

    #[test]
    fn rejects_unusable_layouts() {
        for text in [
            "[path]\nsegment_count = 0",
            "[path]\nsubdivisions = 0",
            "[path]\nsegment_length = -5.0",
            "[camera]\nfollow_distance = 0.5",
            "[pacing]\nsegment_speeds = []",
            "[pacing]\nsegment_speeds = [0.01, -0.02]",
        ] {
            let error = JourneyConfig::from_toml_str(text).expect_err(text);
            assert!(matches!(error, ConfigError::Invalid(_)), "{text}: {error}");
        }
    }

    #[test]
    fn reports_syntax_errors_as_parse_failures() {
        let error = JourneyConfig::from_toml_str("[path\nsegment_count = 2").expect_err("broken");
        assert!(matches!(error, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let error =
            JourneyConfig::load(Path::new("/definitely/not/here.toml")).expect_err("missing");
        assert!(matches!(error, ConfigError::Io { .. }));
        assert!(error.to_string().contains("/definitely/not/here.toml"));
    }
}
