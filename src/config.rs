//! Configuration for the FitWise coach.

use crate::core::advisor::{
    PostureCheck, DEFAULT_DEPTH_PERIOD, DEFAULT_POSTURE_TOLERANCE, DEFAULT_POSTURE_TRIPLET,
};
use crate::core::geometry::JointTriplet;
use crate::core::profile::{ExerciseProfile, ExerciseRegistry, RegistryError, SQUAT_ID};
use crate::core::smoothing::DEFAULT_WINDOW_SIZE;
use crate::pose::types::FrameSize;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Engine tuning shared by all exercises
    pub coaching: CoachingConfig,

    /// Frame size used to denormalize keypoints when the source omits it
    pub frame: FrameSize,

    /// Exercise tracked when none is given on the command line
    pub default_exercise: String,

    /// Extra or overriding exercise profiles
    pub custom_profiles: Vec<ExerciseProfile>,

    /// Path for exporting workout summaries
    pub export_path: PathBuf,

    /// Path for storing session statistics
    pub data_path: PathBuf,

    /// Port for the HTTP frame endpoint
    pub server_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fitwise-coach");

        Self {
            coaching: CoachingConfig::default(),
            frame: FrameSize::default(),
            default_exercise: SQUAT_ID.to_string(),
            custom_profiles: Vec::new(),
            export_path: data_dir.join("exports"),
            data_path: data_dir,
            server_port: 6432,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fitwise-coach")
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.export_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Built-in profiles plus any custom profiles from this config.
    pub fn registry(&self) -> Result<ExerciseRegistry, ConfigError> {
        let mut registry = ExerciseRegistry::builtin();
        for profile in &self.custom_profiles {
            registry
                .register(profile.clone())
                .map_err(ConfigError::InvalidProfile)?;
        }
        Ok(registry)
    }
}

/// Tuning for smoothing, depth and posture checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoachingConfig {
    /// Number of raw angle samples averaged before threshold comparison
    pub smoothing_window: usize,

    /// Length of one periodic depth window
    #[serde(with = "duration_serde")]
    pub depth_check_period: Duration,

    /// Landmarks whose angle should stay close to a straight line
    pub posture_triplet: JointTriplet,

    /// Allowed posture deviation from 180° in degrees
    pub posture_tolerance_deg: f64,
}

impl Default for CoachingConfig {
    fn default() -> Self {
        Self {
            smoothing_window: DEFAULT_WINDOW_SIZE,
            depth_check_period: DEFAULT_DEPTH_PERIOD,
            posture_triplet: DEFAULT_POSTURE_TRIPLET,
            posture_tolerance_deg: DEFAULT_POSTURE_TOLERANCE,
        }
    }
}

impl CoachingConfig {
    pub fn posture_check(&self) -> PostureCheck {
        PostureCheck {
            triplet: self.posture_triplet,
            tolerance: self.posture_tolerance_deg,
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    InvalidProfile(RegistryError),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::InvalidProfile(e) => write!(f, "Invalid profile: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration as fractional seconds.
pub(crate) mod duration_serde {
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|e| de::Error::custom(format!("invalid duration {secs}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.coaching.smoothing_window, 5);
        assert_eq!(config.coaching.depth_check_period, Duration::from_secs(5));
        assert_eq!(config.coaching.posture_tolerance_deg, 30.0);
        assert_eq!(config.frame, FrameSize::new(640, 480));
        assert_eq!(config.default_exercise, "3");
        assert_eq!(config.server_port, 6432);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"coaching": {"smoothing_window": 3}}"#).unwrap();
        assert_eq!(config.coaching.smoothing_window, 3);
        assert_eq!(config.coaching.depth_check_period, Duration::from_secs(5));
        assert_eq!(config.default_exercise, "3");
    }

    #[test]
    fn test_registry_includes_custom_profiles() {
        let mut config = Config::default();
        let mut curl = ExerciseProfile::push_up();
        curl.id = "7".to_string();
        curl.name = "bicep_curl".to_string();
        curl.down_threshold = 50.0;
        config.custom_profiles.push(curl);

        let registry = config.registry().unwrap();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.resolve("bicep_curl").unwrap().down_threshold, 50.0);
    }

    #[test]
    fn test_registry_rejects_bad_custom_profile() {
        let mut config = Config::default();
        let mut broken = ExerciseProfile::squat();
        broken.up_threshold = 10.0;
        config.custom_profiles.push(broken);

        assert!(matches!(
            config.registry(),
            Err(ConfigError::InvalidProfile(_))
        ));
    }

    #[test]
    fn test_fractional_depth_period() {
        let config: Config =
            serde_json::from_str(r#"{"coaching": {"depth_check_period": 2.5}}"#).unwrap();
        assert_eq!(
            config.coaching.depth_check_period,
            Duration::from_millis(2500)
        );

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["coaching"]["depth_check_period"], 2.5);

        // Whole seconds written by older configs still parse.
        let config: Config =
            serde_json::from_str(r#"{"coaching": {"depth_check_period": 4}}"#).unwrap();
        assert_eq!(config.coaching.depth_check_period, Duration::from_secs(4));
    }

    #[test]
    fn test_negative_cooldown_rejected() {
        let mut json = serde_json::to_value(ExerciseProfile::squat()).unwrap();
        json["cooldown"] = serde_json::json!(-1.0);
        assert!(serde_json::from_value::<ExerciseProfile>(json).is_err());
    }
}
