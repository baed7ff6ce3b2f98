//! Configuration loading and typed config structures.
//!
//! The canonical configuration lives in `hearth.yaml` in the world
//! directory's parent (or wherever the CLI points). Strongly-typed
//! sections mirror the YAML; every field has a default so an empty file
//! is a valid configuration.

use std::path::Path;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EngineConfig {
    /// World generation and roster seeding.
    #[serde(default)]
    pub world: WorldSection,

    /// Vision and clustering radii.
    #[serde(default)]
    pub vision: VisionSection,

    /// Social timing.
    #[serde(default)]
    pub social: SocialSection,

    /// Tick timing and turn limits.
    #[serde(default)]
    pub timing: TimingSection,

    /// Storage locations and snapshot policy.
    #[serde(default)]
    pub storage: StorageSection,

    /// Weather drift.
    #[serde(default)]
    pub weather: WeatherSection,

    /// Reasoner backend selection.
    #[serde(default)]
    pub reasoner: ReasonerSection,
}

impl EngineConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_yml::from_str(&contents)?)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// The cluster radius: agents within it are scheduled together. The
    /// buffer keeps approaching agents coalescing one tick before they
    /// could see each other.
    pub const fn cluster_radius(&self) -> u32 {
        self.vision.radius.saturating_add(self.vision.cluster_buffer)
    }
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorldSection {
    /// Human-readable world name.
    #[serde(default = "default_world_name")]
    pub name: String,
    /// Terrain generation seed.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// World width in cells.
    #[serde(default = "default_dimension")]
    pub width: u32,
    /// World height in cells.
    #[serde(default = "default_dimension")]
    pub height: u32,
    /// Agents seeded at `init`.
    #[serde(default = "default_agents")]
    pub agents: Vec<AgentSeed>,
}

impl Default for WorldSection {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: default_seed(),
            width: default_dimension(),
            height: default_dimension(),
            agents: default_agents(),
        }
    }
}

/// One seeded agent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AgentSeed {
    /// Unique agent name.
    pub name: String,
    /// Reasoner model identifier.
    #[serde(default = "default_model")]
    pub model_id: String,
    /// Opaque personality text.
    #[serde(default)]
    pub personality: String,
}

/// Vision and clustering radii.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VisionSection {
    /// Daytime vision radius (Chebyshev).
    #[serde(default = "default_vision_radius")]
    pub radius: u32,
    /// Night-vision scaling in percent of the daytime radius.
    #[serde(default = "default_night_percent")]
    pub night_percent: u32,
    /// Extra clustering radius on top of vision.
    #[serde(default = "default_cluster_buffer")]
    pub cluster_buffer: u32,
}

impl Default for VisionSection {
    fn default() -> Self {
        Self {
            radius: default_vision_radius(),
            night_percent: default_night_percent(),
            cluster_buffer: default_cluster_buffer(),
        }
    }
}

/// Social timing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SocialSection {
    /// Ticks a pending invitation survives.
    #[serde(default = "default_invitation_expiry")]
    pub invitation_expiry_ticks: u64,
}

impl Default for SocialSection {
    fn default() -> Self {
        Self {
            invitation_expiry_ticks: default_invitation_expiry(),
        }
    }
}

/// Tick timing and turn limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimingSection {
    /// Per-tick deadline in seconds; outstanding reasoner calls are
    /// cancelled when it passes.
    #[serde(default = "default_tick_deadline")]
    pub tick_deadline_secs: u64,
    /// Most actions one agent may execute per turn.
    #[serde(default = "default_max_actions")]
    pub max_actions_per_turn: u32,
}

impl Default for TimingSection {
    fn default() -> Self {
        Self {
            tick_deadline_secs: default_tick_deadline(),
            max_actions_per_turn: default_max_actions(),
        }
    }
}

/// Storage locations and snapshot policy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageSection {
    /// The world directory (database, log, snapshots, agent files).
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Take a snapshot every this many ticks (0 disables).
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval: u64,
    /// Rolling window of snapshots to keep.
    #[serde(default = "default_snapshot_retain")]
    pub snapshot_retain: usize,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            snapshot_interval: default_snapshot_interval(),
            snapshot_retain: default_snapshot_retain(),
        }
    }
}

/// Weather drift configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct WeatherSection {
    /// Consider a weather change every this many ticks (0 disables).
    #[serde(default)]
    pub drift_interval: u64,
}

/// Reasoner backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReasonerSection {
    /// Backend kind: `anthropic`, `openai`, or `scripted`.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Backend base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Ceiling on model output tokens per call.
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// Timeout for one model call, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Model used for narration (empty uses the local fallback).
    #[serde(default)]
    pub narrator_model: String,
    /// Directory of prompt templates (empty uses the built-ins).
    #[serde(default)]
    pub templates_dir: String,
}

impl Default for ReasonerSection {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            api_url: default_api_url(),
            api_key_env: default_api_key_env(),
            max_output_tokens: default_max_output_tokens(),
            request_timeout_secs: default_request_timeout(),
            narrator_model: String::new(),
            templates_dir: String::new(),
        }
    }
}

fn default_world_name() -> String {
    String::from("hearth")
}

const fn default_seed() -> u64 {
    1
}

const fn default_dimension() -> u32 {
    48
}

fn default_agents() -> Vec<AgentSeed> {
    vec![
        AgentSeed {
            name: String::from("Rowan"),
            model_id: default_model(),
            personality: String::from("curious and methodical"),
        },
        AgentSeed {
            name: String::from("Wren"),
            model_id: default_model(),
            personality: String::from("talkative and restless"),
        },
    ]
}

fn default_model() -> String {
    String::from("claude-sonnet-4-5")
}

const fn default_vision_radius() -> u32 {
    8
}

const fn default_night_percent() -> u32 {
    60
}

const fn default_cluster_buffer() -> u32 {
    2
}

const fn default_invitation_expiry() -> u64 {
    2
}

const fn default_tick_deadline() -> u64 {
    120
}

const fn default_max_actions() -> u32 {
    8
}

fn default_data_dir() -> String {
    String::from("./hearth-data")
}

const fn default_snapshot_interval() -> u64 {
    25
}

const fn default_snapshot_retain() -> usize {
    5
}

fn default_backend() -> String {
    String::from("anthropic")
}

const fn default_max_output_tokens() -> u32 {
    1024
}

const fn default_request_timeout() -> u64 {
    60
}

fn default_api_url() -> String {
    String::from("https://api.anthropic.com/v1")
}

fn default_api_key_env() -> String {
    String::from("ANTHROPIC_API_KEY")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_yields_defaults() {
        let config = EngineConfig::parse("{}");
        let Ok(config) = config else {
            assert!(false, "parse failed");
            return;
        };
        assert_eq!(config.vision.radius, 8);
        assert_eq!(config.vision.cluster_buffer, 2);
        assert_eq!(config.social.invitation_expiry_ticks, 2);
        assert_eq!(config.timing.tick_deadline_secs, 120);
        assert_eq!(config.cluster_radius(), 10);
        assert_eq!(config.world.agents.len(), 2);
    }

    #[test]
    fn sections_override_independently() {
        let yaml = r"
vision:
  radius: 5
world:
  width: 32
  agents:
    - name: Moss
      personality: slow to anger
";
        let Ok(config) = EngineConfig::parse(yaml) else {
            assert!(false, "parse failed");
            return;
        };
        assert_eq!(config.vision.radius, 5);
        assert_eq!(config.vision.night_percent, 60);
        assert_eq!(config.world.width, 32);
        assert_eq!(config.world.height, 48);
        assert_eq!(config.world.agents.first().map(|a| a.name.as_str()), Some("Moss"));
    }
}
