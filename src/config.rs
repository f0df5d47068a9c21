//! Process configuration.
//!
//! Loaded from a TOML file named by `--config` or `REPETICIO_CONFIG`. Missing
//! files and missing keys fall back to the defaults below, so an empty file is a
//! valid configuration.

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::language::Language;

pub const CONFIG_ENV_VAR: &str = "REPETICIO_CONFIG";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub learning: LearningConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
}

impl AppConfig {
    /// Reads the configuration from `path`, or from the environment override,
    /// or returns the defaults when neither names an existing file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path.map(Path::to_path_buf).or_else(resolve_config_path);

        let config = match config_path {
            Some(config_path) if config_path.exists() => {
                let raw = fs::read_to_string(&config_path).with_context(|| {
                    format!("failed to read config file {}", config_path.display())
                })?;
                toml::from_str::<AppConfig>(&raw).with_context(|| {
                    format!("failed to parse TOML from {}", config_path.display())
                })?
            }
            Some(config_path) => {
                tracing::warn!(
                    "Config file {} not found, using defaults",
                    config_path.display()
                );
                AppConfig::default()
            }
            None => AppConfig::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.learning.supported_languages.is_empty() {
            bail!("learning.supported_languages must name at least one language");
        }
        if self.scheduler.history_capacity == 0 {
            bail!("scheduler.history_capacity must be positive");
        }
        if self.scheduler.temperature.is_nan() || self.scheduler.temperature < 0.0 {
            bail!("scheduler.temperature must be zero or positive");
        }
        if self.cache.capacity == 0 {
            bail!("cache.capacity must be positive");
        }
        if self.cache.generation_attempts == 0 {
            bail!("cache.generation_attempts must be positive");
        }
        if self.pipeline.max_concurrent == 0 {
            bail!("pipeline.max_concurrent must be positive");
        }
        if self.pipeline.processing_timeout_secs == 0 {
            bail!("pipeline.processing_timeout_secs must be positive");
        }
        if self.coordinator.heartbeat_interval_secs == 0 {
            bail!("coordinator.heartbeat_interval_secs must be positive");
        }
        if self.coordinator.dead_timeout_secs <= self.coordinator.heartbeat_interval_secs {
            bail!("coordinator.dead_timeout_secs must exceed the heartbeat interval");
        }
        if self.maintenance.interval_secs == 0 {
            bail!("maintenance.interval_secs must be positive");
        }
        if self.generator.attempts == 0 {
            bail!("generator.attempts must be positive");
        }
        Ok(())
    }

    pub fn is_supported(&self, language: Language) -> bool {
        self.learning.supported_languages.contains(&language)
    }
}

fn resolve_config_path() -> Option<PathBuf> {
    env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from)
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

#[derive(Debug, Clone, Deserialize)]
pub struct LearningConfig {
    #[serde(default = "default_supported_languages")]
    pub supported_languages: Vec<Language>,
    #[serde(default = "default_xp_per_correct")]
    pub xp_per_correct: u64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            supported_languages: default_supported_languages(),
            xp_per_correct: default_xp_per_correct(),
        }
    }
}

fn default_supported_languages() -> Vec<Language> {
    vec![Language::Es]
}

fn default_xp_per_correct() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Standard deviation of the noise added to word priorities.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            history_capacity: default_history_capacity(),
        }
    }
}

fn default_temperature() -> f64 {
    0.02
}

fn default_history_capacity() -> usize {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Variants kept per word-set/level/language key.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
    /// Votes needed before a variant's score is trusted.
    #[serde(default = "default_min_vote_volume")]
    pub min_vote_volume: u64,
    #[serde(default = "default_generation_attempts")]
    pub generation_attempts: usize,
    #[serde(default = "default_style_examples")]
    pub style_examples: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            min_vote_volume: default_min_vote_volume(),
            generation_attempts: default_generation_attempts(),
            style_examples: default_style_examples(),
        }
    }
}

fn default_cache_capacity() -> usize {
    5
}

fn default_min_vote_volume() -> u64 {
    50
}

fn default_generation_attempts() -> usize {
    3
}

fn default_style_examples() -> usize {
    3
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default = "default_processing_timeout_secs")]
    pub processing_timeout_secs: u64,
}

impl PipelineConfig {
    pub fn processing_timeout(&self) -> Duration {
        Duration::from_secs(self.processing_timeout_secs)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            processing_timeout_secs: default_processing_timeout_secs(),
        }
    }
}

fn default_max_concurrent() -> usize {
    8
}

fn default_processing_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoordinatorConfig {
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "default_dead_timeout_secs")]
    pub dead_timeout_secs: u64,
    /// How long a freshly started replica sits out of leader election.
    #[serde(default = "default_grace_secs")]
    pub grace_secs: u64,
}

impl CoordinatorConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn dead_timeout(&self) -> Duration {
        Duration::from_secs(self.dead_timeout_secs)
    }

    pub fn grace(&self) -> Duration {
        Duration::from_secs(self.grace_secs)
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            dead_timeout_secs: default_dead_timeout_secs(),
            grace_secs: default_grace_secs(),
        }
    }
}

fn default_heartbeat_interval_secs() -> u64 {
    5
}

fn default_dead_timeout_secs() -> u64 {
    30
}

fn default_grace_secs() -> u64 {
    15
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaintenanceConfig {
    #[serde(default = "default_maintenance_interval_secs")]
    pub interval_secs: u64,
    /// Minimum time between two revision passes of the same language.
    #[serde(default = "default_revision_interval_secs")]
    pub revision_interval_secs: u64,
    #[serde(default = "default_revision_batch")]
    pub revision_batch: usize,
    #[serde(default = "default_new_words_per_pass")]
    pub new_words_per_pass: usize,
}

impl MaintenanceConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn revision_interval(&self) -> Duration {
        Duration::from_secs(self.revision_interval_secs)
    }
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_maintenance_interval_secs(),
            revision_interval_secs: default_revision_interval_secs(),
            revision_batch: default_revision_batch(),
            new_words_per_pass: default_new_words_per_pass(),
        }
    }
}

fn default_maintenance_interval_secs() -> u64 {
    60
}

fn default_revision_interval_secs() -> u64 {
    86_400
}

fn default_revision_batch() -> usize {
    20
}

fn default_new_words_per_pass() -> usize {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    /// Base URL of the content generation service. Without it the node can
    /// serve cached exercises but cannot mint new ones.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_generator_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_generator_attempts")]
    pub attempts: usize,
}

impl GeneratorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: default_generator_timeout_ms(),
            attempts: default_generator_attempts(),
        }
    }
}

fn default_generator_timeout_ms() -> u64 {
    30_000
}

fn default_generator_attempts() -> usize {
    3
}
