//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/deductree/deductree.toml`
//! 3. Local config: `--config FILE`, or `./deductree.toml` if present
//! 4. Environment variables: `DEDUCTREE_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::services::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_RETRIES};
use crate::application::ApplicationError;
use crate::domain::BranchingPolicy;
use crate::util::path::{expand_env_vars, expand_path};

/// Name of the local config file picked up from the working directory.
pub const LOCAL_CONFIG_FILE: &str = "deductree.toml";

/// One `{ depth, probability }` entry of the branching policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BranchEntry {
    pub depth: usize,
    pub probability: f64,
}

/// Skeleton shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StructureConfig {
    /// Nodes at this depth get no child slots
    pub depth: usize,
    /// Enables random pruning for probabilities below 1.0
    pub prune: bool,
    pub branching: Vec<BranchEntry>,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            depth: 3,
            prune: false,
            branching: vec![BranchEntry {
                depth: 2,
                probability: 1.0,
            }],
        }
    }
}

impl StructureConfig {
    pub fn branching_policy(&self) -> BranchingPolicy {
        self.branching
            .iter()
            .map(|e| (e.depth, e.probability))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExpansionConfig {
    pub max_depth: usize,
    /// Retries after the first attempt before a branch is discarded
    pub max_retries: usize,
    /// Consult the external judge after the word-list checks
    pub use_model_validator: bool,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_retries: DEFAULT_MAX_RETRIES,
            use_model_validator: false,
        }
    }
}

/// External command that proposes child lines (prompt on stdin).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProducerConfig {
    pub command: Option<String>,
    pub args: Vec<String>,
    /// Process-level attempts per request before the build aborts
    pub transport_attempts: u32,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: vec![],
            transport_attempts: 3,
        }
    }
}

/// External commands answering the leakage question with Yes/No.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct JudgeConfig {
    pub command: Option<String>,
    pub args: Vec<String>,
    /// Cheaper judge asked first; its acceptance is final
    pub early_escape_command: Option<String>,
    pub early_escape_args: Vec<String>,
}

/// Unified configuration for deductree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Directory for generated records (default: ./output)
    pub output_dir: PathBuf,
    /// RNG seed; random when unset
    pub seed: Option<u64>,
    /// TOML file overriding built-in guideline entries
    pub guidelines_file: Option<PathBuf>,
    pub structure: StructureConfig,
    pub expansion: ExpansionConfig,
    pub producer: ProducerConfig,
    pub judge: JudgeConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            seed: None,
            guidelines_file: None,
            structure: StructureConfig::default(),
            expansion: ExpansionConfig::default(),
            producer: ProducerConfig::default(),
            judge: JudgeConfig::default(),
        }
    }
}

/// Raw settings for intermediate parsing (`None` = not specified, inherit).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub output_dir: Option<PathBuf>,
    pub seed: Option<u64>,
    pub guidelines_file: Option<PathBuf>,
    pub structure: RawStructureConfig,
    pub expansion: RawExpansionConfig,
    pub producer: RawProducerConfig,
    pub judge: RawJudgeConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawStructureConfig {
    pub depth: Option<usize>,
    pub prune: Option<bool>,
    pub branching: Option<Vec<BranchEntry>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawExpansionConfig {
    pub max_depth: Option<usize>,
    pub max_retries: Option<usize>,
    pub use_model_validator: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawProducerConfig {
    pub command: Option<String>,
    pub args: Option<Vec<String>>,
    pub transport_attempts: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawJudgeConfig {
    pub command: Option<String>,
    pub args: Option<Vec<String>>,
    pub early_escape_command: Option<String>,
    pub early_escape_args: Option<Vec<String>>,
}

/// Get the XDG config directory for deductree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "deductree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("deductree.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        self.output_dir = expand_path(&self.output_dir);
        self.guidelines_file = self.guidelines_file.as_deref().map(expand_path);
        self.producer.command = self.producer.command.as_deref().map(expand_env_vars);
        self.judge.command = self.judge.command.as_deref().map(expand_env_vars);
        self.judge.early_escape_command = self
            .judge
            .early_escape_command
            .as_deref()
            .map(expand_env_vars);
    }

    /// Overlay wins wherever it specifies a value; lists are replaced, not merged.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        let s = &overlay.structure;
        let e = &overlay.expansion;
        let p = &overlay.producer;
        let j = &overlay.judge;
        Self {
            output_dir: overlay
                .output_dir
                .clone()
                .unwrap_or_else(|| self.output_dir.clone()),
            seed: overlay.seed.or(self.seed),
            guidelines_file: overlay
                .guidelines_file
                .clone()
                .or_else(|| self.guidelines_file.clone()),
            structure: StructureConfig {
                depth: s.depth.unwrap_or(self.structure.depth),
                prune: s.prune.unwrap_or(self.structure.prune),
                branching: s
                    .branching
                    .clone()
                    .unwrap_or_else(|| self.structure.branching.clone()),
            },
            expansion: ExpansionConfig {
                max_depth: e.max_depth.unwrap_or(self.expansion.max_depth),
                max_retries: e.max_retries.unwrap_or(self.expansion.max_retries),
                use_model_validator: e
                    .use_model_validator
                    .unwrap_or(self.expansion.use_model_validator),
            },
            producer: ProducerConfig {
                command: p.command.clone().or_else(|| self.producer.command.clone()),
                args: p.args.clone().unwrap_or_else(|| self.producer.args.clone()),
                transport_attempts: p
                    .transport_attempts
                    .unwrap_or(self.producer.transport_attempts),
            },
            judge: JudgeConfig {
                command: j.command.clone().or_else(|| self.judge.command.clone()),
                args: j.args.clone().unwrap_or_else(|| self.judge.args.clone()),
                early_escape_command: j
                    .early_escape_command
                    .clone()
                    .or_else(|| self.judge.early_escape_command.clone()),
                early_escape_args: j
                    .early_escape_args
                    .clone()
                    .unwrap_or_else(|| self.judge.early_escape_args.clone()),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local` - Explicit config file; must exist when given. Without it,
    ///   `./deductree.toml` is used if present.
    pub fn load(local: Option<&Path>) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        // 3. Local config
        match local {
            Some(path) => {
                if !path.exists() {
                    return Err(ApplicationError::Config {
                        message: format!("config file not found: {}", path.display()),
                    });
                }
                current = current.merge_with(&load_raw_settings(path)?);
            }
            None => {
                let default_local = Path::new(LOCAL_CONFIG_FILE);
                if default_local.exists() {
                    current = current.merge_with(&load_raw_settings(default_local)?);
                }
            }
        }

        // 4. Environment variables (explicit override)
        current = Self::apply_env_overrides(current)?;

        current.expand_paths();
        Ok(current)
    }

    /// Load from one file on top of the defaults, ignoring global config and env vars.
    pub fn load_file(path: &Path) -> Result<Self, ApplicationError> {
        let mut settings = Self::default().merge_with(&load_raw_settings(path)?);
        settings.expand_paths();
        Ok(settings)
    }

    /// Apply DEDUCTREE_* environment variables as explicit overrides.
    ///
    /// `structure.branching` has no environment form.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let builder = Config::builder().add_source(
            Environment::with_prefix("DEDUCTREE")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("producer.args")
                .with_list_parse_key("judge.args")
                .with_list_parse_key("judge.early_escape_args"),
        );

        let config = builder.build().map_err(config_err)?;

        if let Ok(val) = config.get_string("output_dir") {
            settings.output_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get::<u64>("seed") {
            settings.seed = Some(val);
        }
        if let Ok(val) = config.get_string("guidelines_file") {
            settings.guidelines_file = Some(PathBuf::from(val));
        }
        if let Ok(val) = config.get::<usize>("structure.depth") {
            settings.structure.depth = val;
        }
        if let Ok(val) = config.get_bool("structure.prune") {
            settings.structure.prune = val;
        }
        if let Ok(val) = config.get::<usize>("expansion.max_depth") {
            settings.expansion.max_depth = val;
        }
        if let Ok(val) = config.get::<usize>("expansion.max_retries") {
            settings.expansion.max_retries = val;
        }
        if let Ok(val) = config.get_bool("expansion.use_model_validator") {
            settings.expansion.use_model_validator = val;
        }
        if let Ok(val) = config.get_string("producer.command") {
            settings.producer.command = Some(val);
        }
        if let Ok(val) = config.get::<Vec<String>>("producer.args") {
            settings.producer.args = val;
        }
        if let Ok(val) = config.get::<u32>("producer.transport_attempts") {
            settings.producer.transport_attempts = val;
        }
        if let Ok(val) = config.get_string("judge.command") {
            settings.judge.command = Some(val);
        }
        if let Ok(val) = config.get::<Vec<String>>("judge.args") {
            settings.judge.args = val;
        }
        if let Ok(val) = config.get_string("judge.early_escape_command") {
            settings.judge.early_escape_command = Some(val);
        }
        if let Ok(val) = config.get::<Vec<String>>("judge.early_escape_args") {
            settings.judge.early_escape_args = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# deductree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/deductree/deductree.toml
#   Local:  --config FILE, or ./deductree.toml
#   Env:    DEDUCTREE_* environment variables, nested keys joined by "__"
#           (e.g. DEDUCTREE_EXPANSION__MAX_RETRIES=5)

# Directory for generated dataset records
# output_dir = "output"

# Fixed RNG seed for reproducible skeletons and chapter sampling
# seed = 42

# TOML file whose [<element>.<level>] entries replace the built-in guidelines
# guidelines_file = "~/deductree/guidelines.toml"

[structure]
# Nodes at this depth are leaves
# depth = 3
# Randomly drop child slots where the branching probability is below 1.0
# prune = false
# Per-depth inclusion probability; 0.0 stops the skeleton at that depth
# branching = [{ depth = 2, probability = 1.0 }]

[expansion]
# Nodes at this depth are never expanded
# max_depth = 3
# Retries after the first attempt before a branch is discarded
# max_retries = 3
# Ask the judge whether a deduction proves another legal element
# use_model_validator = false

[producer]
# Command receiving the prompt on stdin and printing three tagged lines
# command = "llm"
# args = ["-m", "gpt-4o"]
# transport_attempts = 3

[judge]
# command = "llm"
# args = ["-m", "gpt-4o"]
# early_escape_command = "llm"
# early_escape_args = ["-m", "gpt-4o-mini"]
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
