//! Optimization settings for RVC inference.
//!
//! [`OptimizationConfig`] is the single record the inference pipeline reads to
//! decide device placement, precision and batching. It can be built from
//! literal defaults, from `RVC_*` environment variables, from a named hardware
//! preset (see [`crate::presets`]), by probing the host (see
//! [`crate::platform`]), or by layering a config file under the environment.

use std::env;
use std::fmt;
use std::path::Path;

use figment::{
    providers::{Format, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ConfigError, Result};

/// Environment variable names read by [`OptimizationConfig::from_env`].
pub mod env_vars {
    /// Route feature retrieval to the accelerator.
    pub const GPU_RETRIEVAL: &str = "RVC_GPU_RETRIEVAL";

    /// Request half-precision arithmetic.
    pub const USE_FP16: &str = "RVC_USE_FP16";

    /// Route audio filtering to the accelerator.
    pub const GPU_FILTER: &str = "RVC_GPU_FILTER";

    /// Number of audio segments processed together.
    pub const BATCH_SIZE: &str = "RVC_BATCH_SIZE";

    /// Target compute backend.
    pub const DEVICE: &str = "RVC_DEVICE";

    /// Enable timing collection.
    pub const PROFILING: &str = "RVC_PROFILING";

    /// Every variable, in the order they are documented.
    pub const ALL: [&str; 6] = [GPU_RETRIEVAL, USE_FP16, GPU_FILTER, BATCH_SIZE, DEVICE, PROFILING];
}

/// Default config file looked up by the `rvc-optimize` binary.
pub const DEFAULT_CONFIG_FILE: &str = "rvc-optimization.toml";

/// Target compute backend.
///
/// Strings outside the known set are kept as [`Device::Other`] rather than
/// rejected; the consumer decides whether it can use them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Device {
    /// Let the inference runtime pick.
    #[default]
    Auto,
    /// Apple unified-memory GPU (Metal Performance Shaders).
    Mps,
    /// NVIDIA discrete GPU.
    Cuda,
    /// Host CPU only.
    Cpu,
    /// Anything else, passed through uninterpreted.
    Other(String),
}

impl Device {
    /// Parse a backend name, matching the known names case-insensitively.
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "auto" => Device::Auto,
            "mps" => Device::Mps,
            "cuda" => Device::Cuda,
            "cpu" => Device::Cpu,
            _ => Device::Other(value.to_string()),
        }
    }

    /// The backend name as the inference runtime expects it.
    pub fn as_str(&self) -> &str {
        match self {
            Device::Auto => "auto",
            Device::Mps => "mps",
            Device::Cuda => "cuda",
            Device::Cpu => "cpu",
            Device::Other(name) => name,
        }
    }

    /// Whether this names a GPU backend.
    pub fn is_accelerator(&self) -> bool {
        matches!(self, Device::Mps | Device::Cuda)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Device {
    fn from(value: String) -> Self {
        Device::parse(&value)
    }
}

impl From<Device> for String {
    fn from(device: Device) -> Self {
        match device {
            Device::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

/// Inference optimization settings.
///
/// Built once at startup and handed to consumers by value. Every field has a
/// default, so config files may omit any key; unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizationConfig {
    /// Run feature retrieval on the accelerator instead of host memory.
    pub use_gpu_retrieval: bool,

    /// Reduced-precision (fp16) inference. Faster, may affect quality.
    pub use_fp16: bool,

    /// GPU-based audio filtering. Experimental.
    pub use_gpu_filter: bool,

    /// Audio segments processed together; 1 disables batching.
    pub batch_size: usize,

    /// Target compute backend.
    pub device: Device,

    /// Collect timing metrics with a [`Profiler`](crate::performance::Profiler).
    pub enable_profiling: bool,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            use_gpu_retrieval: true,
            use_fp16: false,
            use_gpu_filter: false,
            batch_size: 1,
            device: Device::Auto,
            enable_profiling: false,
        }
    }
}

impl OptimizationConfig {
    /// Build from `RVC_*` environment variables.
    ///
    /// Unset variables keep their default. Boolean variables are true only when
    /// equal to `"true"` ignoring case. Fails only when `RVC_BATCH_SIZE` is set
    /// to something other than a positive integer.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with the variables supplied by
    /// `lookup` instead of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::default().with_overrides(lookup)
    }

    /// Load with precedence (highest first):
    /// 1. `RVC_*` environment variables
    /// 2. the config file at `path` (TOML, or YAML for `.yaml`/`.yml`), if it exists
    /// 3. built-in defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with(path, |key| env::var(key).ok())
    }

    /// [`load`](Self::load) with an injected variable lookup.
    pub fn load_with<F>(path: impl AsRef<Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = path.as_ref();
        let figment = Figment::from(Serialized::defaults(Self::default()));
        let figment = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => figment.merge(Yaml::file(path)),
            _ => figment.merge(Toml::file(path)),
        };

        let from_file: Self = figment.extract()?;
        debug!(path = %path.display(), "Loaded file layer of optimization config");

        let config = from_file.with_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply whichever `RVC_*` variables `lookup` knows about on top of `self`.
    fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(env_vars::GPU_RETRIEVAL) {
            self.use_gpu_retrieval = parse_flag(&value);
        }
        if let Some(value) = lookup(env_vars::USE_FP16) {
            self.use_fp16 = parse_flag(&value);
        }
        if let Some(value) = lookup(env_vars::GPU_FILTER) {
            self.use_gpu_filter = parse_flag(&value);
        }
        if let Some(value) = lookup(env_vars::BATCH_SIZE) {
            self.batch_size = parse_batch_size(&value)?;
        }
        if let Some(value) = lookup(env_vars::DEVICE) {
            self.device = Device::parse(&value);
        }
        if let Some(value) = lookup(env_vars::PROFILING) {
            self.enable_profiling = parse_flag(&value);
        }
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize {
                value: "0".to_string(),
                reason: "batch size must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Export to TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Export to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Log the effective settings as one structured event.
    pub fn log_summary(&self) {
        info!(
            device = %self.device,
            use_gpu_retrieval = self.use_gpu_retrieval,
            use_fp16 = self.use_fp16,
            use_gpu_filter = self.use_gpu_filter,
            batch_size = self.batch_size,
            enable_profiling = self.enable_profiling,
            "Effective optimization configuration"
        );
    }
}

/// `"true"` in any case is true; everything else is false.
fn parse_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}

fn parse_batch_size(value: &str) -> Result<usize> {
    let batch_size: usize = value
        .trim()
        .parse()
        .map_err(|e: std::num::ParseIntError| ConfigError::InvalidBatchSize {
            value: value.to_string(),
            reason: e.to_string(),
        })?;

    if batch_size == 0 {
        return Err(ConfigError::InvalidBatchSize {
            value: value.to_string(),
            reason: "batch size must be at least 1".to_string(),
        });
    }
    Ok(batch_size)
}
