//! The `rvc_optimization` core library.
//!
//! Optimization settings for RVC voice-conversion inference: per-hardware
//! presets, resolution from environment variables and config files, host
//! accelerator detection, and an opt-in interval profiler.

pub mod config;
pub mod error;
pub mod performance;
pub mod platform;
pub mod presets;

pub use config::{Device, OptimizationConfig};
pub use error::{ConfigError, Result};
pub use performance::Profiler;
pub use presets::HardwarePreset;
