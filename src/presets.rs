//! Named hardware presets.
//!
//! Each preset is a fixed bundle of [`OptimizationConfig`] values for one
//! hardware class. The values are starting points, not measured results; a
//! config file or `RVC_*` variables can override any of them via
//! [`OptimizationConfig::load`].

use std::fmt;
use std::str::FromStr;

use crate::config::{Device, OptimizationConfig};
use crate::error::ConfigError;

/// Hardware classes with a tuned preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HardwarePreset {
    /// Apple Silicon (M1 and later) through MPS.
    AppleSilicon,
    /// NVIDIA GPUs through CUDA.
    NvidiaGpu,
    /// No accelerator.
    Cpu,
}

impl HardwarePreset {
    /// Every preset, in auto-detection priority order.
    pub const ALL: [HardwarePreset; 3] = [
        HardwarePreset::AppleSilicon,
        HardwarePreset::NvidiaGpu,
        HardwarePreset::Cpu,
    ];

    /// Registry name of the preset.
    pub fn name(self) -> &'static str {
        match self {
            HardwarePreset::AppleSilicon => "apple_silicon",
            HardwarePreset::NvidiaGpu => "nvidia_gpu",
            HardwarePreset::Cpu => "cpu",
        }
    }

    /// The preset's settings.
    pub fn config(self) -> OptimizationConfig {
        match self {
            HardwarePreset::AppleSilicon => OptimizationConfig::for_apple_silicon(),
            HardwarePreset::NvidiaGpu => OptimizationConfig::for_nvidia_gpu(),
            HardwarePreset::Cpu => OptimizationConfig::for_cpu(),
        }
    }
}

impl fmt::Display for HardwarePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HardwarePreset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        HardwarePreset::ALL
            .into_iter()
            .find(|preset| preset.name() == normalized)
            .ok_or_else(|| ConfigError::UnknownPreset(s.to_string()))
    }
}

impl OptimizationConfig {
    /// Apple Silicon: GPU retrieval on, fp16 off (little gain on MPS), no
    /// GPU filtering, no batching.
    pub fn for_apple_silicon() -> Self {
        Self {
            use_gpu_retrieval: true,
            use_fp16: false,
            use_gpu_filter: false,
            batch_size: 1,
            device: Device::Mps,
            enable_profiling: false,
        }
    }

    /// NVIDIA GPU: fp16 and GPU filtering on, batches of 4.
    pub fn for_nvidia_gpu() -> Self {
        Self {
            use_gpu_retrieval: true,
            use_fp16: true,
            use_gpu_filter: true,
            batch_size: 4,
            device: Device::Cuda,
            enable_profiling: false,
        }
    }

    /// CPU-only inference with every acceleration flag off.
    pub fn for_cpu() -> Self {
        Self {
            use_gpu_retrieval: false,
            use_fp16: false,
            use_gpu_filter: false,
            batch_size: 1,
            device: Device::Cpu,
            enable_profiling: false,
        }
    }

    /// Settings for `preset`; same as [`HardwarePreset::config`].
    pub fn for_preset(preset: HardwarePreset) -> Self {
        preset.config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apple_silicon_preset() {
        let config = OptimizationConfig::for_apple_silicon();
        assert_eq!(
            (
                config.use_gpu_retrieval,
                config.use_fp16,
                config.use_gpu_filter,
                config.batch_size,
                config.device,
                config.enable_profiling,
            ),
            (true, false, false, 1, Device::Mps, false)
        );
    }

    #[test]
    fn test_nvidia_gpu_preset() {
        let config = OptimizationConfig::for_nvidia_gpu();
        assert_eq!(
            (
                config.use_gpu_retrieval,
                config.use_fp16,
                config.use_gpu_filter,
                config.batch_size,
                config.device,
                config.enable_profiling,
            ),
            (true, true, true, 4, Device::Cuda, false)
        );
    }

    #[test]
    fn test_cpu_preset() {
        let config = OptimizationConfig::for_cpu();
        assert_eq!(
            (
                config.use_gpu_retrieval,
                config.use_fp16,
                config.use_gpu_filter,
                config.batch_size,
                config.device,
                config.enable_profiling,
            ),
            (false, false, false, 1, Device::Cpu, false)
        );
    }

    #[test]
    fn test_registry_matches_constructors() {
        for preset in HardwarePreset::ALL {
            assert_eq!(OptimizationConfig::for_preset(preset), preset.config());
            assert_eq!(preset.name().parse::<HardwarePreset>().unwrap(), preset);
        }
        assert_eq!(
            HardwarePreset::NvidiaGpu.config(),
            OptimizationConfig::for_nvidia_gpu()
        );
    }

    #[test]
    fn test_preset_name_parsing() {
        assert_eq!(
            "Apple-Silicon".parse::<HardwarePreset>().unwrap(),
            HardwarePreset::AppleSilicon
        );
        assert_eq!(" CPU ".parse::<HardwarePreset>().unwrap(), HardwarePreset::Cpu);

        let err = "tpu".parse::<HardwarePreset>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPreset(ref name) if name == "tpu"));
    }
}
