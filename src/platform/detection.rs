//! Accelerator detection for choosing a hardware preset.

#[cfg(target_os = "linux")]
use std::{fs, path::Path};
use std::process::{Command, Stdio};
use tracing::{debug, info};

use crate::config::OptimizationConfig;
use crate::presets::HardwarePreset;

/// Answers the two questions preset selection needs about the host.
///
/// Implementations must not fail: anything that cannot be determined counts
/// as "not available".
pub trait AcceleratorProbe {
    /// An Apple-style unified-memory GPU (MPS) is usable.
    fn unified_memory_available(&self) -> bool;

    /// A discrete CUDA GPU is usable.
    fn discrete_gpu_available(&self) -> bool;
}

/// A probe with fixed answers.
///
/// Useful when the answers come from elsewhere, such as the ML runtime that
/// will run inference, and in tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticProbe {
    pub unified_memory: bool,
    pub discrete_gpu: bool,
}

impl AcceleratorProbe for StaticProbe {
    fn unified_memory_available(&self) -> bool {
        self.unified_memory
    }

    fn discrete_gpu_available(&self) -> bool {
        self.discrete_gpu
    }
}

/// Best-effort inspection of the running host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl AcceleratorProbe for SystemProbe {
    fn unified_memory_available(&self) -> bool {
        let available = is_apple_silicon(std::env::consts::OS, std::env::consts::ARCH);
        debug!(available, "Probed unified-memory accelerator");
        available
    }

    fn discrete_gpu_available(&self) -> bool {
        let available = nvidia_driver_loaded() || nvidia_smi_lists_gpu();
        debug!(available, "Probed discrete GPU accelerator");
        available
    }
}

/// Pick the preset for the hardware `probe` reports, in priority order:
/// unified memory, then discrete GPU, then CPU.
pub fn detect_preset<P>(probe: &P) -> HardwarePreset
where
    P: AcceleratorProbe + ?Sized,
{
    let preset = if probe.unified_memory_available() {
        HardwarePreset::AppleSilicon
    } else if probe.discrete_gpu_available() {
        HardwarePreset::NvidiaGpu
    } else {
        HardwarePreset::Cpu
    };

    info!(preset = %preset, "Selected hardware preset");
    preset
}

impl OptimizationConfig {
    /// The preset matching what `probe` reports.
    pub fn detect<P>(probe: &P) -> Self
    where
        P: AcceleratorProbe + ?Sized,
    {
        detect_preset(probe).config()
    }

    /// The preset matching the running host, via [`SystemProbe`].
    pub fn detect_system() -> Self {
        Self::detect(&SystemProbe)
    }
}

fn is_apple_silicon(os: &str, arch: &str) -> bool {
    os == "macos" && arch == "aarch64"
}

fn nvidia_driver_loaded() -> bool {
    #[cfg(target_os = "linux")]
    {
        match fs::read_to_string("/proc/driver/nvidia/version") {
            Ok(version) => {
                debug!(driver = %version.lines().next().unwrap_or_default(), "NVIDIA driver found");
                true
            }
            Err(_) => Path::new("/dev/nvidiactl").exists(),
        }
    }

    #[cfg(not(target_os = "linux"))]
    {
        false
    }
}

fn nvidia_smi_lists_gpu() -> bool {
    match Command::new("nvidia-smi")
        .arg("-L")
        .stderr(Stdio::null())
        .output()
    {
        Ok(output) if output.status.success() => lists_gpu(&String::from_utf8_lossy(&output.stdout)),
        Ok(_) => false,
        Err(e) => {
            debug!("nvidia-smi not runnable: {}", e);
            false
        }
    }
}

/// `nvidia-smi -L` prints one `GPU <n>: ...` line per device.
fn lists_gpu(listing: &str) -> bool {
    listing.lines().any(|line| line.trim_start().starts_with("GPU "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unified_memory_wins() {
        let probe = StaticProbe {
            unified_memory: true,
            discrete_gpu: true,
        };
        assert_eq!(
            OptimizationConfig::detect(&probe),
            OptimizationConfig::for_apple_silicon()
        );
    }

    #[test]
    fn test_discrete_gpu_selected() {
        let probe = StaticProbe {
            unified_memory: false,
            discrete_gpu: true,
        };
        assert_eq!(detect_preset(&probe), HardwarePreset::NvidiaGpu);
        assert_eq!(
            OptimizationConfig::detect(&probe),
            OptimizationConfig::for_nvidia_gpu()
        );
    }

    #[test]
    fn test_cpu_fallback() {
        assert_eq!(
            OptimizationConfig::detect(&StaticProbe::default()),
            OptimizationConfig::for_cpu()
        );
    }

    #[test]
    fn test_probe_as_trait_object() {
        let probe: Box<dyn AcceleratorProbe> = Box::new(StaticProbe {
            unified_memory: true,
            discrete_gpu: false,
        });
        assert_eq!(detect_preset(probe.as_ref()), HardwarePreset::AppleSilicon);
    }

    #[test]
    fn test_apple_silicon_detection() {
        assert!(is_apple_silicon("macos", "aarch64"));
        assert!(!is_apple_silicon("macos", "x86_64"));
        assert!(!is_apple_silicon("linux", "aarch64"));
    }

    #[test]
    fn test_nvidia_smi_listing() {
        assert!(lists_gpu(
            "GPU 0: NVIDIA GeForce RTX 4090 (UUID: GPU-1234)\n"
        ));
        assert!(!lists_gpu("No devices were found\n"));
        assert!(!lists_gpu(""));
    }

    #[test]
    fn test_system_detection_returns_a_preset() {
        // Should not panic on any host and must land on one of the presets.
        let config = OptimizationConfig::detect_system();
        assert!(HardwarePreset::ALL
            .iter()
            .any(|preset| preset.config() == config));
    }
}
