//! Platform detection for hardware preset selection.
//!
//! Preset selection only needs two answers about the host: whether an
//! Apple-style unified-memory GPU is present, and whether a discrete CUDA GPU
//! is. Both sit behind [`AcceleratorProbe`] so callers can substitute what
//! their ML runtime reports, and tests can run without accelerator hardware.

pub mod detection;

pub use detection::{detect_preset, AcceleratorProbe, StaticProbe, SystemProbe};
