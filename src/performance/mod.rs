//! Timing instrumentation for the inference pipeline.
//!
//! The [`Profiler`] is an explicitly constructed value, not global state:
//! build one (usually with [`Profiler::from_config`]) and pass `&mut` to the
//! stages that should be timed.
//!
//! ```rust
//! use rvc_optimization::performance::Profiler;
//!
//! let mut profiler = Profiler::new(true);
//! profiler.start("feature_retrieval");
//! // ... run the stage ...
//! profiler.end("feature_retrieval");
//!
//! let converted = profiler.measure("conversion", || 2 + 2);
//! assert_eq!(converted, 4);
//! println!("{}", profiler.report());
//! ```

pub mod profiler;

pub use profiler::{OperationStats, ProfileScope, Profiler, EMPTY_REPORT, REPORT_HEADER};
