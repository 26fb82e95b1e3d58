//! Chrome Trace (flame-style) execution profiler.
//!
//! Feature-gated span recording for the runtime's hot paths: frame flush,
//! query-cache builds, system updates, and parallel passes. When the
//! `profiling` feature is enabled, spans are collected into a Chrome Trace
//! Event JSON file viewable in `chrome://tracing` or Perfetto. When the
//! feature is disabled, every call compiles to an empty inline stub.
//!
//! ```no_run
//! use rift::profiling::profiler;
//!
//! profiler::init("profile/trace.json");
//! {
//!     let _g = profiler::span("frame");
//!     // run systems
//! }
//! profiler::shutdown();
//! ```

pub mod profiler;
