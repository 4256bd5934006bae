// THEORY:
// This file is the main entry point for the `globulink` library crate.
// It follows the standard Rust convention of using `lib.rs` to define the public
// API that will be exposed to external consumers (like the `batch_analyzer`
// driver and the `globulink_visualizer` renderer).
//
// The primary goal is to export the `LinkPipeline` and its associated data
// structures (`LinkerConfig`, `Assignment`, `LinkStatistics`, etc.) as the
// clean, high-level interface for the entire linking engine. All the internal
// modules (`core_modules`) are encapsulated behind `pipeline`, providing a
// clean separation of concerns.

pub mod core_modules;
pub mod pipeline;
