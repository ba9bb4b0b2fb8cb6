//! Application-level configuration.
//!
//! - [`PipelineParams`]: retry bounds, timeouts and the tool policy the use
//!   cases run under

pub mod pipeline_params;

pub use pipeline_params::PipelineParams;
