//! Output configuration shared by the presentation layer.

pub mod output_format;

pub use output_format::OutputFormat;
