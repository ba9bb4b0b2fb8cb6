//! Output formatting for plans, registries and reports

pub mod console;
