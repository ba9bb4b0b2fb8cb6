//! Core domain concepts shared across all subdomains.
//!
//! - [`model::Model`]: the model name a provider session is opened for
//! - [`request::UserRequest`]: a validated user request entering the pipeline
//! - [`error::DomainError`]: domain-level errors

pub mod error;
pub mod model;
pub mod request;
