#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod error;
pub mod headers;

pub use error::HttpError;
pub use headers::{HeaderRule, apply_header_rules};
