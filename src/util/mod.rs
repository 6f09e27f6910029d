//! Small shared helpers.
//!
//! - **URL validation**: scheme and transport checks for API and browser URLs
//! - **Text processing**: Unicode-aware width measurement and truncation for grid cells

mod text;
mod url_validator;

pub use text::{display_width, sanitize, truncate_to_width};
pub use url_validator::{validate_api_url, validate_url_for_open, UrlValidationError};
