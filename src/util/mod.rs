//! Utility functions shared by the fetchers and the feed builder.
//!
//! - **URL validation**: accept only absolute http(s) feed URLs
//! - **Text processing**: drop characters XML 1.0 cannot carry

mod text;
mod url_validator;

pub use text::strip_invalid_xml_chars;
pub use url_validator::{validate_url, UrlValidationError};
