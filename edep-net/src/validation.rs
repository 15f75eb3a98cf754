// edep-net/src/validation.rs
use edep_common::error::{EdepError, Result};
use url::Url;

/// Parses an image-server URL. Anything that is not an absolute http(s) URL
/// is rejected.
pub fn validate_url(url_str: &str) -> Result<Url> {
    let url = Url::parse(url_str).map_err(|e| {
        EdepError::Validation(format!("ill-formed URL '{url_str}': {e}"))
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(EdepError::Validation(format!(
            "Invalid URL scheme for '{url_str}': must be http or https, but got '{other}'"
        ))),
    }
}
