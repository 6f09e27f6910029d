use thiserror::Error;
use url::Url;

/// Reasons a URL is refused before any request is made.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    #[error("Insecure URL: HTTPS required (except localhost)")]
    Insecure,
}

fn is_local_host(url: &Url) -> bool {
    matches!(
        url.host_str(),
        Some("localhost") | Some("127.0.0.1") | Some("[::1]")
    )
}

/// Validate a URL the client is about to request.
///
/// Only `http`/`https` are accepted, and plain `http` only for loopback
/// hosts (local mock servers).
///
/// ```
/// use portal::util::validate_api_url;
///
/// assert!(validate_api_url("https://rickandmortyapi.com/api").is_ok());
/// assert!(validate_api_url("http://127.0.0.1:8080/api").is_ok());
/// assert!(validate_api_url("http://rickandmortyapi.com/api").is_err());
/// assert!(validate_api_url("file:///etc/passwd").is_err());
/// ```
pub fn validate_api_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;
    match url.scheme() {
        "https" => Ok(url),
        "http" if is_local_host(&url) => Ok(url),
        "http" => Err(UrlValidationError::Insecure),
        scheme => Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }
}

/// Validate a URL before handing it to the system opener.
///
/// Image references come from the API, so anything other than a web URL
/// (e.g. `file:` or a bare command) is rejected.
pub fn validate_url_for_open(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }
}
