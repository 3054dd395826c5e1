//! URL canonicalization for cache keys and origin checks.

use url::Url;

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("outside the site origin: {0}")]
    CrossOrigin(String),
}

/// Canonicalize a URL string so equal resources produce equal cache keys.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };
    let parsed = Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    normalize(parsed)
}

/// Resolve `target` against the site origin.
///
/// Origin-relative paths (`/js/app.js`, `data/x.json`) are joined onto
/// `origin`; absolute `http(s)` URLs are taken as they are.
pub fn resolve(origin: &Url, target: &str) -> Result<Url, UrlError> {
    let trimmed = target.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    if trimmed.contains("://") {
        return canonicalize(trimmed);
    }

    let joined = origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    normalize(joined)
}

/// Like [`resolve`], but rejects URLs that leave `origin`.
///
/// Used wherever a caller-supplied path is fetched on the caller's behalf.
pub fn resolve_in_origin(origin: &Url, target: &str) -> Result<Url, UrlError> {
    let url = resolve(origin, target)?;
    if !same_origin(origin, &url) {
        return Err(UrlError::CrossOrigin(url.to_string()));
    }
    Ok(url)
}

/// Same scheme, host and port.
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}

fn normalize(mut parsed: Url) -> Result<Url, UrlError> {
    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let host = host.to_lowercase();
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}
