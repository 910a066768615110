//! Canonical form for discovered URLs.

use crate::error::NormalizeError;
use url::Url;

/// Canonicalize a raw URL.
///
/// Host-only input gets an `http://` prefix. Scheme and host are lower-cased,
/// the fragment is removed and a default port (80/443) is dropped. Path and
/// query are left as the standard parser cleans them.
pub fn normalize(raw: &str) -> Result<String, NormalizeError> {
    let raw = raw.trim();
    let with_scheme;
    let input = if raw.contains("://") {
        raw
    } else {
        with_scheme = format!("http://{raw}");
        &with_scheme
    };

    let mut url = Url::parse(input).map_err(|source| NormalizeError::InvalidUrl {
        input: raw.to_string(),
        source,
    })?;

    // Scheme/host lower-casing and default-port removal happen in the parser
    // for special schemes.
    url.set_fragment(None);

    Ok(url.to_string())
}

/// Host of a canonical URL, if it has one.
pub fn host_of(canonical: &str) -> Option<String> {
    Url::parse(canonical)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
}
