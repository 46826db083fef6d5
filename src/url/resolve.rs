use crate::{UrlError, UrlResult};
use url::Url;

/// Derives the session base (scheme and host, root path) from the listing entry URL
///
/// Every relative link found during the harvest is resolved against this base.
///
/// # Examples
///
/// ```
/// use reel_harvest::url::session_base;
///
/// let base = session_base("https://www.example.com/browse/movies/?page=1").unwrap();
/// assert_eq!(base.as_str(), "https://www.example.com/");
/// ```
pub fn session_base(entry_url: &str) -> UrlResult<Url> {
    let url = Url::parse(entry_url).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let host = url.host_str().ok_or(UrlError::MissingDomain)?;
    let mut root = format!("{}://{}", url.scheme(), host);
    if let Some(port) = url.port() {
        root.push_str(&format!(":{}", port));
    }
    root.push('/');

    Url::parse(&root).map_err(|e| UrlError::Parse(e.to_string()))
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be ignored:
/// - empty or fragment-only hrefs
/// - javascript:, mailto:, tel: and data: links
/// - hrefs that do not resolve to HTTP(S)
pub fn resolve_href(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base.join(href) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute.to_string())
        }
        _ => None,
    }
}

/// Canonical form of a detail page URL, used to drop duplicate listing tiles
///
/// The fragment is removed and a trailing slash on a non-root path is trimmed, so
/// `/m/film`, `/m/film/` and `/m/film#cast` are one identifier.
pub fn canonical_identifier(url: &str) -> UrlResult<String> {
    let mut parsed = Url::parse(url).map_err(|e| UrlError::Parse(e.to_string()))?;
    parsed.set_fragment(None);

    let path = parsed.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        parsed.set_path(path.trim_end_matches('/'));
    }

    Ok(parsed.to_string())
}
