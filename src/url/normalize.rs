use crate::url::domain::strip_www;
use crate::url::{DomainScope, RejectReason};
use crate::UrlError;
use url::form_urlencoded;
use url::Url;

/// Query parameters removed during canonicalization (compared lowercased)
const TRACKING_PARAMS: &[&str] = &[
    // Campaign and click tracking
    "gclid",
    "fbclid",
    "mc_eid",
    "ref",
    "source",
    // Session identifiers
    "sid",
    "phpsessid",
    "jsessionid",
    "sessionid",
    "session_id",
    "aspsessionid",
    // Cache busting
    "_",
    "cb",
    "cachebuster",
    "nocache",
];

/// Normalizes an absolute URL
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything that is not http or https
/// 3. Lowercase the host and remove a `www.` prefix
/// 4. Normalize path:
///    - Collapse repeated slashes
///    - Remove dot segments (. and ..)
///    - Remove trailing slash (except for root /)
///    - Empty path becomes /
/// 5. Remove fragment (everything after #)
/// 6. Remove tracking and session query parameters
/// 7. Sort remaining query parameters by key, then value
/// 8. Remove empty query string (trailing ?)
///
/// The scheme is kept as-is; `http://x.com/a` and `https://x.com/a` stay distinct.
///
/// # Examples
///
/// ```
/// use wavecrawl::url::normalize_url;
///
/// let url = normalize_url("https://WWW.EXAMPLE.COM/page/").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/page");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(url)
}

/// Resolves `raw_href` against `base_url` and canonicalizes it within `scope`
///
/// Returns `None` for anything that cannot be crawled: malformed hrefs,
/// non-http(s) schemes and hosts outside the scope. This is a normal filtered
/// outcome, not an error.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use wavecrawl::url::{canonicalize, DomainScope};
///
/// let base = Url::parse("https://example.com/blog/").unwrap();
/// let scope = DomainScope::new("example.com").unwrap();
///
/// let url = canonicalize("post/?utm_source=x#top", &base, &scope).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/blog/post");
///
/// assert!(canonicalize("https://other.com/", &base, &scope).is_none());
/// assert!(canonicalize("mailto:me@example.com", &base, &scope).is_none());
/// ```
pub fn canonicalize(raw_href: &str, base_url: &Url, scope: &DomainScope) -> Option<Url> {
    canonicalize_with_reason(raw_href, Some(base_url), scope).ok()
}

/// Like [`canonicalize`], but reports why a URL was declined
///
/// Without a base URL, `raw_href` must be absolute.
pub fn canonicalize_with_reason(
    raw_href: &str,
    base_url: Option<&Url>,
    scope: &DomainScope,
) -> Result<Url, RejectReason> {
    let raw_href = raw_href.trim();
    if raw_href.is_empty() {
        return Err(RejectReason::InvalidUrl);
    }

    let resolved = match base_url {
        Some(base) => base.join(raw_href),
        None => Url::parse(raw_href),
    }
    .map_err(|_| RejectReason::InvalidUrl)?;

    let url = normalize_parsed(resolved).map_err(|e| match e {
        UrlError::InvalidScheme(_) => RejectReason::UnsupportedScheme,
        _ => RejectReason::InvalidUrl,
    })?;

    if !scope.contains(&url) {
        return Err(RejectReason::CrossDomain);
    }

    Ok(url)
}

fn normalize_parsed(mut url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or(UrlError::MissingDomain)?
        .to_lowercase();
    let stripped = strip_www(&host);
    if stripped.len() != host.len() {
        url.set_host(Some(stripped))
            .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(params.iter())
                .finish();
            url.set_query(Some(&query));
        }
    }

    Ok(url)
}

/// Normalizes a URL path by collapsing slashes, removing dot segments and
/// dropping the trailing slash
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

/// Filters out tracking parameters and sorts the rest by key, then value
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort();
    params
}

/// Checks if a query parameter is a tracking or session parameter
fn is_tracking_param(key: &str) -> bool {
    let key = key.to_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}
