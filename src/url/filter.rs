//! Relevance filter for canonical URLs
//!
//! Pure checks over static rule tables. The frontier calls [`check_relevance`]
//! after canonicalization and records the returned reason code.

use crate::url::RejectReason;
use url::Url;

/// File extensions that never lead to a crawlable page
const EXCLUDED_EXTENSIONS: &[&str] = &[
    ".js", ".css", ".json", ".xml", ".txt", ".ico", ".jpg", ".jpeg", ".png", ".gif", ".webp",
    ".bmp", ".svg", ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".zip", ".rar", ".7z", ".mp3",
    ".mp4", ".avi", ".woff", ".woff2", ".ttf", ".eot", ".map",
];

/// Cart, checkout, account and admin endpoints
const ECOMMERCE_PATTERNS: &[&str] = &[
    "/checkout/cart/add/",
    "/checkout/cart/",
    "/checkout/",
    "/cart/",
    "/customer/account/",
    "/customer/section/load/",
    "/my-account/",
    "/wishlist/index/add/",
    "/review/product/post/",
    "/newsletter/subscriber/",
    "/sales/order/",
    "/downloadable/download/",
    "/paypal/",
    "/rest/v1/",
    "/graphql",
    "/admin/",
];

/// CMS asset directories, API endpoints and embedded third-party hosts
const TECHNICAL_PATTERNS: &[&str] = &[
    "/wp-content/uploads/",
    "/wp-content/themes/",
    "/wp-content/plugins/",
    "/wp-includes/",
    "/wp-admin/",
    "/wp-json/",
    "/assets/",
    "/static/",
    "/media/",
    "/images/",
    "/node_modules/",
    "/vendor/",
    "/_next/",
    "/dist/",
    "/api/",
    "/ajax/",
    "/cron/",
    "/cache/",
    "google-analytics",
    "googleapis.com",
    "facebook.com",
    "cloudflare",
    "jquery",
    "bootstrap",
    "fontawesome",
];

/// Query parameter prefixes, matched against `key=`
///
/// Canonicalization already strips these; the check catches anything that
/// reaches the filter by another route.
const PROBLEMATIC_PARAMS: &[&str] = &["sid=", "phpsessid=", "utm_", "gclid=", "fbclid="];

/// Why the filter declined a URL, and which rule matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterMatch {
    pub reason: RejectReason,
    pub rule: &'static str,
}

/// Checks a canonical URL against the relevance rules
///
/// Path patterns are matched against the lowercased path with a trailing `/`
/// appended, so `/admin/` also catches the canonical `/admin`. Host-like
/// patterns are matched against the whole lowercased URL.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use wavecrawl::url::{check_relevance, RejectReason};
///
/// let css = Url::parse("https://example.com/site.css").unwrap();
/// assert_eq!(check_relevance(&css).unwrap_err().reason, RejectReason::FileExtension);
///
/// let page = Url::parse("https://example.com/about").unwrap();
/// assert!(check_relevance(&page).is_ok());
/// ```
pub fn check_relevance(url: &Url) -> Result<(), FilterMatch> {
    let full = url.as_str().to_lowercase();
    let path = url.path().to_lowercase();
    let path_with_slash = if path.ends_with('/') {
        path.clone()
    } else {
        format!("{}/", path)
    };

    let matches = |pattern: &str| path_with_slash.contains(pattern) || full.contains(pattern);

    if let Some(rule) = ECOMMERCE_PATTERNS.iter().copied().find(|p| matches(p)) {
        return Err(FilterMatch {
            reason: RejectReason::Ecommerce,
            rule,
        });
    }

    if let Some(rule) = EXCLUDED_EXTENSIONS
        .iter()
        .copied()
        .find(|ext| path.ends_with(ext))
    {
        return Err(FilterMatch {
            reason: RejectReason::FileExtension,
            rule,
        });
    }

    if let Some(rule) = TECHNICAL_PATTERNS.iter().copied().find(|p| matches(p)) {
        return Err(FilterMatch {
            reason: RejectReason::Technical,
            rule,
        });
    }

    for (key, _) in url.query_pairs() {
        let needle = format!("{}=", key.to_lowercase());
        if let Some(rule) = PROBLEMATIC_PARAMS
            .iter()
            .copied()
            .find(|p| needle.starts_with(p))
        {
            return Err(FilterMatch {
                reason: RejectReason::TrackingParam,
                rule,
            });
        }
    }

    Ok(())
}

/// Returns true if the canonical URL is worth fetching
pub fn is_relevant(url: &Url) -> bool {
    check_relevance(url).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(raw: &str) -> Option<RejectReason> {
        let url = Url::parse(raw).unwrap();
        check_relevance(&url).err().map(|m| m.reason)
    }

    #[test]
    fn test_plain_pages_are_relevant() {
        for raw in [
            "https://example.com/",
            "https://example.com/about",
            "https://example.com/blog/post-1",
            "https://example.com/products?page=2",
            "https://example.com/cartography",
        ] {
            assert!(is_relevant(&Url::parse(raw).unwrap()), "{} should pass", raw);
        }
    }

    #[test]
    fn test_file_extensions() {
        assert_eq!(reason("https://example.com/style.css"), Some(RejectReason::FileExtension));
        assert_eq!(reason("https://example.com/app.JS"), Some(RejectReason::FileExtension));
        assert_eq!(reason("https://example.com/doc.pdf"), Some(RejectReason::FileExtension));
        assert_eq!(
            reason("https://example.com/font.woff2?v=3"),
            Some(RejectReason::FileExtension)
        );
        assert_eq!(reason("https://example.com/sitemap.xml"), Some(RejectReason::FileExtension));
    }

    #[test]
    fn test_extension_only_checked_on_path() {
        assert_eq!(reason("https://example.com/view?file=a.pdf"), None);
    }

    #[test]
    fn test_ecommerce_patterns() {
        assert_eq!(reason("https://example.com/checkout/cart"), Some(RejectReason::Ecommerce));
        assert_eq!(reason("https://example.com/admin"), Some(RejectReason::Ecommerce));
        assert_eq!(reason("https://example.com/admin/users"), Some(RejectReason::Ecommerce));
        assert_eq!(reason("https://example.com/graphql"), Some(RejectReason::Ecommerce));
        assert_eq!(
            reason("https://example.com/REST/V1/products"),
            Some(RejectReason::Ecommerce)
        );
        assert_eq!(
            reason("https://example.com/customer/account/login"),
            Some(RejectReason::Ecommerce)
        );
    }

    #[test]
    fn test_technical_patterns() {
        assert_eq!(
            reason("https://example.com/wp-content/uploads/2024/photo"),
            Some(RejectReason::Technical)
        );
        assert_eq!(reason("https://example.com/api/v2/items"), Some(RejectReason::Technical));
        assert_eq!(reason("https://example.com/wp-json"), Some(RejectReason::Technical));
        assert_eq!(
            reason("https://example.com/redirect/googleapis.com/x"),
            Some(RejectReason::Technical)
        );
    }

    #[test]
    fn test_problematic_params() {
        assert_eq!(reason("https://example.com/p?SID=1"), Some(RejectReason::TrackingParam));
        assert_eq!(
            reason("https://example.com/p?utm_term=x"),
            Some(RejectReason::TrackingParam)
        );
        assert_eq!(reason("https://example.com/p?gclid=abc"), Some(RejectReason::TrackingParam));
        // Only the exact key `sid` is problematic, not keys that end with it
        assert_eq!(reason("https://example.com/p?consid=1"), None);
    }

    #[test]
    fn test_rule_is_reported() {
        let url = Url::parse("https://example.com/style.css").unwrap();
        let matched = check_relevance(&url).unwrap_err();
        assert_eq!(matched.rule, ".css");
    }
}
