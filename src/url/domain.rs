use crate::UrlError;
use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host, it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use wavecrawl::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Strips every leading `www.` label
pub(crate) fn strip_www(host: &str) -> &str {
    let mut host = host;
    while let Some(rest) = host.strip_prefix("www.") {
        host = rest;
    }
    host
}

/// The single hostname a crawl is restricted to
///
/// Stored lowercased and without a leading `www.`, so `www.example.com` and
/// `example.com` are the same scope. Subdomains are different scopes. Ports
/// are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DomainScope {
    host: String,
}

impl DomainScope {
    /// Creates a scope from a bare hostname
    pub fn new(host: &str) -> Result<Self, UrlError> {
        let host = host.trim().to_lowercase();
        let host = strip_www(&host);
        if host.is_empty() {
            return Err(UrlError::MissingDomain);
        }
        Ok(Self {
            host: host.to_string(),
        })
    }

    /// Derives the scope from a seed URL
    ///
    /// # Examples
    ///
    /// ```
    /// use url::Url;
    /// use wavecrawl::url::DomainScope;
    ///
    /// let seed = Url::parse("https://www.Example.com/start").unwrap();
    /// let scope = DomainScope::from_url(&seed).unwrap();
    /// assert_eq!(scope.host(), "example.com");
    /// ```
    pub fn from_url(url: &Url) -> Result<Self, UrlError> {
        let host = extract_domain(url).ok_or(UrlError::MissingDomain)?;
        Self::new(&host)
    }

    /// Returns the normalized hostname
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns true if the URL's host belongs to this scope
    pub fn contains(&self, url: &Url) -> bool {
        match extract_domain(url) {
            Some(host) => strip_www(&host) == self.host,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_simple_domain() {
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_with_port() {
        let url = Url::parse("https://example.com:8080/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_mixed_case() {
        let url = Url::parse("https://Example.COM/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_scope_strips_www() {
        let scope = DomainScope::new("WWW.Example.com").unwrap();
        assert_eq!(scope.host(), "example.com");
    }

    #[test]
    fn test_scope_strips_repeated_www() {
        let scope = DomainScope::new("www.www.example.com").unwrap();
        assert_eq!(scope.host(), "example.com");

        let url = Url::parse("https://www.www.example.com/a").unwrap();
        assert!(scope.contains(&url));
    }

    #[test]
    fn test_scope_rejects_empty() {
        assert!(DomainScope::new("").is_err());
        assert!(DomainScope::new("www.").is_err());
    }

    #[test]
    fn test_scope_from_url_without_host() {
        let url = Url::parse("mailto:someone@example.com").unwrap();
        assert!(matches!(
            DomainScope::from_url(&url),
            Err(UrlError::MissingDomain)
        ));
    }

    #[test]
    fn test_scope_contains() {
        let scope = DomainScope::new("example.com").unwrap();

        assert!(scope.contains(&Url::parse("https://example.com/a").unwrap()));
        assert!(scope.contains(&Url::parse("http://www.example.com/a").unwrap()));
        assert!(scope.contains(&Url::parse("https://example.com:8443/").unwrap()));

        assert!(!scope.contains(&Url::parse("https://other.com/page").unwrap()));
        assert!(!scope.contains(&Url::parse("https://blog.example.com/").unwrap()));
        assert!(!scope.contains(&Url::parse("https://example.com.evil.org/").unwrap()));
    }
}
