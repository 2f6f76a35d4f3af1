use crate::{Error, Result};

/// The parts of a page URL the controller and cookie jar care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationParts {
    pub scheme: String,
    pub hostname: String,
    pub port: String,
    pub pathname: String,
    pub search: String,
    pub hash: String,
}

impl LocationParts {
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let invalid = || Error::InvalidUrl(trimmed.to_string());

        let scheme_end = trimmed.find(':').ok_or_else(invalid)?;
        let scheme = trimmed[..scheme_end].to_ascii_lowercase();
        if !is_valid_url_scheme(&scheme) {
            return Err(invalid());
        }
        let rest = &trimmed[scheme_end + 1..];
        let Some(without_slashes) = rest.strip_prefix("//") else {
            // Opaque URLs such as about:blank have no host and no path.
            let (_, search, hash) = split_path_search_hash(rest);
            return Ok(Self {
                scheme,
                hostname: String::new(),
                port: String::new(),
                pathname: String::new(),
                search,
                hash,
            });
        };

        let authority_end = without_slashes
            .find(['/', '?', '#'])
            .unwrap_or(without_slashes.len());
        let authority = &without_slashes[..authority_end];
        let tail = &without_slashes[authority_end..];
        let hostport = authority
            .rfind('@')
            .map_or(authority, |at| &authority[at + 1..]);
        let (hostname, port) = split_hostname_and_port(hostport);
        let (pathname, search, hash) = split_path_search_hash(tail);
        let pathname = if pathname.is_empty() {
            "/".to_string()
        } else {
            normalize_pathname(&pathname)
        };
        Ok(Self {
            scheme,
            hostname: hostname.to_ascii_lowercase(),
            port,
            pathname,
            search,
            hash,
        })
    }

    /// `window.location.protocol`, e.g. `"https:"`.
    pub fn protocol(&self) -> String {
        format!("{}:", self.scheme)
    }

    pub fn is_secure(&self) -> bool {
        self.scheme == "https"
    }

    pub fn host(&self) -> String {
        if self.port.is_empty() {
            self.hostname.clone()
        } else {
            format!("{}:{}", self.hostname, self.port)
        }
    }

    pub fn href(&self) -> String {
        if self.hostname.is_empty() && self.pathname.is_empty() {
            return format!("{}{}{}", self.protocol(), self.search, self.hash);
        }
        format!(
            "{}//{}{}{}{}",
            self.protocol(),
            self.host(),
            self.pathname,
            self.search,
            self.hash
        )
    }

    /// Resolves `href` against this location the way a link click would.
    pub(crate) fn resolve(&self, href: &str) -> String {
        let href = href.trim();
        if href.contains("://") || href.starts_with("about:") || href.starts_with("mailto:") {
            return href.to_string();
        }
        let origin = format!("{}//{}", self.protocol(), self.host());
        if let Some(hash) = href.strip_prefix('#') {
            return format!("{origin}{}{}#{hash}", self.pathname, self.search);
        }
        if href.starts_with('?') {
            return format!("{origin}{}{href}", self.pathname);
        }
        if href.starts_with('/') {
            return format!("{origin}{}", normalize_pathname(href));
        }
        let base_dir = self
            .pathname
            .rfind('/')
            .map_or("/", |idx| &self.pathname[..=idx]);
        format!("{origin}{}", normalize_pathname(&format!("{base_dir}{href}")))
    }
}

fn is_valid_url_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_alphabetic() {
        return false;
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '+' | '-' | '.'))
}

fn split_hostname_and_port(authority: &str) -> (String, String) {
    if let Some(rest) = authority.strip_prefix('[') {
        if let Some(end_idx) = rest.find(']') {
            let hostname = authority[..end_idx + 2].to_string();
            let suffix = &authority[end_idx + 2..];
            let port = suffix.strip_prefix(':').unwrap_or_default();
            return (hostname, port.to_string());
        }
    }

    match authority.rsplit_once(':') {
        Some((hostname, port)) if !hostname.contains(':') => {
            (hostname.to_string(), port.to_string())
        }
        _ => (authority.to_string(), String::new()),
    }
}

fn split_path_search_hash(tail: &str) -> (String, String, String) {
    let (before_hash, hash) = match tail.find('#') {
        Some(pos) => (&tail[..pos], &tail[pos..]),
        None => (tail, ""),
    };
    let (pathname, search) = match before_hash.find('?') {
        Some(pos) => (&before_hash[..pos], &before_hash[pos..]),
        None => (before_hash, ""),
    };
    (pathname.to_string(), search.to_string(), hash.to_string())
}

fn normalize_pathname(pathname: &str) -> String {
    let starts_with_slash = pathname.starts_with('/');
    let ends_with_slash = pathname.ends_with('/') && pathname.len() > 1;
    let mut parts = Vec::new();
    for segment in pathname.split('/') {
        if segment.is_empty() || segment == "." {
            continue;
        }
        if segment == ".." {
            parts.pop();
            continue;
        }
        parts.push(segment);
    }
    let mut out = if starts_with_slash {
        format!("/{}", parts.join("/"))
    } else {
        parts.join("/")
    };
    if out.is_empty() {
        out.push('/');
    }
    if ends_with_slash && !out.ends_with('/') {
        out.push('/');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_service_url() -> Result<()> {
        let location = LocationParts::parse(
            "https://www.Tax.Service.gov.uk:8443/calculate/./shares/../property?x=1#top",
        )?;
        assert_eq!(location.scheme, "https");
        assert_eq!(location.protocol(), "https:");
        assert_eq!(location.hostname, "www.tax.service.gov.uk");
        assert_eq!(location.port, "8443");
        assert_eq!(location.pathname, "/calculate/property");
        assert_eq!(location.search, "?x=1");
        assert_eq!(location.hash, "#top");
        assert!(location.is_secure());
        Ok(())
    }

    #[test]
    fn bare_origin_gets_root_path() -> Result<()> {
        let location = LocationParts::parse("http://localhost")?;
        assert_eq!(location.pathname, "/");
        assert!(!location.is_secure());
        assert_eq!(location.href(), "http://localhost/");
        Ok(())
    }

    #[test]
    fn resolves_relative_links() -> Result<()> {
        let location = LocationParts::parse("https://app.local/calc/summary?y=2")?;
        assert_eq!(location.resolve("#"), "https://app.local/calc/summary?y=2#");
        assert_eq!(location.resolve("help"), "https://app.local/calc/help");
        assert_eq!(location.resolve("/feedback"), "https://app.local/feedback");
        assert_eq!(location.resolve("?z=1"), "https://app.local/calc/summary?z=1");
        assert_eq!(
            location.resolve("https://other.example/x"),
            "https://other.example/x"
        );
        Ok(())
    }

    #[test]
    fn rejects_urls_without_scheme() {
        assert!(matches!(
            LocationParts::parse("/relative/only"),
            Err(Error::InvalidUrl(_))
        ));
        assert!(matches!(
            LocationParts::parse("1http://x"),
            Err(Error::InvalidUrl(_))
        ));
    }
}
