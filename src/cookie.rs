use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::location::LocationParts;

const COOKIE_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";
// 0000-01-01T00:00:00Z and 9999-12-31T23:59:59Z.
const MIN_COOKIE_DATE_MS: i64 = -62_167_219_200_000;
const MAX_COOKIE_DATE_MS: i64 = 253_402_300_799_000;

/// Formats epoch milliseconds the way `Date.prototype.toGMTString` does,
/// e.g. `Thu, 29 Jan 1970 00:00:00 GMT`.
/// Instants outside years 0000 to 9999 are clamped to that range, so the
/// rendered date always parses back.
pub fn format_cookie_date(epoch_ms: i64) -> String {
    let clamped = epoch_ms.clamp(MIN_COOKIE_DATE_MS, MAX_COOKIE_DATE_MS);
    DateTime::<Utc>::from_timestamp_millis(clamped)
        .unwrap_or_default()
        .format(COOKIE_DATE_FORMAT)
        .to_string()
}

fn parse_cookie_date(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, COOKIE_DATE_FORMAT) {
        return Some(naive.and_utc().timestamp_millis());
    }
    DateTime::parse_from_rfc2822(raw)
        .ok()
        .map(|date| date.timestamp_millis())
}

/// When the consent cookie carries the `secure` attribute.
///
/// `SecureOnHttps` marks the cookie `secure` unless the page was loaded over
/// a non-secure scheme. `Legacy` reproduces the deployed page script, which
/// tests the protocol string the other way round: `secure` on plain-`http`
/// pages, nothing on `https`. A jar refuses a `secure` cookie from an `http`
/// page, so under `Legacy` a dismissal on `http` is not remembered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecureFlagPolicy {
    Legacy,
    #[default]
    SecureOnHttps,
    Always,
    Never,
}

impl SecureFlagPolicy {
    pub fn secure_for(self, location: &LocationParts) -> bool {
        match self {
            Self::Legacy => !location.is_secure(),
            Self::SecureOnHttps => location.is_secure(),
            Self::Always => true,
            Self::Never => false,
        }
    }
}

/// One `document.cookie = "..."` assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub expires_at_ms: Option<i64>,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub secure: bool,
}

impl SetCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            expires_at_ms: None,
            domain: None,
            path: None,
            secure: false,
        }
    }

    /// Renders `name=value; expires=<GMT date>; domain=<d>; path=<p>; secure`,
    /// leaving out absent clauses.
    pub fn to_cookie_string(&self) -> String {
        let mut out = format!("{}={}", self.name, self.value);
        if let Some(expires) = self.expires_at_ms {
            out.push_str("; expires=");
            out.push_str(&format_cookie_date(expires));
        }
        if let Some(domain) = &self.domain {
            out.push_str("; domain=");
            out.push_str(domain);
        }
        if let Some(path) = &self.path {
            out.push_str("; path=");
            out.push_str(path);
        }
        if self.secure {
            out.push_str("; secure");
        }
        out
    }

    /// Parses a cookie assignment string. Returns `None` when there is no
    /// `name=value` pair or the name is empty. Unknown attributes are ignored,
    /// as are unparseable expiry dates.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split(';');
        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let mut cookie = Self::new(name, value.trim());

        for attr in parts {
            let (key, val) = match attr.split_once('=') {
                Some((key, val)) => (key.trim(), val.trim()),
                None => (attr.trim(), ""),
            };
            match key.to_ascii_lowercase().as_str() {
                "expires" => cookie.expires_at_ms = parse_cookie_date(val),
                "domain" if !val.is_empty() => cookie.domain = Some(val.to_string()),
                "path" if val.starts_with('/') => cookie.path = Some(val.to_string()),
                "secure" => cookie.secure = true,
                _ => {}
            }
        }
        Some(cookie)
    }
}

/// A cookie as held by the jar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub expires_at_ms: Option<i64>,
    pub domain: String,
    pub host_only: bool,
    pub path: String,
    pub secure: bool,
}

impl Cookie {
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at_ms.is_some_and(|expires| expires <= now_ms)
    }

    fn visible_to(&self, location: &LocationParts, now_ms: i64) -> bool {
        !self.is_expired(now_ms)
            && (!self.secure || location.is_secure())
            && self.domain_matches(&location.hostname)
            && path_matches(&location.pathname, &self.path)
    }

    fn domain_matches(&self, host: &str) -> bool {
        if self.host_only {
            host == self.domain
        } else {
            domain_matches(host, &self.domain)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CookieRejection {
    /// A page served over plain http may not set a `secure` cookie.
    InsecureOrigin,
    DomainMismatch,
    Malformed,
}

impl CookieRejection {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::InsecureOrigin => "secure cookie set from a non-secure page",
            Self::DomainMismatch => "domain attribute does not match the page host",
            Self::Malformed => "missing name=value pair",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StoreOutcome {
    Stored,
    Deleted,
    Rejected(CookieRejection),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: Vec<Cookie>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cookie> {
        self.cookies.iter()
    }

    /// Applies a `document.cookie` assignment made by a page at `location`.
    pub(crate) fn store_raw(
        &mut self,
        raw: &str,
        location: &LocationParts,
        now_ms: i64,
    ) -> StoreOutcome {
        match SetCookie::parse(raw) {
            Some(set) => self.store(set, location, now_ms),
            None => StoreOutcome::Rejected(CookieRejection::Malformed),
        }
    }

    pub(crate) fn store(
        &mut self,
        set: SetCookie,
        location: &LocationParts,
        now_ms: i64,
    ) -> StoreOutcome {
        if set.secure && !location.is_secure() {
            return StoreOutcome::Rejected(CookieRejection::InsecureOrigin);
        }

        let (domain, host_only) = match &set.domain {
            Some(domain) => {
                let domain = domain.trim_start_matches('.').to_ascii_lowercase();
                if !domain_matches(&location.hostname, &domain) {
                    return StoreOutcome::Rejected(CookieRejection::DomainMismatch);
                }
                (domain, false)
            }
            None => (location.hostname.clone(), true),
        };
        let path = set
            .path
            .unwrap_or_else(|| default_path(&location.pathname));

        self.cookies.retain(|cookie| {
            !(cookie.name == set.name && cookie.domain == domain && cookie.path == path)
                && !cookie.is_expired(now_ms)
        });

        if set.expires_at_ms.is_some_and(|expires| expires <= now_ms) {
            return StoreOutcome::Deleted;
        }

        self.cookies.push(Cookie {
            name: set.name,
            value: set.value,
            expires_at_ms: set.expires_at_ms,
            domain,
            host_only,
            path,
            secure: set.secure,
        });
        StoreOutcome::Stored
    }

    /// The value a page at `location` would read for `name`.
    pub fn get<'a>(
        &'a self,
        name: &str,
        location: &'a LocationParts,
        now_ms: i64,
    ) -> Option<&'a Cookie> {
        self.visible(location, now_ms)
            .find(|cookie| cookie.name == name)
    }

    /// The `document.cookie` string a page at `location` would read.
    pub fn document_cookie(&self, location: &LocationParts, now_ms: i64) -> String {
        self.visible(location, now_ms)
            .map(|cookie| format!("{}={}", cookie.name, cookie.value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn visible<'a>(
        &'a self,
        location: &'a LocationParts,
        now_ms: i64,
    ) -> impl Iterator<Item = &'a Cookie> + 'a {
        // Longer paths first, as browsers order them.
        let mut visible = self
            .cookies
            .iter()
            .filter(move |cookie| cookie.visible_to(location, now_ms))
            .collect::<Vec<_>>();
        visible.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        visible.into_iter()
    }
}

fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    let request_path = if request_path.is_empty() {
        "/"
    } else {
        request_path
    };
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/')
            || request_path[cookie_path.len()..].starts_with('/'))
}

fn default_path(pathname: &str) -> String {
    match pathname.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => pathname[..idx].to_string(),
    }
}
