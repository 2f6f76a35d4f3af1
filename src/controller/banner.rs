use serde::{Deserialize, Serialize};

use crate::config::BannerConfig;
use crate::cookie::SetCookie;
use crate::dom::NodeId;
use crate::events::{Binding, EventState};
use crate::page::Page;
use crate::Result;

/// Whether the full-width banner is on screen. Only a dismiss click moves it
/// from `Shown` to `Suppressed`; nothing on the page moves it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BannerState {
    #[default]
    Shown,
    Suppressed,
}

pub(super) fn bind(config: &BannerConfig, page: &mut Page) -> Result<()> {
    let banner = page.select_first(&config.banner_selector)?;
    let consent = page.cookie(&config.cookie_name);
    page.banner_state = if consent.is_some() {
        BannerState::Suppressed
    } else {
        BannerState::Shown
    };

    if let (BannerState::Shown, Some(banner)) = (page.banner_state, banner) {
        page.dom.class_add(banner, &config.shown_class)?;
    }
    let line = format!(
        "[banner] init {}={} state={:?}",
        config.cookie_name,
        consent.as_deref().unwrap_or("<absent>"),
        page.banner_state
    );
    page.trace_line(line);

    for control in page.select_all(&config.dismiss_selector)? {
        page.bind(control, "click", Binding::BannerDismiss { banner });
    }
    Ok(())
}

/// The consent cookie a dismiss click writes at `now_ms` on `page`.
pub(super) fn consent_cookie(config: &BannerConfig, page: &Page) -> SetCookie {
    SetCookie {
        expires_at_ms: Some(page.now_ms.saturating_add(config.expiry_ms())),
        domain: config.cookie_domain.clone(),
        path: Some(config.cookie_path.clone()),
        secure: config.secure_flag.secure_for(&page.location),
        ..SetCookie::new(config.cookie_name.clone(), config.cookie_value.clone())
    }
}

pub(super) fn on_dismiss(
    config: &BannerConfig,
    page: &mut Page,
    banner: Option<NodeId>,
    event: &mut EventState,
) -> Result<()> {
    event.prevent_default();
    let raw = consent_cookie(config, page).to_cookie_string();
    page.write_cookie(&raw);
    if let Some(banner) = banner {
        page.dom.class_remove(banner, &config.shown_class)?;
    }
    page.banner_state = BannerState::Suppressed;
    page.trace_line("[banner] dismissed state=Suppressed".to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookie::{CookieJar, SecureFlagPolicy};
    use crate::html::parse_html;
    use crate::location::LocationParts;

    const BANNER: &str = r##"
        <div id="full-width-banner" class="banner-panel">
          <a class="full-width-banner__close" href="#">No thanks</a>
        </div>
    "##;

    fn page(url: &str, cookies: CookieJar) -> Result<Page> {
        Ok(Page::new(
            parse_html(BANNER)?,
            LocationParts::parse(url)?,
            cookies,
            0,
        ))
    }

    #[test]
    fn consent_cookie_carries_every_clause() -> Result<()> {
        let config = BannerConfig {
            cookie_domain: Some(".tax.service.gov.uk".into()),
            ..BannerConfig::default()
        };
        let page = page("https://www.tax.service.gov.uk/calc", CookieJar::new())?;
        assert_eq!(
            consent_cookie(&config, &page).to_cookie_string(),
            "mdtpurr=suppress_for_all_services; expires=Thu, 29 Jan 1970 00:00:00 GMT; \
             domain=.tax.service.gov.uk; path=/; secure"
        );
        Ok(())
    }

    #[test]
    fn secure_clause_follows_the_configured_policy() -> Result<()> {
        let http = page("http://www.tax.service.gov.uk/calc", CookieJar::new())?;
        let https = page("https://www.tax.service.gov.uk/calc", CookieJar::new())?;
        let with = |secure_flag| BannerConfig {
            secure_flag,
            ..BannerConfig::default()
        };

        let default = BannerConfig::default();
        assert!(!consent_cookie(&default, &http).secure);
        assert!(consent_cookie(&default, &https).secure);

        let legacy = with(SecureFlagPolicy::Legacy);
        assert!(consent_cookie(&legacy, &http).secure);
        assert!(!consent_cookie(&legacy, &https).secure);

        assert!(consent_cookie(&with(SecureFlagPolicy::Always), &http).secure);
        assert!(!consent_cookie(&with(SecureFlagPolicy::Never), &https).secure);
        Ok(())
    }

    #[test]
    fn existing_consent_suppresses_without_adding_the_class() -> Result<()> {
        let location = LocationParts::parse("https://app.local/")?;
        let mut cookies = CookieJar::new();
        cookies.store_raw("mdtpurr=anything; path=/", &location, 0);

        let mut page = page("https://app.local/", cookies)?;
        bind(&BannerConfig::default(), &mut page)?;
        assert_eq!(page.banner_state, BannerState::Suppressed);
        let banner = page.select_first("#full-width-banner")?;
        assert!(banner.is_some_and(|banner| !page.dom.class_contains(banner, "banner-panel--show")));
        Ok(())
    }

    #[test]
    fn dismiss_without_banner_element_still_suppresses() -> Result<()> {
        let config = BannerConfig::default();
        let mut page = page("https://app.local/", CookieJar::new())?;
        let mut event = EventState::new("click", page.dom.root, 0);
        on_dismiss(&config, &mut page, None, &mut event)?;
        assert!(event.default_prevented);
        assert_eq!(page.banner_state, BannerState::Suppressed);
        assert_eq!(
            page.cookie("mdtpurr").as_deref(),
            Some("suppress_for_all_services")
        );
        Ok(())
    }

    #[test]
    fn banner_state_serializes_in_snake_case() -> serde_json::Result<()> {
        assert_eq!(serde_json::to_string(&BannerState::Suppressed)?, r#""suppressed""#);
        assert_eq!(
            serde_json::from_str::<BannerState>(r#""shown""#)?,
            BannerState::Shown
        );
        Ok(())
    }
}
