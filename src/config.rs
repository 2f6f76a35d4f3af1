use serde::Deserialize;

use crate::cookie::SecureFlagPolicy;
use crate::selector::parse_selector_groups;
use crate::{Error, Result};

/// Everything the controller looks up in the page, plus the constants it
/// writes out. Defaults match the deployed calculator pages.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerConfig {
    pub toggle: ToggleConfig,
    pub radio: RadioConfig,
    pub banner: BannerConfig,
    pub analytics: AnalyticsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToggleConfig {
    /// Marks a conditional block. The attribute's value, when non-empty,
    /// names the id of the block's dependent region.
    pub block_selector: String,
    pub block_attribute: String,
    pub input_selector: String,
    /// Region id used by blocks that do not name their own.
    pub default_region_id: String,
    pub affirmative_value: String,
    pub negative_value: String,
}

impl Default for ToggleConfig {
    fn default() -> Self {
        Self {
            block_selector: "[data-hidden]".into(),
            block_attribute: "data-hidden".into(),
            input_selector: "input".into(),
            default_region_id: "hidden".into(),
            affirmative_value: "Yes".into(),
            negative_value: "No".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RadioConfig {
    pub radio_selector: String,
    pub panel_class: String,
    /// Zero-based sibling position a panel must occupy for its radio's click
    /// to collapse every other panel.
    pub designated_index: usize,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            radio_selector: r#"input[type="radio"]"#.into(),
            panel_class: "additional-option-block".into(),
            designated_index: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BannerConfig {
    pub banner_selector: String,
    pub dismiss_selector: String,
    pub shown_class: String,
    pub cookie_name: String,
    pub cookie_value: String,
    pub expiry_days: u32,
    pub cookie_domain: Option<String>,
    pub cookie_path: String,
    pub secure_flag: SecureFlagPolicy,
}

impl Default for BannerConfig {
    fn default() -> Self {
        Self {
            banner_selector: "#full-width-banner".into(),
            dismiss_selector: ".full-width-banner__close".into(),
            shown_class: "banner-panel--show".into(),
            cookie_name: "mdtpurr".into(),
            cookie_value: "suppress_for_all_services".into(),
            expiry_days: 28,
            cookie_domain: None,
            cookie_path: "/".into(),
            secure_flag: SecureFlagPolicy::default(),
        }
    }
}

impl BannerConfig {
    pub(crate) fn expiry_ms(&self) -> i64 {
        i64::from(self.expiry_days) * 24 * 60 * 60 * 1000
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyticsConfig {
    pub metrics_attribute: String,
    pub get_help_selector: String,
    pub get_help_category: String,
    pub get_help_action: String,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            metrics_attribute: "data-metrics".into(),
            get_help_selector: "#get-help-action".into(),
            get_help_category: "resident-shares-get-help".into(),
            get_help_action: "Get help".into(),
        }
    }
}

impl ControllerConfig {
    /// Loads a config from JSON, filling omitted fields with defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| Error::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let required = [
            ("toggle.block_selector", &self.toggle.block_selector),
            ("toggle.block_attribute", &self.toggle.block_attribute),
            ("toggle.input_selector", &self.toggle.input_selector),
            ("toggle.default_region_id", &self.toggle.default_region_id),
            ("radio.radio_selector", &self.radio.radio_selector),
            ("radio.panel_class", &self.radio.panel_class),
            ("banner.banner_selector", &self.banner.banner_selector),
            ("banner.dismiss_selector", &self.banner.dismiss_selector),
            ("banner.shown_class", &self.banner.shown_class),
            ("banner.cookie_name", &self.banner.cookie_name),
            ("banner.cookie_path", &self.banner.cookie_path),
            ("analytics.metrics_attribute", &self.analytics.metrics_attribute),
            ("analytics.get_help_selector", &self.analytics.get_help_selector),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("{field} must not be empty")));
            }
        }
        let selectors = [
            ("toggle.block_selector", &self.toggle.block_selector),
            ("toggle.input_selector", &self.toggle.input_selector),
            ("radio.radio_selector", &self.radio.radio_selector),
            ("banner.banner_selector", &self.banner.banner_selector),
            ("banner.dismiss_selector", &self.banner.dismiss_selector),
            ("analytics.get_help_selector", &self.analytics.get_help_selector),
        ];
        for (field, selector) in selectors {
            parse_selector_groups(selector)
                .map_err(|err| Error::Config(format!("{field}: {err}")))?;
        }
        // The attribute is looked up as `[{name}]` at ready.
        parse_selector_groups(&format!("[{}]", self.analytics.metrics_attribute))
            .map_err(|err| Error::Config(format!("analytics.metrics_attribute: {err}")))?;
        if self.banner.cookie_name.contains(['=', ';', ' ']) {
            return Err(Error::Config(format!(
                "banner.cookie_name {:?} is not a valid cookie name",
                self.banner.cookie_name
            )));
        }
        if self.banner.cookie_value.contains(';') {
            return Err(Error::Config(
                "banner.cookie_value must not contain ';'".into(),
            ));
        }
        if !self.banner.cookie_path.starts_with('/') {
            return Err(Error::Config("banner.cookie_path must start with '/'".into()));
        }
        if self.banner.expiry_days == 0 {
            return Err(Error::Config("banner.expiry_days must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_deployed_pages() -> Result<()> {
        let config = ControllerConfig::default();
        config.validate()?;
        assert_eq!(config.banner.cookie_name, "mdtpurr");
        assert_eq!(config.banner.cookie_value, "suppress_for_all_services");
        assert_eq!(config.banner.expiry_ms(), 2_419_200_000);
        assert_eq!(config.banner.secure_flag, SecureFlagPolicy::SecureOnHttps);
        assert_eq!(config.radio.designated_index, 1);
        assert_eq!(config.toggle.affirmative_value, "Yes");
        Ok(())
    }

    #[test]
    fn json_overrides_merge_with_defaults() -> Result<()> {
        let config = ControllerConfig::from_json_str(
            r#"{
                "banner": { "cookie_domain": ".tax.service.gov.uk", "secure_flag": "legacy" },
                "radio": { "designated_index": 2 }
            }"#,
        )?;
        assert_eq!(
            config.banner.cookie_domain.as_deref(),
            Some(".tax.service.gov.uk")
        );
        assert_eq!(config.banner.secure_flag, SecureFlagPolicy::Legacy);
        assert_eq!(config.banner.cookie_name, "mdtpurr");
        assert_eq!(config.radio.designated_index, 2);
        assert_eq!(config.radio.panel_class, "additional-option-block");
        Ok(())
    }

    #[test]
    fn invalid_configs_are_rejected() {
        for json in [
            r#"{ "banner": { "expiry_days": 0 } }"#,
            r#"{ "banner": { "cookie_name": "" } }"#,
            r#"{ "banner": { "cookie_name": "a=b" } }"#,
            r#"{ "banner": { "cookie_path": "relative" } }"#,
            r#"{ "toggle": { "block_selector": "  " } }"#,
            r#"{ "radio": { "radio_selector": "input[type=" } }"#,
            r#"{ "analytics": { "metrics_attribute": "data-metrics]" } }"#,
            r#"{ "banner": { "secure_flag": "sometimes" } }"#,
            r#"{ "unknown": {} }"#,
            "not json",
        ] {
            assert!(
                matches!(ControllerConfig::from_json_str(json), Err(Error::Config(_))),
                "{json} should be rejected"
            );
        }
    }
}
