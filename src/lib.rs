//! Reactive view-state controller for server-rendered forms.
//!
//! The controller binds conditional form regions to the inputs that control
//! them, keeps radio "additional detail" panels in step with the selected
//! option, drives a cookie-backed dismissible banner, and pings an analytics
//! collector. It runs against a small deterministic page runtime (DOM, cookie
//! jar, location, virtual clock) so behavior can be exercised without a
//! browser:
//!
//! ```
//! use form_view_state::Harness;
//!
//! let html = r#"
//!   <div data-hidden>
//!     <input id="yes" type="radio" name="q" value="Yes">
//!     <input id="no" type="radio" name="q" value="No" checked>
//!   </div>
//!   <div id="hidden">more questions</div>
//! "#;
//!
//! let mut h = Harness::from_html(html)?;
//! h.assert_visible("#hidden", false)?;
//! h.click("#yes")?;
//! h.assert_visible("#hidden", true)?;
//! # Ok::<(), form_view_state::Error>(())
//! ```

mod analytics;
mod config;
mod controller;
mod cookie;
mod dom;
mod events;
mod harness;
mod html;
mod location;
mod page;
mod selector;
mod window;


pub use analytics::{
    AnalyticsEvent, AnalyticsSink, MalformedDescriptor, MetricsDescriptor, RecordingSink,
};
pub use config::{AnalyticsConfig, BannerConfig, ControllerConfig, RadioConfig, ToggleConfig};
pub use controller::{BannerState, ViewStateController};
pub use cookie::{Cookie, CookieJar, SecureFlagPolicy, SetCookie, format_cookie_date};
pub use harness::{Harness, LocationNavigation};
pub use location::LocationParts;
pub use window::MockWindow;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("html parse error: {0}")]
    HtmlParse(String),
    #[error("selector not found: {0}")]
    SelectorNotFound(String),
    #[error("unsupported selector: {0}")]
    UnsupportedSelector(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid config: {0}")]
    Config(String),
    #[error("runtime error: {0}")]
    Runtime(String),
    #[error("type mismatch for {selector}: expected {expected}, actual {actual}")]
    TypeMismatch {
        selector: String,
        expected: String,
        actual: String,
    },
    #[error(
        "assertion failed for {selector}: expected {expected}, actual {actual}, snippet {dom_snippet}"
    )]
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },
}
