use crate::analytics::AnalyticsSink;
use crate::config::ControllerConfig;
use crate::controller::ViewStateController;
use crate::harness::{Carryover, Harness};
use crate::{Error, Result};

/// A browser window: successive page loads share one cookie jar, one clock,
/// one analytics sink and one trace log.
#[derive(Debug)]
pub struct MockWindow {
    state: WindowState,
    history: Vec<String>,
}

#[derive(Debug)]
enum WindowState {
    Idle {
        controller: ViewStateController,
        carryover: Carryover,
    },
    Open {
        url: String,
        html: String,
        harness: Harness,
    },
}

impl Default for MockWindow {
    fn default() -> Self {
        Self {
            state: WindowState::Idle {
                controller: ViewStateController::default(),
                carryover: Carryover::default(),
            },
            history: Vec::new(),
        }
    }
}

impl MockWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ControllerConfig) -> Result<Self> {
        Ok(Self {
            state: WindowState::Idle {
                controller: ViewStateController::new(config)?,
                carryover: Carryover::default(),
            },
            history: Vec::new(),
        })
    }

    /// Navigates to `url`, rendering `html`, and runs the ready entry point.
    /// A URL or document that fails to parse leaves the current page open.
    pub fn open(&mut self, url: &str, html: &str) -> Result<&mut Harness> {
        let document = Harness::parse_document(url, html)?;
        let (controller, carryover) = self.take_carryover();
        let harness = match Harness::assemble(document, controller.clone(), carryover) {
            Ok(harness) => harness,
            Err(err) => {
                self.state = WindowState::Idle {
                    controller,
                    carryover: Carryover::default(),
                };
                return Err(err);
            }
        };
        self.history.push(url.to_string());
        self.state = WindowState::Open {
            url: url.to_string(),
            html: html.to_string(),
            harness,
        };
        self.page_mut()
    }

    /// Loads the current document again from its original markup.
    pub fn reload(&mut self) -> Result<&mut Harness> {
        let WindowState::Open { url, html, .. } = &self.state else {
            return Err(Error::Runtime("reload requires an open page".into()));
        };
        let (url, html) = (url.clone(), html.clone());
        self.open(&url, &html)
    }

    pub fn page(&self) -> Result<&Harness> {
        match &self.state {
            WindowState::Open { harness, .. } => Ok(harness),
            WindowState::Idle { .. } => Err(Error::Runtime("no page is open".into())),
        }
    }

    pub fn page_mut(&mut self) -> Result<&mut Harness> {
        match &mut self.state {
            WindowState::Open { harness, .. } => Ok(harness),
            WindowState::Idle { .. } => Err(Error::Runtime("no page is open".into())),
        }
    }

    /// Every URL opened so far, reloads included.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn now_ms(&self) -> i64 {
        match &self.state {
            WindowState::Open { harness, .. } => harness.now_ms(),
            WindowState::Idle { carryover, .. } => carryover.now_ms,
        }
    }

    pub fn advance_time(&mut self, delta_ms: i64) -> Result<()> {
        match &mut self.state {
            WindowState::Open { harness, .. } => harness.advance_time(delta_ms),
            WindowState::Idle { carryover, .. } => {
                if delta_ms < 0 {
                    return Err(Error::Runtime(
                        "advance_time requires non-negative milliseconds".into(),
                    ));
                }
                carryover.now_ms = carryover.now_ms.saturating_add(delta_ms);
                Ok(())
            }
        }
    }

    /// Turns the trace log on for the open page and every later load, so the
    /// ready pass of the next page is recorded too.
    pub fn enable_trace(&mut self, enabled: bool) {
        match &mut self.state {
            WindowState::Open { harness, .. } => harness.enable_trace(enabled),
            WindowState::Idle { carryover, .. } => carryover.trace.enabled = enabled,
        }
    }

    pub fn set_analytics_sink(&mut self, sink: impl AnalyticsSink + 'static) {
        match &mut self.state {
            WindowState::Open { harness, .. } => harness.set_analytics_sink(sink),
            WindowState::Idle { carryover, .. } => carryover.sink = Some(Box::new(sink)),
        }
    }

    fn take_carryover(&mut self) -> (ViewStateController, Carryover) {
        let placeholder = WindowState::Idle {
            controller: ViewStateController::default(),
            carryover: Carryover::default(),
        };
        match std::mem::replace(&mut self.state, placeholder) {
            WindowState::Idle {
                controller,
                carryover,
            } => (controller, carryover),
            WindowState::Open { harness, .. } => harness.into_carryover(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reload_without_open_page_is_an_error() {
        let mut window = MockWindow::new();
        assert!(matches!(window.reload(), Err(Error::Runtime(_))));
        assert!(window.page().is_err());
    }

    #[test]
    fn clock_and_cookies_survive_navigation() -> Result<()> {
        let mut window = MockWindow::new();
        window.advance_time(5_000)?;
        window.open("https://app.local/one", "<p>one</p>")?;
        assert_eq!(window.now_ms(), 5_000);
        window.advance_time(1_000)?;
        window.open("https://app.local/two", "<p>two</p>")?;
        assert_eq!(window.now_ms(), 6_000);
        window.reload()?;
        assert_eq!(
            window.history(),
            [
                "https://app.local/one",
                "https://app.local/two",
                "https://app.local/two"
            ]
        );
        Ok(())
    }

    #[test]
    fn malformed_metrics_attribute_is_rejected_before_any_load() {
        let mut config = ControllerConfig::default();
        config.analytics.metrics_attribute = "data-metrics]".into();
        assert!(matches!(
            MockWindow::with_config(config),
            Err(Error::Config(message)) if message.starts_with("analytics.metrics_attribute")
        ));
    }

    #[test]
    fn unparseable_navigation_keeps_the_current_page() -> Result<()> {
        let mut window = MockWindow::new();
        window.open("https://app.local/", "<p>ok</p>")?;
        assert!(matches!(
            window.open("not a url", "<p></p>"),
            Err(Error::InvalidUrl(_))
        ));
        assert!(matches!(
            window.open("https://app.local/next", "<p"),
            Err(Error::HtmlParse(_))
        ));
        window.page()?.assert_text("p", "ok")?;
        assert_eq!(window.history(), ["https://app.local/"]);
        Ok(())
    }
}
