//! The page's view-state behaviors.
//!
//! [`ViewStateController::on_ready`] is the DOM-ready entry point: it applies
//! the initial visibility of every conditional region and panel, decides the
//! banner state from the consent cookie, sends the descriptor-driven analytics
//! events and registers the listeners that keep everything in step afterwards.
//! Listeners are stored as [`Binding`] values and come back through
//! [`ViewStateController::handle`] when an event reaches them.

mod analytics_ping;
mod banner;
mod radio_panels;
mod toggle;

pub use banner::BannerState;

use crate::config::ControllerConfig;
use crate::events::{Binding, EventState};
use crate::page::Page;
use crate::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewStateController {
    config: ControllerConfig,
}

impl ViewStateController {
    pub fn new(config: ControllerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub(crate) fn on_ready(&self, page: &mut Page) -> Result<()> {
        page.trace_line(format!("[ready] {}", page.location.href()));
        toggle::bind(&self.config.toggle, page)?;
        radio_panels::bind(&self.config.radio, page)?;
        banner::bind(&self.config.banner, page)?;
        analytics_ping::bind(&self.config.analytics, page)?;
        Ok(())
    }

    pub(crate) fn handle(
        &self,
        page: &mut Page,
        binding: Binding,
        event: &mut EventState,
    ) -> Result<()> {
        match binding {
            Binding::ToggleChange { region } => {
                toggle::on_change(&self.config.toggle, page, region, event.current_target)
            }
            Binding::RadioPanelClick => {
                radio_panels::on_click(&self.config.radio, page, event.current_target)
            }
            Binding::BannerDismiss { banner } => {
                banner::on_dismiss(&self.config.banner, page, banner, event)
            }
            Binding::GetHelp => {
                analytics_ping::on_get_help(&self.config.analytics, page);
                Ok(())
            }
        }
    }
}
