use crate::analytics::{AnalyticsEvent, MetricsDescriptor};
use crate::config::AnalyticsConfig;
use crate::events::Binding;
use crate::page::Page;
use crate::Result;

pub(super) fn bind(config: &AnalyticsConfig, page: &mut Page) -> Result<()> {
    let attribute = &config.metrics_attribute;
    for node in page.select_all(&format!("[{attribute}]"))? {
        let raw = page.dom.attr(node, attribute).unwrap_or_default();
        match raw.parse::<MetricsDescriptor>() {
            Ok(descriptor) => page.send_analytics(descriptor.into_event()),
            Err(err) => {
                let line = format!("[analytics] skipped {}: {err}", page.label(node));
                page.warn(line);
            }
        }
    }

    for control in page.select_all(&config.get_help_selector)? {
        page.bind(control, "click", Binding::GetHelp);
    }
    Ok(())
}

pub(super) fn on_get_help(config: &AnalyticsConfig, page: &mut Page) {
    let event = AnalyticsEvent::new(
        config.get_help_category.clone(),
        config.get_help_action.clone(),
        page.location.pathname.clone(),
    );
    page.send_analytics(event);
}
