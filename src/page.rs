use std::collections::VecDeque;
use std::fmt;

use crate::analytics::{AnalyticsEvent, AnalyticsSink};
use crate::controller::BannerState;
use crate::cookie::{CookieJar, StoreOutcome};
use crate::dom::{Dom, NodeId};
use crate::events::{Binding, EventState, Listener, ListenerStore};
use crate::location::LocationParts;
use crate::Result;

#[derive(Debug, Clone)]
pub(crate) struct TraceState {
    pub(crate) enabled: bool,
    pub(crate) events: bool,
    pub(crate) logs: VecDeque<String>,
    pub(crate) log_limit: usize,
}

impl Default for TraceState {
    fn default() -> Self {
        Self {
            enabled: false,
            events: true,
            logs: VecDeque::new(),
            log_limit: 10_000,
        }
    }
}

/// One loaded document and everything a behavior may touch: elements,
/// listeners, cookies, the location and the clock.
pub(crate) struct Page {
    pub(crate) dom: Dom,
    pub(crate) listeners: ListenerStore,
    pub(crate) location: LocationParts,
    pub(crate) cookies: CookieJar,
    pub(crate) now_ms: i64,
    pub(crate) banner_state: BannerState,
    pub(crate) analytics: Vec<AnalyticsEvent>,
    pub(crate) sink: Option<Box<dyn AnalyticsSink>>,
    pub(crate) trace: TraceState,
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("location", &self.location.href())
            .field("now_ms", &self.now_ms)
            .field("banner_state", &self.banner_state)
            .field("cookies", &self.cookies.len())
            .field("analytics", &self.analytics.len())
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

impl Page {
    pub(crate) fn new(dom: Dom, location: LocationParts, cookies: CookieJar, now_ms: i64) -> Self {
        Self {
            dom,
            listeners: ListenerStore::default(),
            location,
            cookies,
            now_ms,
            banner_state: BannerState::default(),
            analytics: Vec::new(),
            sink: None,
            trace: TraceState::default(),
        }
    }

    pub(crate) fn select_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        self.dom.query_selector_all(selector)
    }

    pub(crate) fn select_first(&self, selector: &str) -> Result<Option<NodeId>> {
        self.dom.query_selector(selector)
    }

    pub(crate) fn select_within(&self, root: NodeId, selector: &str) -> Result<Vec<NodeId>> {
        self.dom.query_selector_all_from(root, selector)
    }

    /// Every element carrying `class_name`, in document order.
    pub(crate) fn elements_with_class(&self, class_name: &str) -> Vec<NodeId> {
        self.dom
            .all_element_nodes()
            .into_iter()
            .filter(|node| self.dom.class_contains(*node, class_name))
            .collect()
    }

    pub(crate) fn bind(&mut self, node: NodeId, event: &str, binding: Binding) {
        let added = self.listeners.add(node, event, Listener { binding });
        if added {
            tracing::trace!(node = %self.dom.node_label(node), event, binding = binding.name(), "bound listener");
        }
    }

    /// Displayed if neither the node nor any ancestor is hidden.
    pub(crate) fn is_visible(&self, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if self.dom.element(current).is_some() && !self.dom.is_displayed(current) {
                return false;
            }
            cursor = self.dom.parent(current);
        }
        true
    }

    pub(crate) fn set_displayed(&mut self, node: NodeId, displayed: bool) -> Result<()> {
        if displayed {
            self.dom.show(node)
        } else {
            self.dom.hide(node)
        }
    }

    /// The current value of a form control; an empty string for other nodes.
    pub(crate) fn value(&self, node: NodeId) -> String {
        self.dom.value(node).unwrap_or_default()
    }

    pub(crate) fn checked(&self, node: NodeId) -> bool {
        self.dom.checked(node).unwrap_or(false)
    }

    pub(crate) fn label(&self, node: NodeId) -> String {
        self.dom.node_label(node)
    }

    pub(crate) fn cookie(&self, name: &str) -> Option<String> {
        self.cookies
            .get(name, &self.location, self.now_ms)
            .map(|cookie| cookie.value.clone())
    }

    pub(crate) fn document_cookie(&self) -> String {
        self.cookies.document_cookie(&self.location, self.now_ms)
    }

    /// Applies a `document.cookie = raw` assignment. Writes the jar refuses
    /// are dropped, as a browser would, and logged as warnings.
    pub(crate) fn write_cookie(&mut self, raw: &str) -> StoreOutcome {
        let outcome = self.cookies.store_raw(raw, &self.location, self.now_ms);
        match outcome {
            StoreOutcome::Stored => self.trace_line(format!("[cookie] set {raw}")),
            StoreOutcome::Deleted => self.trace_line(format!("[cookie] deleted {raw}")),
            StoreOutcome::Rejected(reason) => self.warn(format!(
                "[cookie] rejected {raw} on {}: {}",
                self.location.href(),
                reason.as_str()
            )),
        }
        outcome
    }

    pub(crate) fn send_analytics(&mut self, event: AnalyticsEvent) {
        self.trace_line(format!("[analytics] {event}"));
        if let Some(sink) = self.sink.as_mut() {
            sink.send(&event);
        }
        self.analytics.push(event);
    }

    pub(crate) fn trace_event_line(&mut self, line: String) {
        if self.trace.events {
            self.trace_line(line);
        }
    }

    pub(crate) fn trace_event_done(&mut self, event: &EventState, listeners_run: usize) {
        let target = self.label(event.target);
        self.trace_event_line(format!(
            "[event] done {} target={} listeners={} default_prevented={}",
            event.event_type, target, listeners_run, event.default_prevented
        ));
    }

    pub(crate) fn trace_line(&mut self, line: String) {
        if self.trace.enabled {
            tracing::debug!("{line}");
            self.push_log(line);
        }
    }

    /// Warnings reach the trace log whether or not tracing is enabled.
    pub(crate) fn warn(&mut self, line: String) {
        tracing::warn!("{line}");
        self.push_log(format!("[warn] {line}"));
    }

    fn push_log(&mut self, line: String) {
        if self.trace.logs.len() >= self.trace.log_limit {
            self.trace.logs.pop_front();
        }
        self.trace.logs.push_back(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::html::parse_html;

    fn page(url: &str, html: &str) -> Result<Page> {
        Ok(Page::new(
            parse_html(html)?,
            LocationParts::parse(url)?,
            CookieJar::new(),
            0,
        ))
    }

    #[test]
    fn visibility_follows_hidden_ancestors() -> Result<()> {
        let mut page = page(
            "https://app.local/",
            "<div id='outer'><p id='inner'>x</p></div>",
        )?;
        let outer = page.dom.by_id("outer").ok_or(Error::SelectorNotFound("#outer".into()))?;
        let inner = page.dom.by_id("inner").ok_or(Error::SelectorNotFound("#inner".into()))?;
        assert!(page.is_visible(inner));
        page.set_displayed(outer, false)?;
        assert!(!page.is_visible(inner));
        assert!(page.dom.is_displayed(inner));
        page.set_displayed(outer, true)?;
        assert!(page.is_visible(inner));
        Ok(())
    }

    #[test]
    fn rejected_cookie_writes_are_logged_even_without_trace() -> Result<()> {
        let mut page = page("http://app.local/", "<p></p>")?;
        let outcome = page.write_cookie("a=1; path=/; secure");
        assert!(matches!(outcome, StoreOutcome::Rejected(_)));
        assert_eq!(page.cookie("a"), None);
        let logs = page.trace.logs.iter().cloned().collect::<Vec<_>>();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].starts_with("[warn] [cookie] rejected a=1"));

        assert_eq!(page.write_cookie("b=2; path=/"), StoreOutcome::Stored);
        assert_eq!(page.document_cookie(), "b=2");
        assert_eq!(page.trace.logs.len(), 1);
        Ok(())
    }

    #[test]
    fn analytics_reach_the_sink_and_the_page_record() -> Result<()> {
        let mut page = page("https://app.local/", "<p></p>")?;
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink_seen = seen.clone();
        page.sink = Some(Box::new(move |event: &AnalyticsEvent| {
            sink_seen.borrow_mut().push(event.clone());
        }));
        page.send_analytics(AnalyticsEvent::new("c", "a", "l"));
        assert_eq!(page.analytics, vec![AnalyticsEvent::new("c", "a", "l")]);
        assert_eq!(seen.borrow().as_slice(), page.analytics.as_slice());
        Ok(())
    }

    #[test]
    fn trace_log_is_bounded() -> Result<()> {
        let mut page = page("https://app.local/", "<p></p>")?;
        page.trace.enabled = true;
        page.trace.log_limit = 2;
        for n in 0..4 {
            page.trace_line(format!("[ready] line {n}"));
        }
        let logs = page.trace.logs.iter().cloned().collect::<Vec<_>>();
        assert_eq!(logs, vec!["[ready] line 2", "[ready] line 3"]);
        Ok(())
    }
}
