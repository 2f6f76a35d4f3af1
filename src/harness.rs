use crate::analytics::{AnalyticsEvent, AnalyticsSink};
use crate::config::ControllerConfig;
use crate::controller::{BannerState, ViewStateController};
use crate::cookie::CookieJar;
use crate::dom::{Dom, NodeId, is_input_of_type, truncate_chars};
use crate::events::{EventPhase, EventState};
use crate::html::parse_html;
use crate::location::LocationParts;
use crate::page::{Page, TraceState};
use crate::{Error, Result};

const DEFAULT_URL: &str = "https://app.local/";

/// A link click the page did not cancel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationNavigation {
    pub from: String,
    pub to: String,
}

/// State that outlives a single document: what a browser window keeps when
/// it loads the next page.
pub(crate) struct Carryover {
    pub(crate) cookies: CookieJar,
    pub(crate) now_ms: i64,
    pub(crate) sink: Option<Box<dyn AnalyticsSink>>,
    pub(crate) trace: TraceState,
}

impl std::fmt::Debug for Carryover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Carryover")
            .field("cookies", &self.cookies.len())
            .field("now_ms", &self.now_ms)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

impl Default for Carryover {
    fn default() -> Self {
        Self {
            cookies: CookieJar::new(),
            now_ms: 0,
            sink: None,
            trace: TraceState::default(),
        }
    }
}

/// Loads one page, runs the controller's ready entry point on it and drives
/// it the way a user would.
#[derive(Debug)]
pub struct Harness {
    page: Page,
    controller: ViewStateController,
    navigations: Vec<LocationNavigation>,
}

impl Harness {
    pub fn from_html(html: &str) -> Result<Self> {
        Self::from_html_with_url(DEFAULT_URL, html)
    }

    pub fn from_html_with_url(url: &str, html: &str) -> Result<Self> {
        Self::from_html_with_config(url, html, ControllerConfig::default())
    }

    pub fn from_html_with_config(url: &str, html: &str, config: ControllerConfig) -> Result<Self> {
        let controller = ViewStateController::new(config)?;
        Self::load(url, html, controller, Carryover::default())
    }

    pub(crate) fn load(
        url: &str,
        html: &str,
        controller: ViewStateController,
        carryover: Carryover,
    ) -> Result<Self> {
        let document = Self::parse_document(url, html)?;
        Self::assemble(document, controller, carryover)
    }

    pub(crate) fn parse_document(url: &str, html: &str) -> Result<(LocationParts, Dom)> {
        Ok((LocationParts::parse(url)?, parse_html(html)?))
    }

    pub(crate) fn assemble(
        (location, dom): (LocationParts, Dom),
        controller: ViewStateController,
        carryover: Carryover,
    ) -> Result<Self> {
        let mut page = Page::new(dom, location, carryover.cookies, carryover.now_ms);
        page.sink = carryover.sink;
        page.trace = carryover.trace;
        controller.on_ready(&mut page)?;
        Ok(Self {
            page,
            controller,
            navigations: Vec::new(),
        })
    }

    pub(crate) fn into_carryover(self) -> (ViewStateController, Carryover) {
        let Page {
            cookies,
            now_ms,
            sink,
            trace,
            ..
        } = self.page;
        (
            self.controller,
            Carryover {
                cookies,
                now_ms,
                sink,
                trace,
            },
        )
    }

    pub fn controller(&self) -> &ViewStateController {
        &self.controller
    }

    pub fn location(&self) -> &LocationParts {
        &self.page.location
    }

    pub fn click(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.click_node(target)
    }

    pub(crate) fn click_node(&mut self, target: NodeId) -> Result<()> {
        if self.page.dom.disabled(target) {
            return Ok(());
        }

        let click = self.dispatch_event(target, "click", true)?;
        if click.default_prevented {
            return Ok(());
        }

        if is_input_of_type(&self.page.dom, target, "checkbox") {
            let current = self.page.dom.checked(target)?;
            self.page.dom.set_checked(target, !current)?;
            self.dispatch_input_and_change(target)?;
        }

        if is_input_of_type(&self.page.dom, target, "radio") && !self.page.dom.checked(target)? {
            self.check_radio(target)?;
            self.dispatch_input_and_change(target)?;
        }

        self.follow_link(target);
        Ok(())
    }

    pub fn set_checked(&mut self, selector: &str, checked: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.page.dom.disabled(target) {
            return Ok(());
        }
        let is_radio = is_input_of_type(&self.page.dom, target, "radio");
        if !is_radio && !is_input_of_type(&self.page.dom, target, "checkbox") {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input[type=checkbox|radio]".into(),
                actual: self.describe(target),
            });
        }

        if self.page.dom.checked(target)? != checked {
            if is_radio && checked {
                self.check_radio(target)?;
            } else {
                self.page.dom.set_checked(target, checked)?;
            }
            self.dispatch_input_and_change(target)?;
        }
        Ok(())
    }

    /// Sets a text control's value and fires `input`, as typing would.
    pub fn type_text(&mut self, selector: &str, text: &str) -> Result<()> {
        let Some(target) = self.writable_control(selector)? else {
            return Ok(());
        };
        self.page.dom.set_value(target, text)?;
        self.dispatch_event(target, "input", false)?;
        Ok(())
    }

    /// Sets a control's value and fires `input` then `change`, as committing
    /// an edit would.
    pub fn change_value(&mut self, selector: &str, value: &str) -> Result<()> {
        let Some(target) = self.writable_control(selector)? else {
            return Ok(());
        };
        self.page.dom.set_value(target, value)?;
        self.dispatch_input_and_change(target)
    }

    /// Fires a synthetic event that neither bubbles nor can be canceled.
    pub fn dispatch(&mut self, selector: &str, event: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let mut event = EventState::new(event, target, self.page.now_ms);
        event.bubbles = false;
        event.cancelable = false;
        self.dispatch_prepared_event(event)?;
        Ok(())
    }

    pub fn is_visible(&self, selector: &str) -> Result<bool> {
        let target = self.select_one(selector)?;
        Ok(self.page.is_visible(target))
    }

    pub fn has_class(&self, selector: &str, class_name: &str) -> Result<bool> {
        let target = self.select_one(selector)?;
        Ok(self.page.dom.class_contains(target, class_name))
    }

    pub fn banner_state(&self) -> BannerState {
        self.page.banner_state
    }

    pub fn cookie(&self, name: &str) -> Option<String> {
        self.page.cookie(name)
    }

    pub fn document_cookie(&self) -> String {
        self.page.document_cookie()
    }

    /// Assigns `document.cookie` from outside the page. Writes the jar refuses
    /// are dropped and logged, exactly as when the page writes them.
    pub fn set_document_cookie(&mut self, raw: &str) {
        self.page.write_cookie(raw);
    }

    pub fn cookie_jar(&self) -> &CookieJar {
        &self.page.cookies
    }

    pub fn analytics_events(&self) -> &[AnalyticsEvent] {
        &self.page.analytics
    }

    pub fn take_analytics_events(&mut self) -> Vec<AnalyticsEvent> {
        std::mem::take(&mut self.page.analytics)
    }

    /// Forwards every later analytics event to `sink` as well.
    pub fn set_analytics_sink(&mut self, sink: impl AnalyticsSink + 'static) {
        self.page.sink = Some(Box::new(sink));
    }

    pub fn take_location_navigations(&mut self) -> Vec<LocationNavigation> {
        std::mem::take(&mut self.navigations)
    }

    pub fn now_ms(&self) -> i64 {
        self.page.now_ms
    }

    pub fn advance_time(&mut self, delta_ms: i64) -> Result<()> {
        if delta_ms < 0 {
            return Err(Error::Runtime(
                "advance_time requires non-negative milliseconds".into(),
            ));
        }
        self.page.now_ms = self.page.now_ms.saturating_add(delta_ms);
        Ok(())
    }

    pub fn advance_time_to(&mut self, target_ms: i64) -> Result<()> {
        if target_ms < self.page.now_ms {
            return Err(Error::Runtime(format!(
                "advance_time_to requires target >= now_ms (target={target_ms}, now_ms={})",
                self.page.now_ms
            )));
        }
        self.page.now_ms = target_ms;
        Ok(())
    }

    pub fn enable_trace(&mut self, enabled: bool) {
        self.page.trace.enabled = enabled;
    }

    pub fn set_trace_events(&mut self, enabled: bool) {
        self.page.trace.events = enabled;
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::Runtime(
                "set_trace_log_limit requires at least 1 entry".into(),
            ));
        }
        self.page.trace.log_limit = max_entries;
        while self.page.trace.logs.len() > max_entries {
            self.page.trace.logs.pop_front();
        }
        Ok(())
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        self.page.trace.logs.drain(..).collect()
    }

    pub fn assert_visible(&self, selector: &str, expected: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.page.is_visible(target);
        if actual != expected {
            return Err(self.assertion_failed(
                selector,
                target,
                if expected { "visible" } else { "hidden" },
                if actual { "visible" } else { "hidden" },
            ));
        }
        Ok(())
    }

    pub fn assert_checked(&self, selector: &str, expected: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.page.dom.checked(target)?;
        if actual != expected {
            return Err(self.assertion_failed(
                selector,
                target,
                &expected.to_string(),
                &actual.to_string(),
            ));
        }
        Ok(())
    }

    pub fn assert_value(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.page.dom.value(target)?;
        if actual != expected {
            return Err(self.assertion_failed(selector, target, expected, &actual));
        }
        Ok(())
    }

    pub fn assert_text(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.page.dom.text_content(target);
        if actual != expected {
            return Err(self.assertion_failed(selector, target, expected, &actual));
        }
        Ok(())
    }

    pub fn assert_has_class(&self, selector: &str, class_name: &str, expected: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.page.dom.class_contains(target, class_name);
        if actual != expected {
            let describe = |present: bool| {
                if present {
                    format!("class {class_name}")
                } else {
                    format!("no class {class_name}")
                }
            };
            return Err(self.assertion_failed(
                selector,
                target,
                &describe(expected),
                &describe(actual),
            ));
        }
        Ok(())
    }

    pub fn assert_exists(&self, selector: &str) -> Result<()> {
        let _ = self.select_one(selector)?;
        Ok(())
    }

    pub fn assert_cookie(&self, name: &str, expected: Option<&str>) -> Result<()> {
        let actual = self.page.cookie(name);
        if actual.as_deref() != expected {
            let render = |value: Option<&str>| value.unwrap_or("<absent>").to_string();
            return Err(Error::AssertionFailed {
                selector: format!("cookie {name}"),
                expected: render(expected),
                actual: render(actual.as_deref()),
                dom_snippet: self.page.document_cookie(),
            });
        }
        Ok(())
    }

    pub fn dump_dom(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        Ok(self.page.dom.dump_node(target))
    }

    pub(crate) fn select_one(&self, selector: &str) -> Result<NodeId> {
        self.page
            .select_first(selector)?
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
    }

    fn node_snippet(&self, node_id: NodeId) -> String {
        truncate_chars(&self.page.dom.dump_node(node_id), 200)
    }

    fn assertion_failed(&self, selector: &str, target: NodeId, expected: &str, actual: &str) -> Error {
        Error::AssertionFailed {
            selector: selector.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
            dom_snippet: self.node_snippet(target),
        }
    }

    fn describe(&self, node: NodeId) -> String {
        let tag = self.page.dom.tag_name(node).unwrap_or("node").to_ascii_lowercase();
        match self.page.dom.attr(node, "type") {
            Some(kind) if tag == "input" => format!("input[type={kind}]"),
            _ => tag,
        }
    }

    /// Resolves a value-carrying control, or `None` when it is disabled.
    fn writable_control(&self, selector: &str) -> Result<Option<NodeId>> {
        let target = self.select_one(selector)?;
        let tag = self.describe(target);
        if !(tag.starts_with("input") || tag == "textarea" || tag == "select") {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input, select or textarea".into(),
                actual: tag,
            });
        }
        if self.page.dom.disabled(target) {
            return Ok(None);
        }
        Ok(Some(target))
    }

    /// Checks `target` and unchecks the rest of its radio group: same `name`,
    /// same form owner.
    fn check_radio(&mut self, target: NodeId) -> Result<()> {
        let dom = &self.page.dom;
        let name = dom.attr(target, "name").unwrap_or_default();
        let form = dom.find_ancestor_by_tag(target, "form");
        let others = if name.is_empty() {
            Vec::new()
        } else {
            dom.all_element_nodes()
                .into_iter()
                .filter(|other| {
                    *other != target
                        && is_input_of_type(dom, *other, "radio")
                        && dom.attr(*other, "name").as_deref() == Some(name.as_str())
                        && dom.find_ancestor_by_tag(*other, "form") == form
                })
                .collect()
        };
        for other in others {
            self.page.dom.set_checked(other, false)?;
        }
        self.page.dom.set_checked(target, true)
    }

    fn follow_link(&mut self, target: NodeId) {
        let Some(anchor) = self.page.dom.find_ancestor_by_tag(target, "a") else {
            return;
        };
        let Some(href) = self.page.dom.attr(anchor, "href") else {
            return;
        };
        let navigation = LocationNavigation {
            from: self.page.location.href(),
            to: self.page.location.resolve(&href),
        };
        self.page
            .trace_event_line(format!("[event] navigate {} -> {}", navigation.from, navigation.to));
        self.navigations.push(navigation);
    }

    fn dispatch_input_and_change(&mut self, target: NodeId) -> Result<()> {
        self.dispatch_event(target, "input", false)?;
        self.dispatch_event(target, "change", false)?;
        Ok(())
    }

    pub(crate) fn dispatch_event(
        &mut self,
        target: NodeId,
        event_type: &str,
        cancelable: bool,
    ) -> Result<EventState> {
        let mut event = EventState::new(event_type, target, self.page.now_ms);
        event.cancelable = cancelable;
        self.dispatch_prepared_event(event)
    }

    /// Runs the target's listeners, then bubbles through its ancestors from
    /// the parent up.
    fn dispatch_prepared_event(&mut self, mut event: EventState) -> Result<EventState> {
        let target = event.target;
        let target_label = self.page.label(target);
        self.page.trace_event_line(format!(
            "[event] {} target={} ts={}",
            event.event_type, target_label, event.time_stamp_ms
        ));

        event.phase = EventPhase::AtTarget;
        event.current_target = target;
        let mut ran = self.invoke_listeners(target, &mut event)?;

        if event.bubbles {
            let mut cursor = self.page.dom.parent(target);
            while let Some(node) = cursor {
                event.phase = EventPhase::Bubbling;
                event.current_target = node;
                ran += self.invoke_listeners(node, &mut event)?;
                cursor = self.page.dom.parent(node);
            }
        }

        self.page.trace_event_done(&event, ran);
        Ok(event)
    }

    fn invoke_listeners(&mut self, node: NodeId, event: &mut EventState) -> Result<usize> {
        let listeners = self.page.listeners.get(node, &event.event_type);
        for listener in &listeners {
            let current = self.page.label(node);
            self.page.trace_event_line(format!(
                "[event] {} current={} phase={} binding={}",
                event.event_type,
                current,
                event.phase.as_str(),
                listener.binding.name()
            ));
            self.controller
                .handle(&mut self.page, listener.binding, event)?;
        }
        Ok(listeners.len())
    }
}
