use std::collections::HashMap;

use crate::dom::NodeId;

/// What a listener does when it fires. Bindings are plain data: the
/// controller interprets them, so a page can be inspected and cloned without
/// carrying closures around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Binding {
    /// Re-evaluate a conditional region from the changed input's value.
    ToggleChange { region: Option<NodeId> },
    /// Collapse the panel set onto the clicked radio's panel.
    RadioPanelClick,
    /// Write the consent cookie and hide the banner.
    BannerDismiss { banner: Option<NodeId> },
    /// Send the fixed "get help" event with the page path captured at ready.
    GetHelp,
}

impl Binding {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::ToggleChange { .. } => "toggle-change",
            Self::RadioPanelClick => "radio-panel-click",
            Self::BannerDismiss { .. } => "banner-dismiss",
            Self::GetHelp => "get-help",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Listener {
    pub(crate) binding: Binding,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct ListenerStore {
    map: HashMap<NodeId, HashMap<String, Vec<Listener>>>,
}

impl ListenerStore {
    /// Registers `listener`. Re-registering an identical binding for the same
    /// type is a no-op, as with `addEventListener`.
    pub(crate) fn add(&mut self, node_id: NodeId, event: &str, listener: Listener) -> bool {
        let listeners = self
            .map
            .entry(node_id)
            .or_default()
            .entry(event.to_string())
            .or_default();
        if listeners.contains(&listener) {
            return false;
        }
        listeners.push(listener);
        true
    }

    pub(crate) fn get(&self, node_id: NodeId, event: &str) -> Vec<Listener> {
        self.map
            .get(&node_id)
            .and_then(|events| events.get(event))
            .cloned()
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn count(&self, node_id: NodeId, event: &str) -> usize {
        self.map
            .get(&node_id)
            .and_then(|events| events.get(event))
            .map_or(0, Vec::len)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EventPhase {
    AtTarget,
    Bubbling,
}

impl EventPhase {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::AtTarget => "target",
            Self::Bubbling => "bubble",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct EventState {
    pub(crate) event_type: String,
    pub(crate) target: NodeId,
    pub(crate) current_target: NodeId,
    pub(crate) phase: EventPhase,
    pub(crate) time_stamp_ms: i64,
    pub(crate) bubbles: bool,
    pub(crate) cancelable: bool,
    pub(crate) default_prevented: bool,
}

impl EventState {
    pub(crate) fn new(event_type: &str, target: NodeId, time_stamp_ms: i64) -> Self {
        Self {
            event_type: event_type.to_string(),
            target,
            current_target: target,
            phase: EventPhase::AtTarget,
            time_stamp_ms,
            bubbles: true,
            cancelable: true,
            default_prevented: false,
        }
    }

    pub(crate) fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }
}
