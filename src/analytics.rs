use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// One outbound `send(event, category, action, label)` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyticsEvent {
    pub hit_type: String,
    pub category: String,
    pub action: String,
    pub label: String,
}

impl AnalyticsEvent {
    pub const HIT_TYPE: &'static str = "event";

    pub fn new(
        category: impl Into<String>,
        action: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            hit_type: Self::HIT_TYPE.to_string(),
            category: category.into(),
            action: action.into(),
            label: label.into(),
        }
    }
}

impl fmt::Display for AnalyticsEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "send {} {}:{}:{}",
            self.hit_type, self.category, self.action, self.label
        )
    }
}

/// The external analytics collector. Sends are fire-and-forget: there is no
/// return value and nothing is retried.
pub trait AnalyticsSink {
    fn send(&mut self, event: &AnalyticsEvent);
}

impl<F> AnalyticsSink for F
where
    F: FnMut(&AnalyticsEvent),
{
    fn send(&mut self, event: &AnalyticsEvent) {
        self(event)
    }
}

/// Keeps every event it is sent, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingSink {
    events: Vec<AnalyticsEvent>,
}

impl RecordingSink {
    pub fn events(&self) -> &[AnalyticsEvent] {
        &self.events
    }

    pub fn take(&mut self) -> Vec<AnalyticsEvent> {
        std::mem::take(&mut self.events)
    }
}

impl AnalyticsSink for RecordingSink {
    fn send(&mut self, event: &AnalyticsEvent) {
        self.events.push(event.clone());
    }
}

/// A `data-metrics="category:action:label"` attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsDescriptor {
    pub category: String,
    pub action: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("metrics descriptor {raw:?} has {segments} segment(s), expected 3")]
pub struct MalformedDescriptor {
    pub raw: String,
    pub segments: usize,
}

impl FromStr for MetricsDescriptor {
    type Err = MalformedDescriptor;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let parts = raw.split(':').collect::<Vec<_>>();
        let [category, action, label] = parts.as_slice() else {
            return Err(MalformedDescriptor {
                raw: raw.to_string(),
                segments: parts.len(),
            });
        };
        Ok(Self {
            category: category.to_string(),
            action: action.to_string(),
            label: label.to_string(),
        })
    }
}

impl MetricsDescriptor {
    pub fn into_event(self) -> AnalyticsEvent {
        AnalyticsEvent::new(self.category, self.action, self.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_three_segment_descriptor() {
        let descriptor = "calculator:start:property".parse::<MetricsDescriptor>();
        assert_eq!(
            descriptor.map(MetricsDescriptor::into_event),
            Ok(AnalyticsEvent::new("calculator", "start", "property"))
        );
    }

    #[test]
    fn empty_segments_still_count() {
        let descriptor = "calculator::".parse::<MetricsDescriptor>();
        assert_eq!(
            descriptor.map(MetricsDescriptor::into_event),
            Ok(AnalyticsEvent::new("calculator", "", ""))
        );
    }

    #[test]
    fn wrong_segment_counts_are_rejected() {
        for (raw, segments) in [("", 1), ("a:b", 2), ("a:b:c:d", 4)] {
            let err = raw
                .parse::<MetricsDescriptor>()
                .expect_err("descriptor should be rejected");
            assert_eq!(err.segments, segments);
            assert_eq!(err.raw, raw);
        }
    }

    #[test]
    fn closures_and_recording_sinks_receive_events() {
        let mut seen = Vec::new();
        {
            let mut sink = |event: &AnalyticsEvent| seen.push(event.to_string());
            sink.send(&AnalyticsEvent::new("c", "a", "l"));
        }
        assert_eq!(seen, vec!["send event c:a:l".to_string()]);

        let mut recording = RecordingSink::default();
        recording.send(&AnalyticsEvent::new("c", "a", "l"));
        assert_eq!(recording.events().len(), 1);
        assert_eq!(recording.take().len(), 1);
        assert!(recording.events().is_empty());
    }

    #[test]
    fn serializes_for_collectors() -> serde_json::Result<()> {
        let json = serde_json::to_string(&AnalyticsEvent::new(
            "resident-shares-get-help",
            "Get help",
            "/calculate",
        ))?;
        assert_eq!(
            json,
            r#"{"hit_type":"event","category":"resident-shares-get-help","action":"Get help","label":"/calculate"}"#
        );
        Ok(())
    }
}
