//! Warning sink for the response mappers.
//!
//! Mappers never fail on partial backend data; they drop or omit and report
//! what they did through a [`Diagnostics`] handle. Production code uses
//! [`TracingDiagnostics`]; tests hand in a [`RecordingDiagnostics`] and
//! assert on the captured events.

use serde::Serialize;
use std::sync::Mutex;

/// Which backend dialect produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Cloud,
    OnPrem,
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::Cloud => f.write_str("cloud"),
            Dialect::OnPrem => f.write_str("onprem"),
        }
    }
}

/// A non-fatal anomaly found while normalizing a backend response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DiagnosticEvent {
    /// A search hit was dropped because its id or title could not be derived.
    /// Both attempted values are kept so near-misses are visible.
    SearchHitSkipped {
        dialect: Dialect,
        id: Option<String>,
        title: Option<String>,
    },
}

/// Receives mapper warnings.
pub trait Diagnostics: Send + Sync {
    fn warn(&self, event: DiagnosticEvent);
}

/// Forwards events to `tracing` at WARN level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn warn(&self, event: DiagnosticEvent) {
        match &event {
            DiagnosticEvent::SearchHitSkipped { dialect, id, title } => {
                tracing::warn!(
                    %dialect,
                    id = ?id,
                    title = ?title,
                    "skip search hit: missing required fields (id/title)"
                );
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far.
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn warn(&self, event: DiagnosticEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_keeps_order() {
        let diag = RecordingDiagnostics::new();
        diag.warn(DiagnosticEvent::SearchHitSkipped {
            dialect: Dialect::Cloud,
            id: None,
            title: Some("a".into()),
        });
        diag.warn(DiagnosticEvent::SearchHitSkipped {
            dialect: Dialect::OnPrem,
            id: Some("1".into()),
            title: None,
        });

        let events = diag.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[1],
            DiagnosticEvent::SearchHitSkipped { dialect: Dialect::OnPrem, .. }
        ));
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let event = DiagnosticEvent::SearchHitSkipped {
            dialect: Dialect::OnPrem,
            id: None,
            title: Some("Runbook".into()),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "search_hit_skipped");
        assert_eq!(json["dialect"], "onprem");
        assert!(json["id"].is_null());
    }
}
