//! EventLog - operator-facing activity record
//!
//! - Event: envelope with id + wall-clock timestamp + kind + message
//! - EventKind: info / warning / error / success
//! - EventLog: append-only, capped; oldest entries are trimmed first
//!
//! The log is owned by the dashboard state actor, so `append` is the single
//! insertion point and needs no internal locking.

use std::collections::VecDeque;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Single entry in the activity log. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    /// Monotonic sequence ID (for ordering)
    pub id: u64,
    pub timestamp: DateTime<Local>,
    pub kind: EventKind,
    /// Finer-grained level, only set on enhanced error events
    pub severity: Option<Severity>,
    pub category: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Info,
    Warning,
    Error,
    Success,
}

impl EventKind {
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Info => "ℹ",
            Self::Warning => "⚠",
            Self::Error => "✗",
            Self::Success => "✓",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// An event before it has been stamped by the log.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub kind: EventKind,
    pub severity: Option<Severity>,
    pub category: Option<String>,
    pub message: String,
}

impl NewEvent {
    fn plain(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: None,
            category: None,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::plain(EventKind::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::plain(EventKind::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::plain(EventKind::Error, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::plain(EventKind::Success, message)
    }

    /// Enhanced error event carrying severity and category
    pub fn enhanced_error(
        severity: Severity,
        category: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: EventKind::Error,
            severity: Some(severity),
            category: Some(category.into()),
            message: message.into(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Append-only, capped event log
#[derive(Debug, Clone)]
pub struct EventLog {
    events: VecDeque<Event>,
    max_events: usize,
    next_id: u64,
}

impl EventLog {
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events.min(1024)),
            max_events: max_events.max(1),
            next_id: 0,
        }
    }

    /// Stamp and append an event, trimming the oldest past the cap.
    /// Returns the event ID.
    pub fn append(&mut self, event: NewEvent) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.events.push_back(Event {
            id,
            timestamp: Local::now(),
            kind: event.kind,
            severity: event.severity,
            category: event.category,
            message: event.message,
        });
        while self.events.len() > self.max_events {
            self.events.pop_front();
        }
        id
    }

    /// Retained events, oldest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Event> + ExactSizeIterator {
        self.events.iter()
    }

    /// The last `n` retained events, oldest first
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &Event> {
        let skip = self.events.len().saturating_sub(n);
        self.events.iter().skip(skip)
    }

    pub fn last(&self) -> Option<&Event> {
        self.events.back()
    }

    pub fn count_kind(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }

    /// Total number of events ever appended, including trimmed ones
    pub fn total_appended(&self) -> u64 {
        self.next_id
    }

    pub fn max_events(&self) -> usize {
        self.max_events
    }

    /// Serialize retained events to JSON for debugging
    pub fn to_json(&self) -> Value {
        serde_json::to_value(&self.events).unwrap_or(Value::Null)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eventlog_new_starts_empty() {
        let log = EventLog::new(10);
        assert!(log.is_empty());
        assert_eq!(log.total_appended(), 0);
    }

    #[test]
    fn eventlog_append_returns_monotonic_ids() {
        let mut log = EventLog::new(10);
        let a = log.append(NewEvent::info("one"));
        let b = log.append(NewEvent::warning("two"));
        let c = log.append(NewEvent::success("three"));
        assert_eq!((a, b, c), (0, 1, 2));
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn eventlog_trims_oldest_first() {
        let mut log = EventLog::new(3);
        for i in 0..5 {
            log.append(NewEvent::info(format!("event {}", i)));
        }
        let messages: Vec<_> = log.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["event 2", "event 3", "event 4"]);
        assert_eq!(log.total_appended(), 5);
    }

    #[test]
    fn eventlog_preserves_insertion_order() {
        let mut log = EventLog::new(100);
        for i in 0..20 {
            log.append(NewEvent::info(format!("{}", i)));
        }
        let ids: Vec<u64> = log.iter().map(|e| e.id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn eventlog_recent_returns_tail() {
        let mut log = EventLog::new(10);
        for i in 0..6 {
            log.append(NewEvent::info(format!("{}", i)));
        }
        let tail: Vec<_> = log.recent(2).map(|e| e.message.clone()).collect();
        assert_eq!(tail, vec!["4", "5"]);
        assert_eq!(log.recent(50).count(), 6);
    }

    #[test]
    fn enhanced_error_carries_severity() {
        let mut log = EventLog::new(5);
        log.append(NewEvent::enhanced_error(
            Severity::Critical,
            "network",
            "connection reset",
        ));
        let event = log.last().unwrap();
        assert_eq!(event.kind, EventKind::Error);
        assert_eq!(event.severity, Some(Severity::Critical));
        assert_eq!(event.category.as_deref(), Some("network"));
    }

    #[test]
    fn zero_cap_is_raised_to_one() {
        let mut log = EventLog::new(0);
        log.append(NewEvent::info("a"));
        log.append(NewEvent::info("b"));
        assert_eq!(log.len(), 1);
        assert_eq!(log.last().unwrap().message, "b");
    }

    #[test]
    fn eventlog_to_json() {
        let mut log = EventLog::new(5);
        log.append(NewEvent::warning("careful"));
        let json = log.to_json();
        assert!(json.is_array());
        assert_eq!(json[0]["kind"], "warning");
        assert_eq!(json[0]["message"], "careful");
    }

    #[test]
    fn count_kind_counts_only_matching() {
        let mut log = EventLog::new(10);
        log.append(NewEvent::warning("a"));
        log.append(NewEvent::info("b"));
        log.append(NewEvent::warning("c"));
        assert_eq!(log.count_kind(EventKind::Warning), 2);
        assert_eq!(log.count_kind(EventKind::Error), 0);
    }
}
