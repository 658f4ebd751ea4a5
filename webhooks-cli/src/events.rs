//! Known webhook event types and per-rule event selections.

/// Event types the platform delivers by default.
pub const ALL_EVENTS: &[&str] = &[
    "deployment.created",
    "deployment.error",
    "deployment.succeeded",
    "deployment.canceled",
    "domain.created",
    "project.created",
    "project.removed",
];

/// Label used for rules that cover every known event type.
pub const ALL_EVENTS_LABEL: &str = "All Events";

/// The list of event types currently known to the command.
///
/// This is the list registered with the platform and the reference used to
/// decide whether a rule is labeled "All Events". It can grow (for example
/// from `--events`) but never shrinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventCatalog {
    events: Vec<String>,
}

impl EventCatalog {
    /// Create a catalog seeded with [`ALL_EVENTS`].
    pub fn new() -> Self {
        Self {
            events: ALL_EVENTS.iter().map(|e| e.to_string()).collect(),
        }
    }

    /// Add an event type. Returns `false` if it was already known.
    pub fn register(&mut self, event_type: impl Into<String>) -> bool {
        let event_type = event_type.into();
        if event_type.is_empty() || self.contains(&event_type) {
            return false;
        }
        self.events.push(event_type);
        true
    }

    pub fn contains(&self, event_type: &str) -> bool {
        self.events.iter().any(|e| e == event_type)
    }

    pub fn events(&self) -> &[String] {
        &self.events
    }

    /// Whether `selection` contains every event type currently in the catalog.
    pub fn is_covered_by(&self, selection: &EventSelection) -> bool {
        self.events.iter().all(|e| selection.contains(e))
    }
}

impl Default for EventCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// The event types a forwarding rule is interested in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventSelection {
    /// Every event type, including ones the catalog learns about later.
    All,
    /// An explicit, de-duplicated list in the order it was given.
    Only(Vec<String>),
}

impl EventSelection {
    /// Build an explicit selection. Returns `None` if no non-empty event type
    /// was supplied.
    pub fn only<I, S>(events: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list: Vec<String> = Vec::new();
        for event in events {
            let event = event.as_ref().trim();
            if !event.is_empty() && !list.iter().any(|e| e == event) {
                list.push(event.to_string());
            }
        }

        if list.is_empty() {
            None
        } else {
            Some(EventSelection::Only(list))
        }
    }

    pub fn contains(&self, event_type: &str) -> bool {
        match self {
            EventSelection::All => true,
            EventSelection::Only(events) => events.iter().any(|e| e == event_type),
        }
    }

    /// Human-readable label, "All Events" when the selection covers the
    /// whole catalog as it stands right now.
    pub fn label(&self, catalog: &EventCatalog) -> String {
        match self {
            EventSelection::All => ALL_EVENTS_LABEL.to_string(),
            EventSelection::Only(_) if catalog.is_covered_by(self) => ALL_EVENTS_LABEL.to_string(),
            EventSelection::Only(events) => events.join(","),
        }
    }
}
