//! Forwarding rules and event-type matching.
//!
//! A rule is written on the command line as either `URL` (forward every
//! event) or `EVENTS=URL`, where `EVENTS` is a comma-separated list such as
//! `deployment.created,domain.created=http://localhost:3000/api/webhook`.

use std::str::FromStr;

use thiserror::Error;
use url::Url;

use crate::events::{EventCatalog, EventSelection};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RuleParseError {
    #[error("invalid forwarding URL '{0}': {1}")]
    InvalidUrl(String, url::ParseError),

    #[error("forwarding URL '{0}' must use http or https")]
    UnsupportedScheme(String),

    #[error("forwarding rule '{0}' does not name any event types")]
    NoEvents(String),
}

/// Where to send a webhook and which event types to send there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardingRule {
    pub url: Url,
    pub events: EventSelection,
}

impl ForwardingRule {
    pub fn new(url: Url, events: EventSelection) -> Self {
        Self { url, events }
    }

    /// Forward every event type to `url`.
    pub fn all(url: Url) -> Self {
        Self::new(url, EventSelection::All)
    }
}

impl FromStr for ForwardingRule {
    type Err = RuleParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();

        // A bare URL never parses as `EVENTS=URL` because '=' is not a valid
        // scheme character, so try the URL form first.
        let bare_err = match Url::parse(raw) {
            Ok(url) => return Ok(ForwardingRule::all(check_scheme(url, raw)?)),
            Err(e) => e,
        };

        match raw.split_once('=') {
            Some((events, url)) => {
                let url = Url::parse(url.trim())
                    .map_err(|e| RuleParseError::InvalidUrl(url.trim().to_string(), e))?;
                let url = check_scheme(url, raw)?;
                let events = EventSelection::only(events.split(','))
                    .ok_or_else(|| RuleParseError::NoEvents(raw.to_string()))?;
                Ok(ForwardingRule::new(url, events))
            }
            None => Err(RuleParseError::InvalidUrl(raw.to_string(), bare_err)),
        }
    }
}

fn check_scheme(url: Url, raw: &str) -> Result<Url, RuleParseError> {
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(RuleParseError::UnsupportedScheme(raw.to_string())),
    }
}

/// Ordered rule set, fixed for the lifetime of the server.
#[derive(Debug, Clone, Default)]
pub struct RuleMatcher {
    rules: Vec<ForwardingRule>,
    catalog: EventCatalog,
}

impl RuleMatcher {
    pub fn new(rules: Vec<ForwardingRule>, catalog: EventCatalog) -> Self {
        Self { rules, catalog }
    }

    /// Every rule interested in `event_type`, in the order the rules were given.
    pub fn matching(&self, event_type: &str) -> Vec<&ForwardingRule> {
        self.rules
            .iter()
            .filter(|rule| rule.events.contains(event_type))
            .collect()
    }

    /// Display label for a rule's event list.
    pub fn label(&self, rule: &ForwardingRule) -> String {
        rule.events.label(&self.catalog)
    }

    pub fn rules(&self) -> &[ForwardingRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ALL_EVENTS;

    fn rule(url: &str, events: &[&str]) -> ForwardingRule {
        ForwardingRule::new(
            Url::parse(url).unwrap(),
            EventSelection::only(events.iter().copied()).unwrap(),
        )
    }

    fn urls(rules: Vec<&ForwardingRule>) -> Vec<String> {
        rules.into_iter().map(|r| r.url.to_string()).collect()
    }

    #[test]
    fn test_parse_bare_url_forwards_everything() {
        let parsed: ForwardingRule = "http://localhost:3000/api/webhook".parse().unwrap();
        assert_eq!(parsed.url.as_str(), "http://localhost:3000/api/webhook");
        assert_eq!(parsed.events, EventSelection::All);
    }

    #[test]
    fn test_parse_bare_url_with_query_equals() {
        let parsed: ForwardingRule = "https://example.com/hook?token=abc".parse().unwrap();
        assert_eq!(parsed.url.query(), Some("token=abc"));
        assert_eq!(parsed.events, EventSelection::All);
    }

    #[test]
    fn test_parse_events_and_url() {
        let parsed: ForwardingRule = "deployment.created, domain.created=http://localhost:3000/hook?a=b"
            .parse()
            .unwrap();
        assert_eq!(parsed.url.as_str(), "http://localhost:3000/hook?a=b");
        assert_eq!(
            parsed.events,
            EventSelection::Only(vec![
                "deployment.created".to_string(),
                "domain.created".to_string()
            ])
        );
    }

    #[test]
    fn test_parse_rejects_empty_events() {
        let err = ",=http://localhost:3000".parse::<ForwardingRule>().unwrap_err();
        assert!(matches!(err, RuleParseError::NoEvents(_)));
    }

    #[test]
    fn test_parse_rejects_invalid_url() {
        let err = "not a url".parse::<ForwardingRule>().unwrap_err();
        assert!(matches!(err, RuleParseError::InvalidUrl(_, _)));

        let err = "deployment.created=nope".parse::<ForwardingRule>().unwrap_err();
        assert!(matches!(err, RuleParseError::InvalidUrl(_, _)));
    }

    #[test]
    fn test_parse_rejects_non_http_scheme() {
        let err = "ftp://example.com/hook".parse::<ForwardingRule>().unwrap_err();
        assert!(matches!(err, RuleParseError::UnsupportedScheme(_)));
    }

    #[test]
    fn test_matching_single_rule() {
        let matcher = RuleMatcher::new(
            vec![rule("http://x", &["deployment.created", "domain.created"])],
            EventCatalog::new(),
        );

        assert_eq!(urls(matcher.matching("deployment.created")), vec!["http://x/"]);
        assert!(matcher.matching("project.removed").is_empty());
    }

    #[test]
    fn test_matching_only_interested_rules() {
        let matcher = RuleMatcher::new(
            vec![
                rule("http://a", &["deployment.created"]),
                rule("http://b", &["domain.created"]),
            ],
            EventCatalog::new(),
        );

        assert_eq!(urls(matcher.matching("domain.created")), vec!["http://b/"]);
    }

    #[test]
    fn test_matching_preserves_rule_order() {
        let matcher = RuleMatcher::new(
            vec![
                rule("http://c", &["domain.created"]),
                rule("http://a", &["deployment.created"]),
                ForwardingRule::all(Url::parse("http://b").unwrap()),
                rule("http://d", &["project.created", "domain.created"]),
            ],
            EventCatalog::new(),
        );

        assert_eq!(
            urls(matcher.matching("domain.created")),
            vec!["http://c/", "http://b/", "http://d/"]
        );
    }

    #[test]
    fn test_all_matches_events_added_later() {
        let mut catalog = EventCatalog::new();
        let all = ForwardingRule::all(Url::parse("http://all").unwrap());
        let listed = rule("http://listed", ALL_EVENTS);

        catalog.register("integration.installed");
        let matcher = RuleMatcher::new(vec![all, listed], catalog);

        assert_eq!(urls(matcher.matching("integration.installed")), vec!["http://all/"]);
        for event in ALL_EVENTS {
            assert_eq!(matcher.matching(event).len(), 2);
        }
    }

    #[test]
    fn test_labels() {
        let matcher = RuleMatcher::new(
            vec![
                rule("http://full", ALL_EVENTS),
                rule("http://partial", &["domain.created", "project.created"]),
            ],
            EventCatalog::new(),
        );

        assert_eq!(matcher.label(&matcher.rules()[0]), "All Events");
        assert_eq!(matcher.label(&matcher.rules()[1]), "domain.created,project.created");
    }

    #[test]
    fn test_empty_matcher() {
        let matcher = RuleMatcher::default();
        assert!(matcher.is_empty());
        assert!(matcher.matching("deployment.created").is_empty());
    }
}
