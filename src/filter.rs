//! Filter parsing and evaluation (C2).
//!
//! A filter is parsed lazily from a raw `serde_json::Value` per
//! `REQ` clause, so that one malformed filter degrades to a `NOTICE`
//! rather than closing the connection (see `relay.rs::handle_req`).

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

use crate::event::Event;

/// A single filter parse failure, carrying enough context for the
/// aggregated `NOTICE` text produced by the relay service.
#[derive(Debug, Clone)]
pub struct FilterParseError(pub String);

impl fmt::Display for FilterParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A predicate over events: a conjunction of optional clauses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub ids: Option<Vec<String>>,
    pub authors: Option<Vec<String>>,
    pub kinds: Option<Vec<i64>>,
    /// Tag filters keyed by the bare tag name (no leading `#`).
    pub tags: HashMap<String, Vec<String>>,
    pub since: Option<i64>,
    pub until: Option<i64>,
    /// Parsed but not evaluated by `matches` — applies only to historical
    /// replay cardinality.
    pub limit: Option<u64>,
}

fn string_array(value: &Value, clause: &str) -> Result<Vec<String>, FilterParseError> {
    value
        .as_array()
        .ok_or_else(|| FilterParseError(format!("\"{clause}\" must be an array")))?
        .iter()
        .map(|v| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| FilterParseError(format!("\"{clause}\" must contain only strings")))
        })
        .collect()
}

impl Filter {
    /// Parses a filter object. Unknown keys are ignored (not retained —
    /// this relay has no use for echoing them back). Tag-filter keys
    /// (`#x`) are collected into `tags` keyed by the bare letter.
    pub fn from_value(value: &Value) -> Result<Filter, FilterParseError> {
        let object = value
            .as_object()
            .ok_or_else(|| FilterParseError("filter must be a JSON object".to_string()))?;

        let mut filter = Filter::default();

        for (key, val) in object {
            match key.as_str() {
                "ids" => filter.ids = Some(string_array(val, "ids")?),
                "authors" => filter.authors = Some(string_array(val, "authors")?),
                "kinds" => {
                    let kinds = val
                        .as_array()
                        .ok_or_else(|| FilterParseError("\"kinds\" must be an array".to_string()))?
                        .iter()
                        .map(|v| {
                            v.as_i64()
                                .ok_or_else(|| FilterParseError("\"kinds\" must contain integers".to_string()))
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    filter.kinds = Some(kinds);
                }
                "since" => {
                    filter.since = Some(
                        val.as_i64()
                            .ok_or_else(|| FilterParseError("\"since\" must be an integer".to_string()))?,
                    );
                }
                "until" => {
                    filter.until = Some(
                        val.as_i64()
                            .ok_or_else(|| FilterParseError("\"until\" must be an integer".to_string()))?,
                    );
                }
                "limit" => {
                    filter.limit = Some(
                        val.as_u64()
                            .ok_or_else(|| FilterParseError("\"limit\" must be a non-negative integer".to_string()))?,
                    );
                }
                k if k.starts_with('#') && k.len() == 2 => {
                    let name = k[1..].to_string();
                    filter.tags.insert(name.clone(), string_array(val, k)?);
                }
                _ => {
                    // Unknown key: ignored by evaluation, per §4.2.
                }
            }
        }

        Ok(filter)
    }

    /// Returns true iff every present clause holds for `event`.
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(ids) = &self.ids {
            if !ids.iter().any(|id| id == &event.id) {
                return false;
            }
        }
        if let Some(authors) = &self.authors {
            if !authors.iter().any(|a| a == &event.pubkey) {
                return false;
            }
        }
        if let Some(kinds) = &self.kinds {
            if !kinds.contains(&event.kind) {
                return false;
            }
        }
        if let Some(since) = self.since {
            if event.created_at < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if event.created_at > until {
                return false;
            }
        }
        for (name, values) in &self.tags {
            let satisfied = event.tags.iter().any(|tag| {
                tag.len() >= 2 && &tag[0] == name && values.iter().any(|v| v == &tag[1])
            });
            if !satisfied {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: i64, pubkey: &str, created_at: i64, tags: Vec<Vec<&str>>) -> Event {
        Event {
            id: "deadbeef".to_string(),
            pubkey: pubkey.to_string(),
            sig: "sig".to_string(),
            created_at,
            kind,
            tags: tags
                .into_iter()
                .map(|t| t.into_iter().map(str::to_string).collect())
                .collect(),
            content: String::new(),
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = Filter::default();
        assert!(filter.matches(&event(1, "pk", 100, vec![])));
        assert!(filter.matches(&event(999, "other", 1, vec![vec!["e", "x"]])));
    }

    #[test]
    fn removing_a_clause_only_widens_matches() {
        let narrow = Filter {
            kinds: Some(vec![1]),
            authors: Some(vec!["pk".to_string()]),
            ..Default::default()
        };
        let widened = Filter {
            kinds: Some(vec![1]),
            ..Default::default()
        };
        let e = event(1, "other", 100, vec![]);
        assert!(!narrow.matches(&e));
        assert!(widened.matches(&e));
    }

    #[test]
    fn empty_ids_clause_matches_nothing() {
        let filter = Filter {
            ids: Some(vec![]),
            ..Default::default()
        };
        assert!(!filter.matches(&event(1, "pk", 100, vec![])));
    }

    #[test]
    fn kinds_clause() {
        let filter = Filter {
            kinds: Some(vec![1]),
            ..Default::default()
        };
        assert!(filter.matches(&event(1, "pk", 100, vec![])));
        assert!(!filter.matches(&event(7, "pk", 100, vec![])));
    }

    #[test]
    fn since_until_are_inclusive() {
        let filter = Filter {
            since: Some(100),
            until: Some(200),
            ..Default::default()
        };
        assert!(filter.matches(&event(1, "pk", 100, vec![])));
        assert!(filter.matches(&event(1, "pk", 200, vec![])));
        assert!(!filter.matches(&event(1, "pk", 99, vec![])));
        assert!(!filter.matches(&event(1, "pk", 201, vec![])));
    }

    #[test]
    fn tag_filter_matches_second_element() {
        let mut tags = HashMap::new();
        tags.insert("e".to_string(), vec!["abc".to_string()]);
        let filter = Filter {
            tags,
            ..Default::default()
        };
        assert!(filter.matches(&event(1, "pk", 1, vec![vec!["e", "abc"], vec!["p", "xyz"]])));
        assert!(!filter.matches(&event(1, "pk", 1, vec![vec!["e", "def"]])));
    }

    #[test]
    fn from_value_parses_known_clauses_and_ignores_unknown() {
        let raw = serde_json::json!({
            "kinds": [1, 7],
            "authors": ["pk1"],
            "#e": ["abc"],
            "limit": 10,
            "mystery": "ignored",
        });
        let filter = Filter::from_value(&raw).unwrap();
        assert_eq!(filter.kinds, Some(vec![1, 7]));
        assert_eq!(filter.authors, Some(vec!["pk1".to_string()]));
        assert_eq!(filter.tags.get("e"), Some(&vec!["abc".to_string()]));
        assert_eq!(filter.limit, Some(10));
    }

    #[test]
    fn from_value_rejects_non_object() {
        let raw = serde_json::json!(["not", "an", "object"]);
        assert!(Filter::from_value(&raw).is_err());
    }

    #[test]
    fn from_value_rejects_wrong_clause_types() {
        let raw = serde_json::json!({"kinds": "not-an-array"});
        assert!(Filter::from_value(&raw).is_err());
    }
}
