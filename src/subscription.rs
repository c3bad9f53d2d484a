//! Subscription: a named disjunction of filters scoped to one connection (C3).

use crate::event::Event;
use crate::filter::Filter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub id: String,
    pub filters: Vec<Filter>,
}

impl Subscription {
    pub fn new(id: String, filters: Vec<Filter>) -> Self {
        Subscription { id, filters }
    }

    /// `matches(event) = ∃ f ∈ filters : f.matches(event)`. A subscription
    /// with no filters (e.g. every filter in the REQ failed to parse)
    /// matches nothing.
    pub fn matches(&self, event: &Event) -> bool {
        self.filters.iter().any(|f| f.matches(event))
    }
}
