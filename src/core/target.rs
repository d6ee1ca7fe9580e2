//! Fixture targeting call contract.
//!
//! The query language itself lives outside the engine. `SelectorTargeting`
//! only tokenizes the query so hosts without a real resolver still get a
//! usable descriptor.

use serde::{Deserialize, Serialize};

/// Resolved target of an asset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDescriptor {
    /// Original query string
    pub query: String,
    /// Selector tokens, in query order
    pub selectors: Vec<String>,
}

/// Targeting collaborator. Synchronous pass-through, no caching.
pub trait TargetQuery: Send {
    fn query_target(&self, query: &str) -> TargetDescriptor;
}

/// Splits a query on commas and whitespace
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectorTargeting;

impl TargetQuery for SelectorTargeting {
    fn query_target(&self, query: &str) -> TargetDescriptor {
        let selectors = query
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        TargetDescriptor {
            query: query.to_string(),
            selectors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_split() {
        let t = SelectorTargeting.query_target("group:front, fixture:12  fixture:13");
        assert_eq!(t.query, "group:front, fixture:12  fixture:13");
        assert_eq!(t.selectors, vec!["group:front", "fixture:12", "fixture:13"]);
    }

    #[test]
    fn test_empty_query() {
        let t = SelectorTargeting.query_target("");
        assert!(t.selectors.is_empty());
    }
}
