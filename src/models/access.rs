//! Permission groups and the call access filter derived from them.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// A permission group a user belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub distributors: Vec<String>,
    #[serde(default)]
    pub lines_of_business: Vec<String>,
}

/// Predicate restricting calls to the distributors and lines of business a
/// user may see: `distributor_number ∈ distributors ∧ line_of_business ∈
/// lines_of_business`.
///
/// Both sets are ordered so equal group memberships yield equal filters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccessFilter {
    pub distributors: BTreeSet<String>,
    pub lines_of_business: BTreeSet<String>,
}

impl AccessFilter {
    /// Union the distributors and lines of business of every group.
    pub fn from_groups(groups: &[PermissionGroup]) -> Self {
        let mut filter = Self::default();
        for group in groups {
            filter.distributors.extend(group.distributors.iter().cloned());
            filter
                .lines_of_business
                .extend(group.lines_of_business.iter().cloned());
        }
        filter
    }

    /// A filter with an empty side matches nothing.
    pub fn is_empty(&self) -> bool {
        self.distributors.is_empty() || self.lines_of_business.is_empty()
    }

    /// Render as a search query clause.
    pub fn to_query(&self) -> Value {
        json!({
            "bool": {
                "filter": [
                    { "terms": { "distributor_number": self.distributors } },
                    { "terms": { "line_of_business": self.lines_of_business } },
                ]
            }
        })
    }
}
