// src/services/access.rs

//! Access-policy builder.
//!
//! Resolves the caller's permission groups and turns them into the
//! [`AccessFilter`] every call query is restricted by.

use serde_json::{Value, json};
use tracing::{error, info};

use crate::error::{AppError, Result};
use crate::models::{AccessFilter, PermissionGroup};
use crate::services::search::SearchIndex;
use crate::storage::GroupDirectory;

/// Groups of one user and the filter derived from them.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    pub groups: Vec<PermissionGroup>,
    pub filter: AccessFilter,
}

impl AccessPolicy {
    pub fn group_names(&self) -> Vec<String> {
        self.groups.iter().map(|g| g.name.clone()).collect()
    }
}

/// Resolve the user's groups and build the access filter.
///
/// A user whose groups grant no distributor or no line of business can see
/// no call at all, and is rejected here.
pub async fn resolve_access(directory: &dyn GroupDirectory, email: &str) -> Result<AccessPolicy> {
    let groups = directory.user_groups(email).await?;
    info!("User {} belongs to {} permission groups", email, groups.len());

    let filter = AccessFilter::from_groups(&groups);
    if filter.is_empty() {
        error!("Permission groups of {} grant no call access", email);
        return Err(AppError::access_denied(
            "User group does not have access to transcribe calls.",
        ));
    }

    Ok(AccessPolicy { groups, filter })
}

/// Query for any access-rights document granted to one of `group_names`.
pub fn access_rights_query(group_names: &[String]) -> Value {
    json!({
        "query": {
            "bool": {
                "should": [
                    { "terms": { "user_group": group_names } }
                ]
            }
        },
        "size": 1
    })
}

/// Check that at least one of the user's groups holds transcription rights.
///
/// Any failure of the check itself counts as a denial.
pub async fn check_access_rights(
    search: &dyn SearchIndex,
    index: &str,
    policy: &AccessPolicy,
) -> Result<()> {
    let query = access_rights_query(&policy.group_names());

    let granted = match search.search_hits(index, &query).await {
        Ok(response) => response.total() > 0,
        Err(e) => {
            error!("Error during user group access validation: {}", e);
            false
        }
    };

    if !granted {
        error!("User does not have the rights to transcribe calls");
        return Err(AppError::access_denied(
            "User group does not have access to transcribe calls.",
        ));
    }
    Ok(())
}
