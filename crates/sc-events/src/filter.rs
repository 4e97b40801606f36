//! Subscription filters.

use serde::{Deserialize, Serialize};

/// Filter attached to a subscription at creation.
///
/// `None` fields are wildcards; every present field must equal the matching
/// event attribute for the event to be delivered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionFilter {
    pub key: Option<String>,
    pub environment: Option<String>,
    pub category: Option<String>,
}

impl SubscriptionFilter {
    /// A filter matching every event.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// True when no filter dimension is set.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.key.is_none() && self.environment.is_none() && self.category.is_none()
    }

    /// Does an event with these attributes pass this filter?
    #[must_use]
    pub fn matches(&self, key: &str, environment: &str, category: Option<&str>) -> bool {
        if let Some(want) = &self.key {
            if want != key {
                return false;
            }
        }
        if let Some(want) = &self.environment {
            if want != environment {
                return false;
            }
        }
        if let Some(want) = &self.category {
            if Some(want.as_str()) != category {
                return false;
            }
        }
        true
    }
}
