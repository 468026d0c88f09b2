//! Tag category vocabulary

use serde::{Deserialize, Serialize};

/// A controlled tagging vocabulary: category plus its permitted values.
/// Read-only during the ingestion and review workflows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagCategory {
    pub category_key: String,
    pub display_name: String,
    pub allowed_values: Vec<String>,
    pub is_active: bool,
}

impl TagCategory {
    pub fn allows(&self, value: &str) -> bool {
        self.allowed_values.iter().any(|v| v == value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_check_is_exact() {
        let category = TagCategory {
            category_key: "network_status".to_string(),
            display_name: "Network Status".to_string(),
            allowed_values: vec!["in_network".to_string(), "out_of_network".to_string()],
            is_active: true,
        };
        assert!(category.allows("in_network"));
        assert!(!category.allows("in_net"));
    }
}
