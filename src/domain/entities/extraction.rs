use serde::{Deserialize, Serialize};

/// Entities an LLM extracted from one signal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    #[serde(default)]
    pub customers: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub themes: Vec<String>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
            && self.features.is_empty()
            && self.issues.is_empty()
            && self.themes.is_empty()
    }
}
