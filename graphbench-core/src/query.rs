use serde::{Deserialize, Serialize};

/// A raw query as configured by the user, before any placeholder substitution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryTemplate {
    pub text: String,
    pub read_only: bool,
    pub weight: Option<f64>,
}

impl QueryTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            read_only: false,
            weight: None,
        }
    }

    /// Shorthand for a read-only query (sent through the read-only execution path).
    pub fn read_only(text: impl Into<String>) -> Self {
        Self {
            read_only: true,
            ..Self::new(text)
        }
    }

    pub fn weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }
}
