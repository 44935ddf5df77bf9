//! Classifier variants served by the service

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classifier family behind a trained pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    RandomForest,
    Knn,
}

impl ClassifierKind {
    /// Every variant, in the order they are reported
    pub const ALL: [ClassifierKind; 2] = [ClassifierKind::RandomForest, ClassifierKind::Knn];

    /// Stable identifier used in logs, responses and query strings
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassifierKind::RandomForest => "random_forest",
            ClassifierKind::Knn => "knn",
        }
    }
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_names_match_display() {
        for kind in ClassifierKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind));
        }

        let parsed: ClassifierKind = serde_json::from_str("\"knn\"").unwrap();
        assert_eq!(parsed, ClassifierKind::Knn);
    }
}
