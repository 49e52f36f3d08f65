use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::time::CivilDate;

/// How much a relationship matters to the user. Orders High > Medium > Low.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImportanceTier {
    High,
    #[default]
    Medium,
    Low,
}

impl ImportanceTier {
    /// 2 for High, 1 for Medium, 0 for Low.
    pub fn rank(self) -> u8 {
        match self {
            ImportanceTier::High => 2,
            ImportanceTier::Medium => 1,
            ImportanceTier::Low => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ImportanceTier::High => "high",
            ImportanceTier::Medium => "medium",
            ImportanceTier::Low => "low",
        }
    }

    /// Parse a stored tier name, falling back to Medium for unknown values.
    pub fn from_str_lossy(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => ImportanceTier::High,
            "low" => ImportanceTier::Low,
            _ => ImportanceTier::Medium,
        }
    }
}

impl PartialOrd for ImportanceTier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ImportanceTier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for ImportanceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A contact record as supplied by the host. The engine never mutates it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub last_interaction_date: Option<CivilDate>,
    #[serde(default)]
    pub target_frequency_days: Option<i64>,
    #[serde(default)]
    pub importance_tier: ImportanceTier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_ref: Option<String>,
}

impl Contact {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            last_interaction_date: None,
            target_frequency_days: None,
            importance_tier: ImportanceTier::default(),
            photo_ref: None,
        }
    }

    pub fn with_last_interaction(mut self, date: CivilDate) -> Self {
        self.last_interaction_date = Some(date);
        self
    }

    pub fn with_target(mut self, days: i64) -> Self {
        self.target_frequency_days = Some(days);
        self
    }

    pub fn with_importance(mut self, tier: ImportanceTier) -> Self {
        self.importance_tier = tier;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_importance_ordering() {
        assert!(ImportanceTier::High > ImportanceTier::Medium);
        assert!(ImportanceTier::Medium > ImportanceTier::Low);
        let mut tiers = vec![ImportanceTier::Low, ImportanceTier::High, ImportanceTier::Medium];
        tiers.sort_by(|a, b| b.cmp(a));
        assert_eq!(
            tiers,
            vec![ImportanceTier::High, ImportanceTier::Medium, ImportanceTier::Low]
        );
    }

    #[test]
    fn test_from_str_lossy() {
        assert_eq!(ImportanceTier::from_str_lossy("HIGH"), ImportanceTier::High);
        assert_eq!(ImportanceTier::from_str_lossy(" low "), ImportanceTier::Low);
        assert_eq!(ImportanceTier::from_str_lossy("vip"), ImportanceTier::Medium);
    }

    #[test]
    fn test_contact_json_camel_case() {
        let json = r#"{
            "id": "c-1",
            "name": "Ada",
            "lastInteractionDate": "2026-10-01",
            "targetFrequencyDays": 14,
            "importanceTier": "high"
        }"#;
        let c: Contact = serde_json::from_str(json).unwrap();
        assert_eq!(c.id, "c-1");
        assert_eq!(c.target_frequency_days, Some(14));
        assert_eq!(c.importance_tier, ImportanceTier::High);
        assert_eq!(c.last_interaction_date.unwrap().to_string(), "2026-10-01");
        assert!(c.photo_ref.is_none());
    }

    #[test]
    fn test_contact_json_defaults() {
        let c: Contact = serde_json::from_str(r#"{"id": "c-2", "name": "Bo"}"#).unwrap();
        assert!(c.last_interaction_date.is_none());
        assert!(c.target_frequency_days.is_none());
        assert_eq!(c.importance_tier, ImportanceTier::Medium);
    }
}
