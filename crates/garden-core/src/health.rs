use std::fmt;

use serde::Serialize;

use crate::config::ScoreWeights;
use crate::constants::{DEFAULT_TARGET_DAYS, NEVER_CONTACTED_DAYS};
use crate::contact::Contact;
use crate::time::CivilDate;

/// Relationship health, ordered from healthiest to most neglected.
///
/// With `r = days_since_contact / target`:
/// `r ≤ 0.5` Blooming, `r ≤ 1.0` Nourished, `r ≤ 2.0` Thirsty, else Fading.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Blooming,
    Nourished,
    Thirsty,
    Fading,
}

impl HealthState {
    pub const ALL: [HealthState; 4] = [
        HealthState::Blooming,
        HealthState::Nourished,
        HealthState::Thirsty,
        HealthState::Fading,
    ];

    /// 0 (Blooming) through 3 (Fading).
    pub fn severity(self) -> u8 {
        self as u8
    }

    pub fn is_healthy(self) -> bool {
        matches!(self, HealthState::Blooming | HealthState::Nourished)
    }

    /// Fixed palette color. Nothing else in the engine branches on it.
    pub fn color(self) -> &'static str {
        match self {
            HealthState::Blooming => "#34d399",
            HealthState::Nourished => "#a3e635",
            HealthState::Thirsty => "#fbbf24",
            HealthState::Fading => "#a8a29e",
        }
    }

    pub fn weight(self, weights: &ScoreWeights) -> u32 {
        match self {
            HealthState::Blooming => weights.blooming,
            HealthState::Nourished => weights.nourished,
            HealthState::Thirsty => weights.thirsty,
            HealthState::Fading => weights.fading,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HealthState::Blooming => "blooming",
            HealthState::Nourished => "nourished",
            HealthState::Thirsty => "thirsty",
            HealthState::Fading => "fading",
        }
    }

    /// Classify from elapsed days and an effective (positive) target.
    ///
    /// Integer cross-multiplication keeps the inclusive boundaries exact.
    pub fn from_days(days_since_contact: u32, target_days: u32) -> Self {
        let d = days_since_contact as u64;
        let t = target_days.max(1) as u64;
        if 2 * d <= t {
            HealthState::Blooming
        } else if d <= t {
            HealthState::Nourished
        } else if d <= 2 * t {
            HealthState::Thirsty
        } else {
            HealthState::Fading
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived, per-call health of one contact. Never persisted.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    pub contact_id: String,
    pub days_since_contact: u32,
    pub target_days: u32,
    pub state: HealthState,
    pub color: &'static str,
}

impl HealthSnapshot {
    pub fn new(contact_id: &str, days_since_contact: u32, target_days: u32) -> Self {
        let state = HealthState::from_days(days_since_contact, target_days);
        Self {
            contact_id: contact_id.to_string(),
            days_since_contact,
            target_days,
            state,
            color: state.color(),
        }
    }

    pub fn ratio(&self) -> f64 {
        self.days_since_contact as f64 / self.target_days.max(1) as f64
    }

    /// The optimistic post-interaction view: contacted today, Nourished.
    pub fn watered(&self) -> Self {
        Self {
            contact_id: self.contact_id.clone(),
            days_since_contact: 0,
            target_days: self.target_days,
            state: HealthState::Nourished,
            color: HealthState::Nourished.color(),
        }
    }
}

/// Target cadence actually used: the contact's own if positive, else 30.
pub fn effective_target(target_frequency_days: Option<i64>) -> u32 {
    match target_frequency_days {
        Some(t) if t > 0 => t.min(u32::MAX as i64) as u32,
        _ => DEFAULT_TARGET_DAYS,
    }
}

/// Whole days since the last interaction. Never-contacted yields the 999
/// sentinel; a future-dated interaction counts as today.
pub fn days_since_contact(last: Option<CivilDate>, now: CivilDate) -> u32 {
    match last {
        None => NEVER_CONTACTED_DAYS,
        Some(date) => now.days_since(date).clamp(0, u32::MAX as i64) as u32,
    }
}

/// Classify a single contact at `now`.
pub fn classify(contact: &Contact, now: CivilDate) -> HealthSnapshot {
    HealthSnapshot::new(
        &contact.id,
        days_since_contact(contact.last_interaction_date, now),
        effective_target(contact.target_frequency_days),
    )
}

/// Classify a population, preserving input order.
pub fn classify_all(contacts: &[Contact], now: CivilDate) -> Vec<HealthSnapshot> {
    contacts.iter().map(|c| classify(c, now)).collect()
}

/// Per-state counts for a population.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HealthTally {
    pub blooming: usize,
    pub nourished: usize,
    pub thirsty: usize,
    pub fading: usize,
}

impl HealthTally {
    pub fn from_snapshots<'a>(snapshots: impl IntoIterator<Item = &'a HealthSnapshot>) -> Self {
        let mut tally = Self::default();
        for s in snapshots {
            tally.add(s.state);
        }
        tally
    }

    pub fn add(&mut self, state: HealthState) {
        match state {
            HealthState::Blooming => self.blooming += 1,
            HealthState::Nourished => self.nourished += 1,
            HealthState::Thirsty => self.thirsty += 1,
            HealthState::Fading => self.fading += 1,
        }
    }

    pub fn count(&self, state: HealthState) -> usize {
        match state {
            HealthState::Blooming => self.blooming,
            HealthState::Nourished => self.nourished,
            HealthState::Thirsty => self.thirsty,
            HealthState::Fading => self.fading,
        }
    }

    pub fn total(&self) -> usize {
        self.blooming + self.nourished + self.thirsty + self.fading
    }

    pub fn healthy(&self) -> usize {
        self.blooming + self.nourished
    }

    /// Weighted average score in [0, 100], rounded half up.
    /// `None` for an empty population: there is no garden to grade.
    pub fn score(&self, weights: &ScoreWeights) -> Option<u32> {
        let n = self.total() as u64;
        if n == 0 {
            return None;
        }
        let sum: u64 = HealthState::ALL
            .iter()
            .map(|&s| s.weight(weights) as u64 * self.count(s) as u64)
            .sum();
        Some(((2 * sum + n) / (2 * n)) as u32)
    }
}

/// Aggregate "garden health" percentage for a population.
pub fn population_score(snapshots: &[HealthSnapshot], weights: &ScoreWeights) -> Option<u32> {
    HealthTally::from_snapshots(snapshots).score(weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::ImportanceTier;

    fn day(s: &str) -> CivilDate {
        CivilDate::parse(s).unwrap()
    }

    #[test]
    fn test_never_contacted_is_fading() {
        let c = Contact::new("a", "Ann");
        let snap = classify(&c, day("2026-10-17"));
        assert_eq!(snap.days_since_contact, 999);
        assert_eq!(snap.target_days, 30);
        assert_eq!(snap.state, HealthState::Fading);
        assert!((snap.ratio() - 33.3).abs() < 0.01);
    }

    #[test]
    fn test_half_target_is_blooming_inclusive() {
        let now = day("2026-10-17");
        let c = Contact::new("b", "Ben")
            .with_target(14)
            .with_last_interaction(now.add_days(-7));
        let snap = classify(&c, now);
        assert_eq!(snap.days_since_contact, 7);
        assert_eq!(snap.state, HealthState::Blooming);
    }

    #[test]
    fn test_boundaries() {
        let cases = [
            (0, 14, HealthState::Blooming),
            (7, 14, HealthState::Blooming),
            (8, 14, HealthState::Nourished),
            (14, 14, HealthState::Nourished),
            (15, 14, HealthState::Thirsty),
            (28, 14, HealthState::Thirsty),
            (29, 14, HealthState::Fading),
            // odd target: 0.5 · 7 = 3.5
            (3, 7, HealthState::Blooming),
            (4, 7, HealthState::Nourished),
        ];
        for (days, target, expected) in cases {
            assert_eq!(
                HealthState::from_days(days, target),
                expected,
                "days={days}, target={target}"
            );
        }
    }

    #[test]
    fn test_non_positive_target_defaults() {
        assert_eq!(effective_target(None), 30);
        assert_eq!(effective_target(Some(0)), 30);
        assert_eq!(effective_target(Some(-5)), 30);
        assert_eq!(effective_target(Some(45)), 45);
    }

    #[test]
    fn test_future_interaction_counts_as_today() {
        let now = day("2026-10-17");
        assert_eq!(days_since_contact(Some(now.add_days(3)), now), 0);
    }

    #[test]
    fn test_color_one_to_one() {
        let colors: std::collections::HashSet<_> =
            HealthState::ALL.iter().map(|s| s.color()).collect();
        assert_eq!(colors.len(), 4);
        let snap = HealthSnapshot::new("x", 40, 30);
        assert_eq!(snap.color, HealthState::Thirsty.color());
    }

    #[test]
    fn test_watered_snapshot() {
        let snap = HealthSnapshot::new("x", 100, 30);
        let w = snap.watered();
        assert_eq!(w.days_since_contact, 0);
        assert_eq!(w.state, HealthState::Nourished);
        assert_eq!(w.color, HealthState::Nourished.color());
        assert_eq!(w.target_days, 30);
    }

    #[test]
    fn test_population_score() {
        let w = ScoreWeights::default();
        let snaps = vec![
            HealthSnapshot::new("a", 0, 30),   // blooming 100
            HealthSnapshot::new("b", 20, 30),  // nourished 70
            HealthSnapshot::new("c", 40, 30),  // thirsty 40
            HealthSnapshot::new("d", 999, 30), // fading 10
        ];
        // 220 / 4 = 55
        assert_eq!(population_score(&snaps, &w), Some(55));

        // 210 / 3
        assert_eq!(population_score(&snaps[..3], &w), Some(70));
        assert_eq!(population_score(&snaps[1..4], &w), Some(40));
        let two = [snaps[0].clone(), snaps[1].clone()];
        // 170 / 2 = 85
        assert_eq!(population_score(&two, &w), Some(85));
    }

    #[test]
    fn test_score_rounds_half_up() {
        let w = ScoreWeights::default();
        let mut tally = HealthTally::default();
        tally.add(HealthState::Nourished); // 70
        tally.add(HealthState::Thirsty); // 40
        tally.add(HealthState::Fading); // 10
        tally.add(HealthState::Fading); // 10 → 130 / 4 = 32.5
        assert_eq!(tally.score(&w), Some(33));
    }

    #[test]
    fn test_empty_population_score_is_none() {
        assert_eq!(population_score(&[], &ScoreWeights::default()), None);
    }

    #[test]
    fn test_tally_counts() {
        let now = day("2026-10-17");
        let contacts = vec![
            Contact::new("a", "A").with_last_interaction(now),
            Contact::new("b", "B").with_importance(ImportanceTier::High),
            Contact::new("c", "C").with_target(10).with_last_interaction(now.add_days(-8)),
        ];
        let snaps = classify_all(&contacts, now);
        let tally = HealthTally::from_snapshots(&snaps);
        assert_eq!(tally.blooming, 1);
        assert_eq!(tally.nourished, 1);
        assert_eq!(tally.fading, 1);
        assert_eq!(tally.healthy(), 2);
        assert_eq!(tally.total(), 3);
    }
}
