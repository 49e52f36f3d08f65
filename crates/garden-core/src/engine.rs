use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use crate::config::EngineConfig;
use crate::contact::{Contact, ImportanceTier};
use crate::error::Result;
use crate::forecast::{ForecastResult, forecast_snapshots};
use crate::health::{HealthSnapshot, HealthTally, classify, classify_all};
use crate::layout::{LayoutMode, PositionedNode, place, placement_order};
use crate::time::CivilDate;
use crate::triage::TriageSession;

/// Order-independent fingerprint of a population at a given day.
///
/// Each contact's `(id, last interaction, target, importance)` is hashed on
/// its own and the per-contact hashes are folded with wrapping add and xor,
/// so the key needs no sort and is the same for any permutation.
///
/// Equal keys are only probable evidence of an equal population; the engine
/// confirms a key hit against the memoized contacts before reusing them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PopulationKey {
    now: CivilDate,
    len: usize,
    sum: u64,
    xor: u64,
}

impl PopulationKey {
    pub fn new(contacts: &[Contact], now: CivilDate) -> Self {
        let mut sum = 0u64;
        let mut xor = 0u64;
        for c in contacts {
            let mut h = DefaultHasher::new();
            c.id.hash(&mut h);
            c.last_interaction_date.hash(&mut h);
            c.target_frequency_days.hash(&mut h);
            c.importance_tier.hash(&mut h);
            let v = h.finish();
            sum = sum.wrapping_add(v);
            xor ^= v;
        }
        Self {
            now,
            len: contacts.len(),
            sum,
            xor,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// The fields a population's health and layout depend on.
type Identity<'a> = (&'a str, Option<CivilDate>, Option<i64>, ImportanceTier);

fn identity(c: &Contact) -> Identity<'_> {
    (
        c.id.as_str(),
        c.last_interaction_date,
        c.target_frequency_days,
        c.importance_tier,
    )
}

fn sorted_identities(contacts: &[Contact]) -> Vec<Identity<'_>> {
    let mut ids: Vec<Identity<'_>> = contacts.iter().map(identity).collect();
    ids.sort_unstable();
    ids
}

/// A population classified once and held in canonical (id) order, with
/// placement orders computed lazily per layout mode.
struct Prepared {
    key: PopulationKey,
    contacts: Vec<Contact>,
    /// `(id, last interaction, target, importance)` of `contacts`, fully sorted.
    identities: Vec<(String, Option<CivilDate>, Option<i64>, ImportanceTier)>,
    snapshots: Vec<HealthSnapshot>,
    tally: HealthTally,
    orders: HashMap<LayoutMode, Vec<usize>>,
}

impl Prepared {
    fn build(contacts: &[Contact], now: CivilDate, key: PopulationKey) -> Self {
        let mut contacts = contacts.to_vec();
        contacts.sort_by(|a, b| a.id.cmp(&b.id));
        let snapshots = classify_all(&contacts, now);
        let tally = HealthTally::from_snapshots(&snapshots);
        let identities = sorted_identities(&contacts)
            .into_iter()
            .map(|(id, date, target, tier)| (id.to_string(), date, target, tier))
            .collect();
        Self {
            key,
            identities,
            contacts,
            snapshots,
            tally,
            orders: HashMap::new(),
        }
    }

    /// Exact population equality, for confirming a key match.
    fn holds(&self, contacts: &[Contact]) -> bool {
        self.identities.len() == contacts.len()
            && sorted_identities(contacts)
                .into_iter()
                .zip(&self.identities)
                .all(|(a, (id, date, target, tier))| a == (id.as_str(), *date, *target, *tier))
    }

    fn ensure_order(&mut self, mode: LayoutMode) {
        if !self.orders.contains_key(&mode) {
            let order = placement_order(&self.contacts, &self.snapshots, mode);
            self.orders.insert(mode, order);
        }
    }
}

/// Memoizing facade over the engine operations.
///
/// Layout and forecast reuse the classified, sorted population for as long
/// as the [`PopulationKey`] is unchanged. Results are identical to the free
/// functions in [`crate::layout`] and [`crate::forecast`].
pub struct GardenEngine {
    config: EngineConfig,
    prepared: Option<Prepared>,
    stats: CacheStats,
}

impl GardenEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            prepared: None,
            stats: CacheStats::default(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.stats
    }

    /// Drop the memoized population.
    pub fn invalidate(&mut self) {
        self.prepared = None;
    }

    fn prepare(&mut self, contacts: &[Contact], now: CivilDate) -> &mut Prepared {
        let key = PopulationKey::new(contacts, now);
        if self
            .prepared
            .as_ref()
            .is_some_and(|p| p.key == key && p.holds(contacts))
        {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
            self.prepared = None;
        }
        self.prepared
            .get_or_insert_with(|| Prepared::build(contacts, now, key))
    }

    pub fn classify(&self, contact: &Contact, now: CivilDate) -> HealthSnapshot {
        classify(contact, now)
    }

    pub fn tally(&mut self, contacts: &[Contact], now: CivilDate) -> HealthTally {
        self.prepare(contacts, now).tally
    }

    /// Garden health percentage; `None` for an empty population.
    pub fn score(&mut self, contacts: &[Contact], now: CivilDate) -> Option<u32> {
        let weights = self.config.weights;
        self.tally(contacts, now).score(&weights)
    }

    pub fn layout(
        &mut self,
        contacts: &[Contact],
        now: CivilDate,
        mode: LayoutMode,
        max_nodes: Option<usize>,
    ) -> Vec<PositionedNode> {
        let max_nodes = max_nodes.unwrap_or(self.config.max_nodes);
        let config = self.config.clone();
        let prepared = self.prepare(contacts, now);
        prepared.ensure_order(mode);
        place(&prepared.snapshots, &prepared.orders[&mode], max_nodes, &config)
    }

    pub fn forecast(
        &mut self,
        contacts: &[Contact],
        now: CivilDate,
        horizon_days: i64,
        historical_velocity: usize,
    ) -> Result<ForecastResult> {
        let config = self.config.clone();
        let prepared = self.prepare(contacts, now);
        forecast_snapshots(
            &prepared.contacts,
            &prepared.snapshots,
            horizon_days,
            historical_velocity,
            &config,
        )
    }

    /// Start a new triage session. Never cached: each call is a fresh session.
    pub fn build_queue(
        &self,
        contacts: &[Contact],
        now: CivilDate,
        max_size: Option<usize>,
    ) -> TriageSession {
        TriageSession::build(contacts, now, max_size.unwrap_or(self.config.queue_size))
    }
}

impl Default for GardenEngine {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            prepared: None,
            stats: CacheStats::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::ImportanceTier;
    use crate::error::EngineError;
    use crate::{forecast, layout};

    fn now() -> CivilDate {
        CivilDate::parse("2026-10-17").unwrap()
    }

    fn population() -> Vec<Contact> {
        (0..80)
            .map(|i| {
                let tier = match i % 3 {
                    0 => ImportanceTier::High,
                    1 => ImportanceTier::Medium,
                    _ => ImportanceTier::Low,
                };
                let c = Contact::new(&format!("p{i:03}"), "x")
                    .with_target(7 + (i % 5) as i64 * 7)
                    .with_importance(tier);
                if i % 11 == 0 {
                    c
                } else {
                    c.with_last_interaction(now().add_days(-((i * 3 % 50) as i64)))
                }
            })
            .collect()
    }

    #[test]
    fn test_key_is_order_independent() {
        let a = population();
        let mut b = a.clone();
        b.reverse();
        assert_eq!(PopulationKey::new(&a, now()), PopulationKey::new(&b, now()));
    }

    #[test]
    fn test_key_changes_with_data_and_day() {
        let a = population();
        let mut b = a.clone();
        b[5].last_interaction_date = Some(now());
        let ka = PopulationKey::new(&a, now());
        assert_ne!(ka, PopulationKey::new(&b, now()));
        assert_ne!(ka, PopulationKey::new(&a, now().add_days(1)));

        let mut c = a.clone();
        c[7].target_frequency_days = Some(90);
        assert_ne!(ka, PopulationKey::new(&c, now()));
    }

    #[test]
    fn test_repeated_calls_hit_cache() {
        let contacts = population();
        let mut engine = GardenEngine::default();

        let first = engine.layout(&contacts, now(), LayoutMode::Frequency, None);
        let second = engine.layout(&contacts, now(), LayoutMode::Frequency, None);
        engine.forecast(&contacts, now(), 7, 2).unwrap();
        assert_eq!(first, second);
        assert_eq!(engine.cache_stats(), CacheStats { hits: 2, misses: 1 });

        let mut changed = contacts.clone();
        changed[0].last_interaction_date = Some(now());
        engine.layout(&changed, now(), LayoutMode::Frequency, None);
        assert_eq!(engine.cache_stats().misses, 2);

        engine.invalidate();
        engine.layout(&changed, now(), LayoutMode::Frequency, None);
        assert_eq!(engine.cache_stats().misses, 3);
    }

    #[test]
    fn test_colliding_key_is_a_miss() {
        let stale = population();
        let mut fresh = stale.clone();
        fresh[3].importance_tier = ImportanceTier::Low;
        fresh[4].last_interaction_date = None;

        // Memoize `stale` under the key `fresh` produces.
        let mut engine = GardenEngine::default();
        engine.prepared = Some(Prepared::build(
            &stale,
            now(),
            PopulationKey::new(&fresh, now()),
        ));

        let nodes = engine.layout(&fresh, now(), LayoutMode::Tier, None);
        assert_eq!(nodes, layout::layout(&fresh, now(), LayoutMode::Tier, None));
        assert_eq!(engine.cache_stats(), CacheStats { hits: 0, misses: 1 });

        engine.layout(&fresh, now(), LayoutMode::Tier, None);
        assert_eq!(engine.cache_stats().hits, 1);
    }

    #[test]
    fn test_matches_uncached_results() {
        let contacts = population();
        let mut engine = GardenEngine::default();
        for mode in [LayoutMode::Frequency, LayoutMode::Tier] {
            for max in [None, Some(10)] {
                assert_eq!(
                    engine.layout(&contacts, now(), mode, max),
                    layout::layout(&contacts, now(), mode, max)
                );
            }
        }
        assert_eq!(
            engine.forecast(&contacts, now(), 10, 4).unwrap(),
            forecast::forecast(&contacts, now(), 10, 4).unwrap()
        );
    }

    #[test]
    fn test_score_and_empty_population() {
        let mut engine = GardenEngine::default();
        assert_eq!(engine.score(&[], now()), None);
        assert!(engine.layout(&[], now(), LayoutMode::Tier, None).is_empty());

        let contacts = vec![Contact::new("a", "A").with_last_interaction(now())];
        assert_eq!(engine.score(&contacts, now()), Some(100));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.weights.blooming = 0;
        assert!(matches!(GardenEngine::new(cfg), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_configured_queue_size() {
        let cfg = EngineConfig {
            queue_size: 2,
            ..EngineConfig::default()
        };
        let engine = GardenEngine::new(cfg).unwrap();
        let session = engine.build_queue(&population(), now(), None);
        assert_eq!(session.active_len(), 2);
    }
}
