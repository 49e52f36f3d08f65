//! Decay forecast: how many healthy relationships survive the next
//! `horizon_days`, given a host-estimated growth rate.

use std::fmt;

use serde::Serialize;

use crate::config::EngineConfig;
use crate::contact::{Contact, ImportanceTier};
use crate::error::{EngineError, Result};
use crate::health::{HealthSnapshot, HealthTally, classify_all};
use crate::time::CivilDate;

/// Coarse summary of growth versus decay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherState {
    Sunny,
    Overcast,
    Stormy,
}

impl fmt::Display for WeatherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WeatherState::Sunny => "sunny",
            WeatherState::Overcast => "overcast",
            WeatherState::Stormy => "stormy",
        };
        f.write_str(s)
    }
}

/// A currently healthy contact that decays within the horizon.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AtRiskContact {
    pub contact_id: String,
    pub days_until_decay: u32,
    pub importance_tier: ImportanceTier,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastResult {
    pub horizon_days: u32,
    pub current_healthy_count: usize,
    pub velocity_resonance: usize,
    pub decay_count: usize,
    pub forecasted_healthy_count: usize,
    pub at_risk_contacts: Vec<AtRiskContact>,
    pub weather_state: WeatherState,
}

/// Weather from the three counts.
///
/// Sunny when the forecast holds or grows. Below that, Stormy only when the
/// decay deficit exceeds `floor(current · tolerance_ratio)`; otherwise
/// Overcast.
pub fn weather_for(
    current_healthy: usize,
    velocity: usize,
    decay: usize,
    forecasted: usize,
    tolerance_ratio: f64,
) -> WeatherState {
    if forecasted >= current_healthy {
        return WeatherState::Sunny;
    }
    let deficit = decay.saturating_sub(velocity);
    let tolerance = (current_healthy as f64 * tolerance_ratio).floor() as usize;
    if deficit > tolerance {
        WeatherState::Stormy
    } else {
        WeatherState::Overcast
    }
}

/// Project from an already-classified population.
///
/// `contacts` and `snapshots` are parallel slices of equal length.
pub(crate) fn forecast_snapshots(
    contacts: &[Contact],
    snapshots: &[HealthSnapshot],
    horizon_days: i64,
    historical_velocity: usize,
    config: &EngineConfig,
) -> Result<ForecastResult> {
    debug_assert_eq!(contacts.len(), snapshots.len(), "parallel slices differ in length");
    if horizon_days <= 0 {
        return Err(EngineError::InvalidArgument(format!(
            "horizon_days must be positive, got {horizon_days}"
        )));
    }
    let horizon = horizon_days.min(u32::MAX as i64) as u32;

    let current_healthy_count = HealthTally::from_snapshots(snapshots).healthy();

    let mut at_risk: Vec<AtRiskContact> = contacts
        .iter()
        .zip(snapshots)
        .filter(|(_, s)| s.state.is_healthy())
        .map(|(c, s)| AtRiskContact {
            contact_id: s.contact_id.clone(),
            // Healthy implies days ≤ target, so this never underflows.
            days_until_decay: s.target_days - s.days_since_contact,
            importance_tier: c.importance_tier,
        })
        .filter(|r| r.days_until_decay <= horizon)
        .collect();

    at_risk.sort_by(|a, b| {
        a.days_until_decay
            .cmp(&b.days_until_decay)
            .then(b.importance_tier.cmp(&a.importance_tier))
            .then_with(|| a.contact_id.cmp(&b.contact_id))
    });

    let decay_count = at_risk.len();
    let forecasted_healthy_count = current_healthy_count
        .saturating_add(historical_velocity)
        .saturating_sub(decay_count);
    let weather_state = weather_for(
        current_healthy_count,
        historical_velocity,
        decay_count,
        forecasted_healthy_count,
        config.storm_tolerance_ratio,
    );

    Ok(ForecastResult {
        horizon_days: horizon,
        current_healthy_count,
        velocity_resonance: historical_velocity,
        decay_count,
        forecasted_healthy_count,
        at_risk_contacts: at_risk,
        weather_state,
    })
}

/// Classify `contacts` at `now` and project `horizon_days` ahead.
pub fn forecast_with(
    contacts: &[Contact],
    now: CivilDate,
    horizon_days: i64,
    historical_velocity: usize,
    config: &EngineConfig,
) -> Result<ForecastResult> {
    let snapshots = classify_all(contacts, now);
    forecast_snapshots(contacts, &snapshots, horizon_days, historical_velocity, config)
}

/// [`forecast_with`] using the default constants.
pub fn forecast(
    contacts: &[Contact],
    now: CivilDate,
    horizon_days: i64,
    historical_velocity: usize,
) -> Result<ForecastResult> {
    forecast_with(contacts, now, horizon_days, historical_velocity, &EngineConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> CivilDate {
        CivilDate::parse("2026-10-17").unwrap()
    }

    /// A contact with target 30 that decays in `days_until_decay` days.
    fn decaying(id: &str, days_until_decay: i64, tier: ImportanceTier) -> Contact {
        Contact::new(id, id)
            .with_target(30)
            .with_importance(tier)
            .with_last_interaction(now().add_days(-(30 - days_until_decay)))
    }

    #[test]
    fn test_at_risk_ordering_scenario() {
        let contacts = vec![
            decaying("first", 2, ImportanceTier::Low),
            decaying("second", 2, ImportanceTier::High),
            decaying("third", 10, ImportanceTier::Medium),
        ];
        let f = forecast(&contacts, now(), 5, 0).unwrap();
        let ids: Vec<&str> = f.at_risk_contacts.iter().map(|r| r.contact_id.as_str()).collect();
        assert_eq!(ids, vec!["second", "first"]);
        assert_eq!(f.decay_count, 2);
        assert_eq!(f.current_healthy_count, 3);
        assert!(f.at_risk_contacts.iter().all(|r| r.days_until_decay == 2));
    }

    #[test]
    fn test_id_breaks_remaining_ties() {
        let contacts = vec![
            decaying("b", 1, ImportanceTier::Medium),
            decaying("a", 1, ImportanceTier::Medium),
        ];
        let f = forecast(&contacts, now(), 3, 0).unwrap();
        assert_eq!(f.at_risk_contacts[0].contact_id, "a");
        assert_eq!(f.at_risk_contacts[1].contact_id, "b");
    }

    #[test]
    fn test_unhealthy_contacts_excluded() {
        let contacts = vec![
            Contact::new("never", "Never"),
            Contact::new("thirsty", "T")
                .with_target(30)
                .with_last_interaction(now().add_days(-31)),
            // exactly at target: Nourished, decays tomorrow
            Contact::new("edge", "E")
                .with_target(30)
                .with_last_interaction(now().add_days(-30)),
        ];
        let f = forecast(&contacts, now(), 7, 0).unwrap();
        assert_eq!(f.current_healthy_count, 1);
        assert_eq!(f.at_risk_contacts.len(), 1);
        assert_eq!(f.at_risk_contacts[0].contact_id, "edge");
        assert_eq!(f.at_risk_contacts[0].days_until_decay, 0);
    }

    #[test]
    fn test_horizon_must_be_positive() {
        for h in [0, -1] {
            assert!(matches!(
                forecast(&[], now(), h, 0),
                Err(EngineError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn test_stormy_scenario() {
        // current 40, velocity 3, decay 10 → 33, deficit 7 > floor(4.0)
        assert_eq!(weather_for(40, 3, 10, 33, 0.1), WeatherState::Stormy);
    }

    #[test]
    fn test_overcast_within_tolerance() {
        // current 40, velocity 3, decay 7 → 36, deficit 4 = floor(4.0)
        assert_eq!(weather_for(40, 3, 7, 36, 0.1), WeatherState::Overcast);
    }

    #[test]
    fn test_sunny_when_growth_covers_decay() {
        assert_eq!(weather_for(10, 5, 5, 10, 0.1), WeatherState::Sunny);
        assert_eq!(weather_for(10, 6, 2, 14, 0.1), WeatherState::Sunny);
        assert_eq!(weather_for(0, 0, 0, 0, 0.1), WeatherState::Sunny);
    }

    #[test]
    fn test_zero_tolerance_never_overcast() {
        assert_eq!(weather_for(40, 3, 4, 39, 0.0), WeatherState::Stormy);
    }

    #[test]
    fn test_counts_end_to_end() {
        let mut contacts: Vec<Contact> = (0..40)
            .map(|i| decaying(&format!("h{i:02}"), if i < 10 { 3 } else { 20 }, ImportanceTier::Medium))
            .collect();
        contacts.push(Contact::new("gone", "Gone"));

        let f = forecast(&contacts, now(), 7, 3).unwrap();
        assert_eq!(f.current_healthy_count, 40);
        assert_eq!(f.decay_count, 10);
        assert_eq!(f.velocity_resonance, 3);
        assert_eq!(f.forecasted_healthy_count, 33);
        assert_eq!(f.weather_state, WeatherState::Stormy);
    }

    #[test]
    fn test_forecast_never_negative() {
        let contacts = vec![decaying("a", 0, ImportanceTier::Low)];
        let f = forecast(&contacts, now(), 1, 0).unwrap();
        assert_eq!(f.forecasted_healthy_count, 0);
        assert!(f.decay_count <= f.current_healthy_count);
    }

    #[test]
    fn test_serializes_camel_case() {
        let f = forecast(&[], now(), 7, 2).unwrap();
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json["velocityResonance"], 2);
        assert_eq!(json["forecastedHealthyCount"], 2);
        assert_eq!(json["weatherState"], "sunny");
        assert!(json["atRiskContacts"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_huge_velocity_saturates() {
        let contacts = vec![
            decaying("a", 2, ImportanceTier::Low),
            decaying("b", 20, ImportanceTier::Low),
        ];
        let f = forecast(&contacts, now(), 7, usize::MAX).unwrap();
        assert_eq!(f.decay_count, 1);
        assert_eq!(f.forecasted_healthy_count, usize::MAX - 1);
        assert_eq!(f.weather_state, WeatherState::Sunny);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "parallel slices differ in length")]
    fn test_mismatched_slices_rejected() {
        let contacts = vec![decaying("a", 2, ImportanceTier::Low), decaying("b", 3, ImportanceTier::Low)];
        let snapshots = classify_all(&contacts[..1], now());
        let _ = forecast_snapshots(&contacts, &snapshots, 7, 0, &EngineConfig::default());
    }
}
