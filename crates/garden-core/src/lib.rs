//! Relationship health and garden layout engine.
//!
//! Classifies each contact's relationship health from elapsed time and a
//! target cadence, lays the population out on a deterministic phyllotactic
//! spiral, projects healthy-count decay over a horizon, and builds a short
//! triage queue with optimistic "water" and session-local "snooze".
//!
//! Zero I/O: pure functions over host-supplied contacts. The only effect is
//! the host's [`InteractionRecorder`], awaited by [`TriageSession::water`].

pub mod config;
pub mod constants;
pub mod contact;
pub mod engine;
pub mod error;
pub mod forecast;
pub mod health;
pub mod layout;
pub mod time;
pub mod triage;

pub use config::{EngineConfig, NodeSizes, ScoreWeights, SpiralConfig};
pub use constants::{DEFAULT_MAX_NODES, DEFAULT_QUEUE_SIZE, DEFAULT_TARGET_DAYS, GOLDEN_ANGLE, NEVER_CONTACTED_DAYS};
pub use contact::{Contact, ImportanceTier};
pub use engine::{CacheStats, GardenEngine, PopulationKey};
pub use error::{EngineError, Result, TriageError};
pub use forecast::{AtRiskContact, ForecastResult, WeatherState, forecast, forecast_with};
pub use health::{
    HealthSnapshot, HealthState, HealthTally, classify, classify_all, effective_target,
    population_score,
};
pub use layout::{LayoutMode, NodeSize, PositionedNode, layout, layout_with, rotation_for_id};
pub use time::CivilDate;
pub use triage::{
    CardStatus, InteractionRecorder, PendingWater, TriageCard, TriageSession, build_queue,
};
