use std::sync::Arc;

use garden_core::{
    CivilDate, Contact, GardenEngine, ImportanceTier, LayoutMode, TriageError, TriageSession,
};
use garden_store::Garden;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use schemars::JsonSchema;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::DEFAULT_HORIZON_DAYS;

#[derive(Clone)]
pub struct GardenServer {
    state: Arc<Mutex<ServerState>>,
    tool_router: ToolRouter<Self>,
}

struct ServerState {
    garden: Garden,
    engine: GardenEngine,
    /// The one triage session for this process. `garden_triage` replaces it.
    session: Option<TriageSession>,
    /// Fixed evaluation date; `None` reads the clock per call.
    today: Option<CivilDate>,
}

impl ServerState {
    fn today(&self) -> CivilDate {
        self.today.unwrap_or_else(CivilDate::today)
    }

    fn contacts(&self) -> Result<Vec<Contact>, McpError> {
        self.garden
            .store()
            .list_contacts()
            .map_err(|e| McpError::internal_error(e.to_string(), None))
    }
}

impl GardenServer {
    pub fn new(garden: Garden, today: Option<CivilDate>) -> std::result::Result<Self, String> {
        let engine = GardenEngine::new(garden.config().clone())
            .map_err(|e| format!("failed to build engine: {e}"))?;
        Ok(Self {
            state: Arc::new(Mutex::new(ServerState {
                garden,
                engine,
                session: None,
                today,
            })),
            tool_router: Self::tool_router(),
        })
    }

    fn session_json(session: &TriageSession) -> serde_json::Value {
        let queue: Vec<_> = session.active().collect();
        serde_json::json!({
            "sessionId": session.id().to_string(),
            "queue": queue,
            "complete": session.is_complete(),
        })
    }
}

fn triage_error(e: TriageError) -> McpError {
    match e {
        TriageError::HostFailure { .. } => McpError::internal_error(e.to_string(), None),
        other => McpError::invalid_params(other.to_string(), None),
    }
}

fn json_result(value: &serde_json::Value) -> CallToolResult {
    CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(value).unwrap_or_default(),
    )])
}

// --- Tool parameter types ---

#[derive(Debug, Deserialize, JsonSchema)]
struct AddRequest {
    /// Stable contact id
    id: String,
    /// Display name
    name: String,
    /// Date of the last interaction, YYYY-MM-DD. Omit if never contacted.
    last_interaction_date: Option<String>,
    /// Desired days between interactions. Defaults to 30 when missing or not positive.
    target_frequency_days: Option<i64>,
    /// "high", "medium" (default) or "low"
    importance_tier: Option<String>,
    /// Opaque photo reference for the UI
    photo_ref: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct LayoutRequest {
    /// "frequency" (default: most recently contacted at the center) or
    /// "tier" (high importance at the center)
    mode: Option<String>,
    /// Maximum nodes to place (default 300)
    max_nodes: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ForecastRequest {
    /// Days to look ahead (default 30, must be positive)
    horizon_days: Option<i64>,
    /// Expected new or renewed healthy relationships over the horizon.
    /// Estimated from interaction history when omitted.
    velocity: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct TriageRequest {
    /// Maximum cards in the queue (default 5)
    max_size: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct CardRequest {
    /// Contact id of a card in the current triage session
    contact_id: String,
}

#[tool_router]
impl GardenServer {
    #[tool(
        description = "List every contact with its current health (blooming, nourished, thirsty, fading), days since contact and target cadence, plus per-state counts and the overall garden score (0-100, null for an empty garden)."
    )]
    async fn garden_list(&self) -> Result<CallToolResult, McpError> {
        let mut state = self.state.lock().await;
        let today = state.today();
        let contacts = state.contacts()?;

        let entries: Vec<serde_json::Value> = contacts
            .iter()
            .map(|c| {
                serde_json::json!({
                    "contact": c,
                    "health": state.engine.classify(c, today),
                })
            })
            .collect();
        let tally = state.engine.tally(&contacts, today);
        let score = state.engine.score(&contacts, today);

        Ok(json_result(&serde_json::json!({
            "today": today,
            "contacts": entries,
            "tally": tally,
            "healthy": tally.healthy(),
            "score": score,
        })))
    }

    #[tool(
        description = "Add a contact, or update it if the id already exists. Returns the contact's health as of today."
    )]
    async fn garden_add(
        &self,
        Parameters(req): Parameters<AddRequest>,
    ) -> Result<CallToolResult, McpError> {
        let state = self.state.lock().await;
        let today = state.today();

        let mut contact = Contact::new(&req.id, &req.name);
        if let Some(date) = req.last_interaction_date.as_deref() {
            let date = CivilDate::parse(date)
                .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
            contact = contact.with_last_interaction(date);
        }
        contact.target_frequency_days = req.target_frequency_days;
        if let Some(tier) = req.importance_tier.as_deref() {
            contact = contact.with_importance(ImportanceTier::from_str_lossy(tier));
        }
        contact.photo_ref = req.photo_ref;

        state
            .garden
            .store()
            .add_contact(&contact)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;

        Ok(json_result(&serde_json::json!({
            "added": contact.id,
            "health": state.engine.classify(&contact, today),
        })))
    }

    #[tool(
        description = "Lay the garden out on a phyllotactic spiral. Returns one node per contact with x/y offsets from the center, node size, health color and a small per-contact rotation. Identical input always yields identical positions."
    )]
    async fn garden_layout(
        &self,
        Parameters(req): Parameters<LayoutRequest>,
    ) -> Result<CallToolResult, McpError> {
        let mut state = self.state.lock().await;
        let today = state.today();
        let mode = match req.mode.as_deref() {
            Some(m) => m
                .parse::<LayoutMode>()
                .map_err(|e| McpError::invalid_params(e.to_string(), None))?,
            None => LayoutMode::default(),
        };
        let contacts = state.contacts()?;
        let nodes = state.engine.layout(&contacts, today, mode, req.max_nodes);

        Ok(json_result(&serde_json::json!({
            "mode": mode,
            "count": nodes.len(),
            "nodes": nodes,
        })))
    }

    #[tool(
        description = "Forecast how many relationships stay healthy over the next horizon_days. Returns decay and growth counts, the contacts at risk of slipping soonest, and a weather summary (sunny, overcast, stormy)."
    )]
    async fn garden_forecast(
        &self,
        Parameters(req): Parameters<ForecastRequest>,
    ) -> Result<CallToolResult, McpError> {
        let mut state = self.state.lock().await;
        let today = state.today();
        let horizon = req.horizon_days.unwrap_or(DEFAULT_HORIZON_DAYS);
        let velocity = match req.velocity {
            Some(v) => v,
            None => state
                .garden
                .store()
                .estimate_historical_velocity(horizon, today)
                .map_err(|e| McpError::internal_error(e.to_string(), None))?,
        };
        let contacts = state.contacts()?;
        let result = state
            .engine
            .forecast(&contacts, today, horizon, velocity)
            .map_err(|e| McpError::invalid_params(e.to_string(), None))?;

        Ok(json_result(&serde_json::json!(result)))
    }

    #[tool(
        description = "Start a new triage session: the most neglected (thirsty or fading) contacts, worst first. Replaces any previous session. Act on the cards with garden_water or garden_snooze."
    )]
    async fn garden_triage(
        &self,
        Parameters(req): Parameters<TriageRequest>,
    ) -> Result<CallToolResult, McpError> {
        let mut state = self.state.lock().await;
        let today = state.today();
        let contacts = state.contacts()?;
        let session = state.engine.build_queue(&contacts, today, req.max_size);
        tracing::debug!(
            "triage session {} started with {} cards",
            session.id(),
            session.active_len()
        );
        let result = Self::session_json(&session);
        state.session = Some(session);

        Ok(json_result(&result))
    }

    #[tool(
        description = "Water a card in the current triage session: records an interaction with the contact today. The card leaves the queue immediately; if recording fails it is restored to its original place and an error is returned."
    )]
    async fn garden_water(
        &self,
        Parameters(req): Parameters<CardRequest>,
    ) -> Result<CallToolResult, McpError> {
        let mut state = self.state.lock().await;
        let today = state.today();
        let ServerState {
            garden, session, ..
        } = &mut *state;
        let session = session.as_mut().ok_or_else(|| {
            McpError::invalid_params("no triage session; call garden_triage first", None)
        })?;

        let pending = session.begin_water(&req.contact_id).map_err(triage_error)?;
        let ack = garden.store().record_interaction_now(&req.contact_id, today);
        if let Err(e) = &ack {
            tracing::warn!("reverting water for {}: {e}", req.contact_id);
        }
        let snapshot = session.settle(pending, ack).map_err(triage_error)?;
        tracing::debug!("session {} watered {}", session.id(), req.contact_id);

        Ok(json_result(&serde_json::json!({
            "watered": req.contact_id,
            "health": snapshot,
            "session": Self::session_json(session),
        })))
    }

    #[tool(
        description = "Snooze a card in the current triage session. Skips the contact for this session only; nothing is recorded."
    )]
    async fn garden_snooze(
        &self,
        Parameters(req): Parameters<CardRequest>,
    ) -> Result<CallToolResult, McpError> {
        let mut state = self.state.lock().await;
        let session = state.session.as_mut().ok_or_else(|| {
            McpError::invalid_params("no triage session; call garden_triage first", None)
        })?;
        session.snooze(&req.contact_id).map_err(triage_error)?;

        Ok(json_result(&serde_json::json!({
            "snoozed": req.contact_id,
            "session": Self::session_json(session),
        })))
    }
}

#[tool_handler]
impl ServerHandler for GardenServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Relationship garden: tracks how recently the user has been in touch with each contact \
                 relative to how often they want to be.\n\n\
                 - garden_list shows every contact's health and the overall garden score.\n\
                 - garden_layout returns spiral positions for drawing the garden.\n\
                 - garden_forecast projects how many relationships stay healthy over a horizon.\n\
                 - garden_triage starts a short queue of neglected contacts. Work through it with \
                   garden_water (the user reached out today) or garden_snooze (skip for now).\n\n\
                 Health is derived on every call from dates; nothing is cached between sessions \
                 except the contacts and their interaction history."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
