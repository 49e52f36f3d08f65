//! Triage queue: a short, session-scoped list of neglected contacts awaiting
//! "water" (record an interaction now) or "snooze" (skip for this session).
//!
//! Watering is optimistic. The card leaves the active queue and its snapshot
//! flips to Nourished before the host confirms; a host failure reverts both
//! the snapshot and the card's queue position.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use serde::Serialize;
use uuid::Uuid;

use crate::constants::DEFAULT_QUEUE_SIZE;
use crate::contact::{Contact, ImportanceTier};
use crate::error::TriageError;
use crate::health::{HealthSnapshot, HealthState, classify};
use crate::time::CivilDate;

/// Host action that persists "interacted with this contact now".
pub trait InteractionRecorder {
    type Error: fmt::Display;

    fn record_interaction_now(
        &self,
        contact_id: &str,
    ) -> impl Future<Output = Result<(), Self::Error>>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    Pending,
    /// Optimistically watered, awaiting the host's acknowledgement.
    Watering,
    Watered,
    Snoozed,
}

impl CardStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CardStatus::Pending => "pending",
            CardStatus::Watering => "watering",
            CardStatus::Watered => "watered",
            CardStatus::Snoozed => "snoozed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageCard {
    pub contact_id: String,
    pub name: String,
    pub importance_tier: ImportanceTier,
    pub snapshot: HealthSnapshot,
    pub status: CardStatus,
}

/// Proof of an in-flight optimistic water, consumed by [`TriageSession::settle`]
/// or [`TriageSession::cancel`]. If it is lost, [`TriageSession::cancel_water`]
/// still rolls the card back.
#[derive(Debug)]
#[must_use = "an optimistic water must be settled or cancelled"]
pub struct PendingWater {
    session_id: Uuid,
    contact_id: String,
}

impl PendingWater {
    pub fn contact_id(&self) -> &str {
        &self.contact_id
    }
}

/// Severity desc, then days since contact desc, then importance desc.
/// Contact id asc settles anything left so the queue is deterministic.
fn queue_order(a: &TriageCard, b: &TriageCard) -> Ordering {
    b.snapshot
        .state
        .cmp(&a.snapshot.state)
        .then(b.snapshot.days_since_contact.cmp(&a.snapshot.days_since_contact))
        .then(b.importance_tier.cmp(&a.importance_tier))
        .then_with(|| a.contact_id.cmp(&b.contact_id))
}

/// One triage session. Cards keep their original slot for the whole session,
/// so the active queue is simply the pending cards in slot order.
#[derive(Clone, Debug)]
pub struct TriageSession {
    id: Uuid,
    cards: Vec<TriageCard>,
    /// Pre-water snapshots of cards in Watering, keyed by contact id.
    in_flight: HashMap<String, HealthSnapshot>,
}

impl TriageSession {
    /// Build a fresh session from Thirsty and Fading contacts.
    pub fn build(contacts: &[Contact], now: CivilDate, max_size: usize) -> Self {
        let mut cards: Vec<TriageCard> = contacts
            .iter()
            .map(|c| (c, classify(c, now)))
            .filter(|(_, s)| matches!(s.state, HealthState::Thirsty | HealthState::Fading))
            .map(|(c, snapshot)| TriageCard {
                contact_id: c.id.clone(),
                name: c.name.clone(),
                importance_tier: c.importance_tier,
                snapshot,
                status: CardStatus::Pending,
            })
            .collect();
        cards.sort_by(queue_order);
        cards.truncate(max_size);

        Self {
            id: Uuid::new_v4(),
            cards,
            in_flight: HashMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Every card in the session, acted upon or not.
    pub fn cards(&self) -> &[TriageCard] {
        &self.cards
    }

    /// Pending cards in queue order.
    pub fn active(&self) -> impl Iterator<Item = &TriageCard> {
        self.cards.iter().filter(|c| c.status == CardStatus::Pending)
    }

    pub fn active_len(&self) -> usize {
        self.active().count()
    }

    /// Position of a pending card within the active queue.
    pub fn position(&self, contact_id: &str) -> Option<usize> {
        self.active().position(|c| c.contact_id == contact_id)
    }

    pub fn card(&self, contact_id: &str) -> Option<&TriageCard> {
        self.cards.iter().find(|c| c.contact_id == contact_id)
    }

    /// Current (possibly optimistic) health for a contact in this session.
    pub fn snapshot(&self, contact_id: &str) -> Option<&HealthSnapshot> {
        self.card(contact_id).map(|c| &c.snapshot)
    }

    pub fn is_complete(&self) -> bool {
        self.active().next().is_none()
    }

    fn pending_card_mut(&mut self, contact_id: &str) -> Result<&mut TriageCard, TriageError> {
        let card = self
            .cards
            .iter_mut()
            .find(|c| c.contact_id == contact_id)
            .ok_or_else(|| TriageError::NotFound(contact_id.to_string()))?;
        if card.status != CardStatus::Pending {
            return Err(TriageError::InvalidState {
                contact_id: contact_id.to_string(),
                status: card.status.as_str(),
            });
        }
        Ok(card)
    }

    fn watering_card_mut(&mut self, contact_id: &str) -> Result<&mut TriageCard, TriageError> {
        let card = self
            .cards
            .iter_mut()
            .find(|c| c.contact_id == contact_id)
            .ok_or_else(|| TriageError::NotFound(contact_id.to_string()))?;
        if card.status != CardStatus::Watering {
            return Err(TriageError::InvalidState {
                contact_id: contact_id.to_string(),
                status: card.status.as_str(),
            });
        }
        Ok(card)
    }

    /// Phase one of watering: apply the optimistic update.
    pub fn begin_water(&mut self, contact_id: &str) -> Result<PendingWater, TriageError> {
        let session_id = self.id;
        let card = self.pending_card_mut(contact_id)?;
        let previous = card.snapshot.clone();
        card.snapshot = previous.watered();
        card.status = CardStatus::Watering;
        self.in_flight.insert(contact_id.to_string(), previous);
        Ok(PendingWater {
            session_id,
            contact_id: contact_id.to_string(),
        })
    }

    /// Phase two of watering: commit on success, revert on failure.
    ///
    /// Returns the committed snapshot, or `HostFailure` after restoring the
    /// card to Pending with its prior snapshot and slot.
    pub fn settle<E: fmt::Display>(
        &mut self,
        pending: PendingWater,
        ack: Result<(), E>,
    ) -> Result<HealthSnapshot, TriageError> {
        if pending.session_id != self.id {
            return Err(TriageError::NotFound(pending.contact_id));
        }
        match ack {
            Ok(()) => {
                let card = self.watering_card_mut(&pending.contact_id)?;
                card.status = CardStatus::Watered;
                let committed = card.snapshot.clone();
                self.in_flight.remove(&pending.contact_id);
                Ok(committed)
            }
            Err(e) => {
                self.cancel_water(&pending.contact_id)?;
                Err(TriageError::HostFailure {
                    contact_id: pending.contact_id,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Abandon an unsettled water, restoring the card to Pending with its
    /// prior snapshot.
    pub fn cancel(&mut self, pending: PendingWater) -> Result<(), TriageError> {
        if pending.session_id != self.id {
            return Err(TriageError::NotFound(pending.contact_id));
        }
        self.cancel_water(&pending.contact_id)
    }

    /// Roll back an in-flight water by contact id. Fails with `InvalidState`
    /// unless the card is Watering.
    pub fn cancel_water(&mut self, contact_id: &str) -> Result<(), TriageError> {
        let previous = self.in_flight.remove(contact_id);
        let card = self.watering_card_mut(contact_id)?;
        if let Some(previous) = previous {
            card.snapshot = previous;
        }
        card.status = CardStatus::Pending;
        Ok(())
    }

    /// Optimistically water, ask the host to record it, then settle.
    ///
    /// Cancel-safe: dropping the future before the host answers puts the card
    /// back in the queue untouched.
    pub async fn water<R: InteractionRecorder>(
        &mut self,
        contact_id: &str,
        recorder: &R,
    ) -> Result<HealthSnapshot, TriageError> {
        let pending = self.begin_water(contact_id)?;
        let mut guard = RevertOnDrop {
            session: self,
            pending: Some(pending),
        };
        let ack = recorder.record_interaction_now(contact_id).await;
        match guard.pending.take() {
            Some(pending) => guard.session.settle(pending, ack),
            None => Err(TriageError::NotFound(contact_id.to_string())),
        }
    }

    /// Drop a card from this session only. Health data is untouched and
    /// nothing is persisted.
    pub fn snooze(&mut self, contact_id: &str) -> Result<(), TriageError> {
        let card = self.pending_card_mut(contact_id)?;
        card.status = CardStatus::Snoozed;
        Ok(())
    }
}

/// Holds an unsettled water for the duration of a host call.
struct RevertOnDrop<'a> {
    session: &'a mut TriageSession,
    pending: Option<PendingWater>,
}

impl Drop for RevertOnDrop<'_> {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            // Already settled or rolled back elsewhere: nothing to undo.
            let _ = self.session.cancel(pending);
        }
    }
}

/// Build a triage session; `max_size` defaults to 5.
pub fn build_queue(contacts: &[Contact], now: CivilDate, max_size: Option<usize>) -> TriageSession {
    TriageSession::build(contacts, now, max_size.unwrap_or(DEFAULT_QUEUE_SIZE))
}
