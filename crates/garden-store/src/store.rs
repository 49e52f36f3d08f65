use std::collections::HashMap;
use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use garden_core::{CivilDate, Contact, ImportanceTier, InteractionRecorder, effective_target};

use crate::error::{Result, StoreError};
use crate::schema;

/// SQLite-backed contact book. Supplies the engine's inputs and records
/// the interactions that triage waters.
pub struct ContactStore {
    conn: Connection,
}

const CONTACT_COLUMNS: &str =
    "id, name, last_interaction, target_frequency_days, importance, photo_ref";

fn parse_day(s: &str) -> Result<CivilDate> {
    CivilDate::parse(s).map_err(|e| StoreError::InvalidData(e.to_string()))
}

type ContactRow = (String, String, Option<String>, Option<i64>, String, Option<String>);

fn read_contact_row(row: &Row<'_>) -> rusqlite::Result<ContactRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn contact_from_row(row: ContactRow) -> Result<Contact> {
    let (id, name, last, target, importance, photo_ref) = row;
    let last_interaction_date = last.as_deref().map(parse_day).transpose()?;
    Ok(Contact {
        id,
        name,
        last_interaction_date,
        target_frequency_days: target,
        importance_tier: ImportanceTier::from_str_lossy(&importance),
        photo_ref,
    })
}

impl ContactStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        tracing::info!("opened contact store at {}", path.display());
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // --- Metadata ---

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    // --- Contacts ---

    /// Insert or replace a contact. A known last interaction is also logged
    /// as an interaction so velocity estimates see it.
    pub fn add_contact(&self, contact: &Contact) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO contacts (id, name, last_interaction, target_frequency_days, importance, photo_ref)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                last_interaction = excluded.last_interaction,
                target_frequency_days = excluded.target_frequency_days,
                importance = excluded.importance,
                photo_ref = excluded.photo_ref",
            params![
                contact.id,
                contact.name,
                contact.last_interaction_date.map(|d| d.to_string()),
                contact.target_frequency_days,
                contact.importance_tier.as_str(),
                contact.photo_ref,
            ],
        )?;

        if let Some(day) = contact.last_interaction_date {
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM interactions WHERE contact_id = ?1 AND day = ?2)",
                params![contact.id, day.days_since_epoch()],
                |row| row.get(0),
            )?;
            if !exists {
                tx.execute(
                    "INSERT INTO interactions (id, contact_id, day) VALUES (?1, ?2, ?3)",
                    params![Uuid::new_v4().to_string(), contact.id, day.days_since_epoch()],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    pub fn get_contact(&self, id: &str) -> Result<Option<Contact>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1"),
                [id],
                read_contact_row,
            )
            .optional()?;
        row.map(contact_from_row).transpose()
    }

    /// All contacts, ordered by id.
    pub fn list_contacts(&self) -> Result<Vec<Contact>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {CONTACT_COLUMNS} FROM contacts ORDER BY id"))?;
        let rows: Vec<ContactRow> = stmt
            .query_map([], read_contact_row)?
            .collect::<std::result::Result<_, _>>()?;
        rows.into_iter().map(contact_from_row).collect()
    }

    pub fn remove_contact(&self, id: &str) -> Result<()> {
        let rows = self.conn.execute("DELETE FROM contacts WHERE id = ?1", [id])?;
        if rows == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    pub fn contact_count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM contacts", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    // --- Interactions ---

    /// Record an interaction on `today` and move the contact's last
    /// interaction to it, atomically.
    pub fn record_interaction_now(&self, contact_id: &str, today: CivilDate) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        let rows = tx.execute(
            "UPDATE contacts SET last_interaction = ?1 WHERE id = ?2",
            params![today.to_string(), contact_id],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound(contact_id.to_string()));
        }
        tx.execute(
            "INSERT INTO interactions (id, contact_id, day) VALUES (?1, ?2, ?3)",
            params![Uuid::new_v4().to_string(), contact_id, today.days_since_epoch()],
        )?;
        tx.commit()?;
        tracing::debug!("recorded interaction for {contact_id} on {today}");
        Ok(())
    }

    /// Interaction days for a contact, oldest first.
    pub fn interaction_days(&self, contact_id: &str) -> Result<Vec<CivilDate>> {
        let mut stmt = self
            .conn
            .prepare("SELECT day FROM interactions WHERE contact_id = ?1 ORDER BY day")?;
        let days = stmt
            .query_map([contact_id], |row| row.get::<_, i64>(0))?
            .map(|d| d.map(CivilDate::from_days))
            .collect::<std::result::Result<_, _>>()?;
        Ok(days)
    }

    /// Estimated number of contacts that became healthy through new or
    /// renewed contact during the trailing `horizon_days` window ending today.
    ///
    /// A contact counts once if, inside the window, it has either its first
    /// interaction ever or one that follows a gap longer than its effective
    /// target cadence.
    pub fn estimate_historical_velocity(&self, horizon_days: i64, today: CivilDate) -> Result<usize> {
        if horizon_days <= 0 {
            return Ok(0);
        }
        let window_start = today.add_days(-(horizon_days - 1)).days_since_epoch();
        let window_end = today.days_since_epoch();

        let mut targets_stmt = self
            .conn
            .prepare("SELECT id, target_frequency_days FROM contacts")?;
        let targets: HashMap<String, u32> = targets_stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<i64>>(1)?))
            })?
            .map(|r| r.map(|(id, t)| (id, effective_target(t))))
            .collect::<std::result::Result<_, _>>()?;

        // Only contacts touched inside the window can count.
        let mut stmt = self.conn.prepare(
            "SELECT contact_id, day FROM interactions
             WHERE contact_id IN (SELECT DISTINCT contact_id FROM interactions WHERE day BETWEEN ?1 AND ?2)
               AND day <= ?2
             ORDER BY contact_id, day",
        )?;
        let rows: Vec<(String, i64)> = stmt
            .query_map(params![window_start, window_end], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?
            .collect::<std::result::Result<_, _>>()?;

        let mut velocity = 0usize;
        let mut current: Option<&str> = None;
        let mut previous_day: Option<i64> = None;
        let mut counted = false;

        for (contact_id, day) in &rows {
            if current != Some(contact_id.as_str()) {
                current = Some(contact_id.as_str());
                previous_day = None;
                counted = false;
            }
            let target = targets.get(contact_id).copied().unwrap_or_else(|| effective_target(None));
            if !counted && *day >= window_start {
                let renewed = match previous_day {
                    None => true,
                    Some(prev) => day - prev > target as i64,
                };
                if renewed {
                    velocity += 1;
                    counted = true;
                }
            }
            previous_day = Some(*day);
        }

        tracing::debug!(
            "velocity over {horizon_days} days ending {today}: {velocity} new or renewed contacts"
        );
        Ok(velocity)
    }

    /// An [`InteractionRecorder`] that stamps interactions with `today`.
    pub fn recorder(&self, today: CivilDate) -> StoreRecorder<'_> {
        StoreRecorder { store: self, today }
    }
}

/// Fulfils the engine's "record interaction now" action against the store.
pub struct StoreRecorder<'a> {
    store: &'a ContactStore,
    today: CivilDate,
}

impl InteractionRecorder for StoreRecorder<'_> {
    type Error = StoreError;

    async fn record_interaction_now(&self, contact_id: &str) -> Result<()> {
        self.store.record_interaction_now(contact_id, self.today)
    }
}
