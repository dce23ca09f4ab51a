//! Row-level access to the `cards` table.
//!
//! Nested data (images, personal/company data) is kept as JSON text; the
//! record store converts between these rows and `BusinessCard`.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw card row from the database.
#[derive(Debug, Clone, PartialEq)]
pub struct CardRow {
    pub id: String,
    pub status: String,
    pub images: String,
    pub personal_data: String,
    pub company_data: String,
    pub extracted_text: String,
    pub observation: String,
    pub user: String,
    pub error: String,
    pub error_kind: Option<String>,
    pub retry_count: u32,
    pub created_at: String,
    pub updated_at: String,
    pub processed_at: Option<String>,
    pub last_retry_at: Option<String>,
}

impl CardRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            status: row.get("status")?,
            images: row.get("images")?,
            personal_data: row.get("personal_data")?,
            company_data: row.get("company_data")?,
            extracted_text: row.get("extracted_text")?,
            observation: row.get("observation")?,
            user: row.get("user")?,
            error: row.get("error")?,
            error_kind: row.get("error_kind")?,
            retry_count: row.get("retry_count")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            processed_at: row.get("processed_at")?,
            last_retry_at: row.get("last_retry_at")?,
        })
    }
}

/// Inserts a card or overwrites an existing one.
///
/// `created_at` and `observation` are never changed once the row exists;
/// the observation only moves through [`update_observation`].
pub fn upsert(db: &Database, card: &CardRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO cards (id, status, images, personal_data, company_data,
             extracted_text, observation, user, error, error_kind, retry_count,
             created_at, updated_at, processed_at, last_retry_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
             ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                images = excluded.images,
                personal_data = excluded.personal_data,
                company_data = excluded.company_data,
                extracted_text = excluded.extracted_text,
                user = excluded.user,
                error = excluded.error,
                error_kind = excluded.error_kind,
                retry_count = excluded.retry_count,
                updated_at = excluded.updated_at,
                processed_at = excluded.processed_at,
                last_retry_at = excluded.last_retry_at",
            params![
                card.id,
                card.status,
                card.images,
                card.personal_data,
                card.company_data,
                card.extracted_text,
                card.observation,
                card.user,
                card.error,
                card.error_kind,
                card.retry_count,
                card.created_at,
                card.updated_at,
                card.processed_at,
                card.last_retry_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds a card by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<CardRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM cards WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], CardRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Lists cards, newest first, optionally restricted to one status.
pub fn list(db: &Database, status: Option<&str>) -> Result<Vec<CardRow>, DatabaseError> {
    db.with_conn(|conn| {
        let rows = match status {
            Some(status) => {
                let mut stmt = conn.prepare(
                    "SELECT * FROM cards WHERE status = ?1 ORDER BY created_at DESC, id",
                )?;
                let rows = stmt
                    .query_map(params![status], CardRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare("SELECT * FROM cards ORDER BY created_at DESC, id")?;
                let rows = stmt
                    .query_map([], CardRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(rows)
    })
}

/// Moves a card from `from` to `to` only if it is currently in `from`.
///
/// Returns `false` when the row is missing or holds another status. The
/// check and the write happen in a single statement.
pub fn transition_status(
    db: &Database,
    id: &str,
    from: &str,
    to: &str,
    updated_at: &str,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE cards SET status = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2",
            params![id, from, to, updated_at],
        )?;
        Ok(changed == 1)
    })
}

/// Sets the observation of one card. Returns `false` when the row is missing.
pub fn update_observation(
    db: &Database,
    id: &str,
    observation: &str,
    updated_at: &str,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE cards SET observation = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, observation, updated_at],
        )?;
        Ok(changed == 1)
    })
}
