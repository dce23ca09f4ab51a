use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::db::card_repo::{self, CardRow};
use crate::db::Database;
use crate::error::ErrorKind;
use crate::model::{BusinessCard, JobStatus};

use super::{RecordError, RecordStore};

/// Record store on top of the SQLite `cards` table.
///
/// Every call runs on the blocking pool; the connection mutex serializes
/// them, which is also what makes `transition_status` atomic.
#[derive(Clone)]
pub struct SqliteRecordStore {
    db: Database,
}

impl SqliteRecordStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

fn format_ts(ts: &DateTime<Utc>) -> String {
    // Fixed width keeps lexical order equal to time order.
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_ts(id: &str, field: &str, value: &str) -> Result<DateTime<Utc>, RecordError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| RecordError::Corrupt {
            id: id.to_string(),
            reason: format!("bad {} '{}': {}", field, value, e),
        })
}

fn to_json<T: serde::Serialize>(id: &str, value: &T) -> Result<String, RecordError> {
    serde_json::to_string(value).map_err(|e| RecordError::Encode {
        id: id.to_string(),
        source: e,
    })
}

fn from_json<T: serde::de::DeserializeOwned>(
    id: &str,
    field: &str,
    value: &str,
) -> Result<T, RecordError> {
    serde_json::from_str(value).map_err(|e| RecordError::Corrupt {
        id: id.to_string(),
        reason: format!("bad {} JSON: {}", field, e),
    })
}

fn card_to_row(card: &BusinessCard) -> Result<CardRow, RecordError> {
    Ok(CardRow {
        id: card.id.clone(),
        status: card.status.as_str().to_string(),
        images: to_json(&card.id, &card.images)?,
        personal_data: to_json(&card.id, &card.personal_data)?,
        company_data: to_json(&card.id, &card.company_data)?,
        extracted_text: card.extracted_text.clone(),
        observation: card.observation.clone(),
        user: card.user.clone(),
        error: card.error.clone(),
        error_kind: card.error_kind.map(|k| k.as_str().to_string()),
        retry_count: card.retry_count,
        created_at: format_ts(&card.created_at),
        updated_at: format_ts(&Utc::now()),
        processed_at: card.processed_at.as_ref().map(format_ts),
        last_retry_at: card.last_retry_at.as_ref().map(format_ts),
    })
}

fn row_to_card(row: CardRow) -> Result<BusinessCard, RecordError> {
    let id = row.id;
    let status: JobStatus = row.status.parse().map_err(|e| RecordError::Corrupt {
        id: id.clone(),
        reason: format!("{}", e),
    })?;
    let error_kind = match row.error_kind.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(ErrorKind::parse(raw).ok_or_else(|| RecordError::Corrupt {
            id: id.clone(),
            reason: format!("unknown error kind '{}'", raw),
        })?),
    };

    Ok(BusinessCard {
        status,
        images: from_json(&id, "images", &row.images)?,
        personal_data: from_json(&id, "personal_data", &row.personal_data)?,
        company_data: from_json(&id, "company_data", &row.company_data)?,
        extracted_text: row.extracted_text,
        observation: row.observation,
        user: row.user,
        error: row.error,
        error_kind,
        retry_count: row.retry_count,
        created_at: parse_ts(&id, "created_at", &row.created_at)?,
        processed_at: row
            .processed_at
            .as_deref()
            .map(|v| parse_ts(&id, "processed_at", v))
            .transpose()?,
        last_retry_at: row
            .last_retry_at
            .as_deref()
            .map(|v| parse_ts(&id, "last_retry_at", v))
            .transpose()?,
        id,
    })
}

fn rows_to_cards(rows: Vec<CardRow>) -> Result<Vec<BusinessCard>, RecordError> {
    rows.into_iter().map(row_to_card).collect()
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn put(&self, card: &BusinessCard) -> Result<(), RecordError> {
        let row = card_to_row(card)?;
        self.db.run(move |db| Ok(card_repo::upsert(db, &row)?))
            .await
    }

    async fn get(&self, id: &str) -> Result<BusinessCard, RecordError> {
        let id = id.to_string();
        self.db.run(move |db| match card_repo::find_by_id(db, &id)? {
            Some(row) => row_to_card(row),
            None => Err(RecordError::NotFound(id)),
        })
        .await
    }

    async fn scan(&self) -> Result<Vec<BusinessCard>, RecordError> {
        self.db.run(|db| rows_to_cards(card_repo::list(db, None)?))
            .await
    }

    async fn scan_by_status(&self, status: JobStatus) -> Result<Vec<BusinessCard>, RecordError> {
        self.db.run(move |db| rows_to_cards(card_repo::list(db, Some(status.as_str()))?))
            .await
    }

    async fn transition_status(
        &self,
        id: &str,
        from: JobStatus,
        to: JobStatus,
    ) -> Result<bool, RecordError> {
        let id = id.to_string();
        let updated_at = format_ts(&Utc::now());
        let moved: bool = self
            .db
            .run(move |db| {
                Ok::<bool, RecordError>(card_repo::transition_status(
                    db,
                    &id,
                    from.as_str(),
                    to.as_str(),
                    &updated_at,
                )?)
            })
            .await?;
        log::debug!("Status transition {} -> {}: applied={}", from, to, moved);
        Ok(moved)
    }

    async fn set_observation(&self, id: &str, observation: &str) -> Result<(), RecordError> {
        let id = id.to_string();
        let observation = observation.to_string();
        let updated_at = format_ts(&Utc::now());
        self.db
            .run(move |db| {
                if card_repo::update_observation(db, &id, &observation, &updated_at)? {
                    Ok(())
                } else {
                    Err(RecordError::NotFound(id))
                }
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CompanyData, ImageRef, PersonalData};

    fn store() -> SqliteRecordStore {
        SqliteRecordStore::new(Database::open_in_memory().unwrap())
    }

    fn sample_card(id: &str) -> BusinessCard {
        let now = Utc::now();
        BusinessCard::new(
            id.to_string(),
            vec![
                ImageRef {
                    file_name: "front.jpg".to_string(),
                    content_type: "image/jpeg".to_string(),
                    size_bytes: 1024,
                    storage_key: format!("cards/{}/a.jpg", id),
                    uploaded_at: now,
                },
                ImageRef {
                    file_name: "back.png".to_string(),
                    content_type: "image/png".to_string(),
                    size_bytes: 2048,
                    storage_key: format!("cards/{}/b.png", id),
                    uploaded_at: now,
                },
            ],
            "booth 12".to_string(),
            "alice".to_string(),
            now,
        )
    }

    #[tokio::test]
    async fn test_put_and_get_preserves_record() {
        let store = store();
        let mut card = sample_card("c1");
        card.start_processing().unwrap();
        card.complete(
            PersonalData {
                full_name: "Ada Lovelace".to_string(),
                email: "ada@example.com".to_string(),
                ..Default::default()
            },
            CompanyData {
                name: "Analytical Engines".to_string(),
                ..Default::default()
            },
            "{\"personal_data\":{}}".to_string(),
            Utc::now(),
        )
        .unwrap();

        store.put(&card).await.unwrap();
        let loaded = store.get("c1").await.unwrap();
        assert_eq!(loaded, card);
    }

    #[tokio::test]
    async fn test_failed_record_keeps_error_kind() {
        let store = store();
        let mut card = sample_card("c2");
        card.start_processing().unwrap();
        card.fail(
            "model returned prose".to_string(),
            ErrorKind::ExtractionUnparseable,
            Utc::now(),
        )
        .unwrap();

        store.put(&card).await.unwrap();
        let loaded = store.get("c2").await.unwrap();
        assert_eq!(loaded.error_kind, Some(ErrorKind::ExtractionUnparseable));
        assert_eq!(loaded.retry_count, 1);
        assert_eq!(loaded.last_retry_at, card.last_retry_at);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = store();
        assert!(matches!(
            store.get("missing").await,
            Err(RecordError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_scan_and_scan_by_status() {
        let store = store();
        let mut failed = sample_card("f1");
        failed.start_processing().unwrap();
        failed
            .fail("x".to_string(), ErrorKind::ExtractionFailed, Utc::now())
            .unwrap();
        store.put(&failed).await.unwrap();
        store.put(&sample_card("p1")).await.unwrap();

        assert_eq!(store.scan().await.unwrap().len(), 2);
        let only_failed = store.scan_by_status(JobStatus::Failed).await.unwrap();
        assert_eq!(only_failed.len(), 1);
        assert_eq!(only_failed[0].id, "f1");
    }

    #[tokio::test]
    async fn test_transition_status_single_winner() {
        let store = store();
        let mut card = sample_card("t1");
        card.start_processing().unwrap();
        card.fail("x".to_string(), ErrorKind::ExtractionFailed, Utc::now())
            .unwrap();
        store.put(&card).await.unwrap();

        let (a, b) = tokio::join!(
            store.transition_status("t1", JobStatus::Failed, JobStatus::Retrying),
            store.transition_status("t1", JobStatus::Failed, JobStatus::Retrying),
        );
        assert!(a.unwrap() ^ b.unwrap());
        assert_eq!(store.get("t1").await.unwrap().status, JobStatus::Retrying);
    }

    #[tokio::test]
    async fn test_transition_status_reports_missing_and_mismatched() {
        let store = store();
        store.put(&sample_card("t2")).await.unwrap();

        assert!(!store
            .transition_status("t2", JobStatus::Failed, JobStatus::Retrying)
            .await
            .unwrap());
        assert!(!store
            .transition_status("ghost", JobStatus::Failed, JobStatus::Retrying)
            .await
            .unwrap());
        assert_eq!(store.get("t2").await.unwrap().status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn test_set_observation_touches_only_the_note() {
        let store = store();
        let mut card = sample_card("o1");
        card.start_processing().unwrap();
        card.fail("x".to_string(), ErrorKind::ExtractionFailed, Utc::now())
            .unwrap();
        store.put(&card).await.unwrap();

        store.set_observation("o1", "call back in May").await.unwrap();

        let loaded = store.get("o1").await.unwrap();
        assert_eq!(loaded.observation, "call back in May");
        assert_eq!(loaded.status, JobStatus::Failed);
        assert_eq!(loaded.retry_count, 1);
        assert_eq!(loaded.images, card.images);
        assert!(matches!(
            store.set_observation("ghost", "x").await,
            Err(RecordError::NotFound(id)) if id == "ghost"
        ));
    }

    #[tokio::test]
    async fn test_put_keeps_edited_observation() {
        let store = store();
        let mut card = sample_card("o2");
        store.put(&card).await.unwrap();
        store.set_observation("o2", "edited").await.unwrap();

        // A lifecycle write still carrying the submission note.
        card.start_processing().unwrap();
        store.put(&card).await.unwrap();

        let loaded = store.get("o2").await.unwrap();
        assert_eq!(loaded.status, JobStatus::Processing);
        assert_eq!(loaded.observation, "edited");
    }

    #[tokio::test]
    async fn test_corrupt_status_is_reported() {
        let store = store();
        store.put(&sample_card("bad")).await.unwrap();
        store
            .database()
            .with_conn(|conn| {
                conn.execute("UPDATE cards SET status = 'LOST' WHERE id = 'bad'", [])?;
                Ok(())
            })
            .unwrap();

        assert!(matches!(
            store.get("bad").await,
            Err(RecordError::Corrupt { .. })
        ));
    }
}
