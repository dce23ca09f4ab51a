use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::model::{BusinessCard, JobStatus};

use super::{RecordError, RecordStore};

/// Record store kept in process memory.
#[derive(Default)]
pub struct MemoryRecordStore {
    cards: RwLock<HashMap<String, BusinessCard>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cards.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> RecordError {
    RecordError::Unavailable("record store lock poisoned".to_string())
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn put(&self, card: &BusinessCard) -> Result<(), RecordError> {
        let mut cards = self.cards.write().map_err(|_| poisoned())?;
        let mut stored = card.clone();
        if let Some(existing) = cards.get(&card.id) {
            stored.observation = existing.observation.clone();
        }
        cards.insert(card.id.clone(), stored);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<BusinessCard, RecordError> {
        let cards = self.cards.read().map_err(|_| poisoned())?;
        cards
            .get(id)
            .cloned()
            .ok_or_else(|| RecordError::NotFound(id.to_string()))
    }

    async fn scan(&self) -> Result<Vec<BusinessCard>, RecordError> {
        let cards = self.cards.read().map_err(|_| poisoned())?;
        Ok(cards.values().cloned().collect())
    }

    async fn scan_by_status(&self, status: JobStatus) -> Result<Vec<BusinessCard>, RecordError> {
        let cards = self.cards.read().map_err(|_| poisoned())?;
        Ok(cards
            .values()
            .filter(|c| c.status == status)
            .cloned()
            .collect())
    }

    async fn transition_status(
        &self,
        id: &str,
        from: JobStatus,
        to: JobStatus,
    ) -> Result<bool, RecordError> {
        let mut cards = self.cards.write().map_err(|_| poisoned())?;
        match cards.get_mut(id) {
            Some(card) if card.status == from => {
                card.status = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_observation(&self, id: &str, observation: &str) -> Result<(), RecordError> {
        let mut cards = self.cards.write().map_err(|_| poisoned())?;
        let card = cards
            .get_mut(id)
            .ok_or_else(|| RecordError::NotFound(id.to_string()))?;
        card.observation = observation.to_string();
        Ok(())
    }
}
