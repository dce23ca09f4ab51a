//! Business card record and the structured data extracted from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

use super::status::{InvalidTransition, JobStatus};

/// Personal contact details printed on the card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalData {
    pub full_name: String,
    pub first_name: String,
    pub last_name: String,
    pub job_title: String,
    pub department: String,
    pub email: String,
    pub phone: String,
    pub mobile: String,
    pub linkedin: String,
    pub website: String,
}

impl PersonalData {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Postal address, both split into components and as printed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub full: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialMedia {
    pub linkedin: String,
    pub twitter: String,
    pub facebook: String,
    pub instagram: String,
}

/// Company details printed on the card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyData {
    pub name: String,
    pub industry: String,
    pub website: String,
    pub email: String,
    pub phone: String,
    pub address: Address,
    pub social_media: SocialMedia,
}

impl CompanyData {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Reference to an image persisted in the blob store.
///
/// The bytes themselves never live on the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub storage_key: String,
    pub uploaded_at: DateTime<Utc>,
}

/// An image held in memory for the duration of one processing pass.
#[derive(Clone, PartialEq, Eq)]
pub struct RawImage {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl RawImage {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }
}

impl std::fmt::Debug for RawImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawImage")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("data_len", &self.data.len())
            .finish()
    }
}

/// What a client hands in: the images plus optional free-text context.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub images: Vec<RawImage>,
    pub observation: String,
    pub user: String,
}

impl Submission {
    pub fn new(images: Vec<RawImage>) -> Self {
        Self {
            images,
            ..Default::default()
        }
    }

    pub fn with_observation(mut self, observation: impl Into<String>) -> Self {
        self.observation = observation.into();
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }
}

/// One submitted business card and its processing lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessCard {
    pub id: String,
    pub status: JobStatus,
    pub images: Vec<ImageRef>,
    #[serde(default)]
    pub personal_data: PersonalData,
    #[serde(default)]
    pub company_data: CompanyData,
    #[serde(default)]
    pub extracted_text: String,
    #[serde(default)]
    pub observation: String,
    #[serde(default)]
    pub user: String,
    /// Human-readable message of the last failure. Empty unless failed.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    /// Machine-readable tag of the last failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default)]
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_retry_at: Option<DateTime<Utc>>,
}

impl BusinessCard {
    /// Creates a `Pending` record for freshly uploaded images.
    pub fn new(
        id: String,
        images: Vec<ImageRef>,
        observation: String,
        user: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
            images,
            personal_data: PersonalData::default(),
            company_data: CompanyData::default(),
            extracted_text: String::new(),
            observation,
            user,
            error: String::new(),
            error_kind: None,
            retry_count: 0,
            created_at,
            processed_at: None,
            last_retry_at: None,
        }
    }

    /// True if the extraction produced anything at all.
    pub fn has_extracted_data(&self) -> bool {
        !self.personal_data.is_empty() || !self.company_data.is_empty()
    }

    pub fn start_processing(&mut self) -> Result<(), InvalidTransition> {
        self.status = self.status.transition(JobStatus::Processing)?;
        Ok(())
    }

    /// Claims a failed record for another attempt.
    pub fn begin_retry(&mut self, at: DateTime<Utc>) -> Result<(), InvalidTransition> {
        self.status = self.status.transition(JobStatus::Retrying)?;
        self.retry_count += 1;
        self.last_retry_at = Some(at);
        Ok(())
    }

    /// Stores a successful extraction and clears any earlier failure.
    pub fn complete(
        &mut self,
        personal_data: PersonalData,
        company_data: CompanyData,
        extracted_text: String,
        at: DateTime<Utc>,
    ) -> Result<(), InvalidTransition> {
        self.status = self.status.transition(JobStatus::Completed)?;
        self.personal_data = personal_data;
        self.company_data = company_data;
        self.extracted_text = extracted_text;
        self.processed_at = Some(at);
        self.error.clear();
        self.error_kind = None;
        Ok(())
    }

    /// Records a failed attempt.
    ///
    /// The first failure counts as attempt one. Retries already bumped the
    /// counter in [`BusinessCard::begin_retry`].
    pub fn fail(
        &mut self,
        message: String,
        kind: ErrorKind,
        at: DateTime<Utc>,
    ) -> Result<(), InvalidTransition> {
        let first_attempt = self.status == JobStatus::Processing;
        self.status = self.status.transition(JobStatus::Failed)?;
        self.error = message;
        self.error_kind = Some(kind);
        if first_attempt {
            self.retry_count = 1;
            self.last_retry_at = Some(at);
        }
        Ok(())
    }
}
