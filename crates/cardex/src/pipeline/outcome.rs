use crate::error::CardError;
use crate::model::BusinessCard;

/// Result of one processing attempt that reached its final write.
///
/// An extraction failure is not an error of the call: the card was stored as
/// `Failed` and the cause travels alongside it in `failure`.
#[derive(Debug)]
pub struct Outcome {
    pub card: BusinessCard,
    pub failure: Option<CardError>,
}

impl Outcome {
    pub fn completed(card: BusinessCard) -> Self {
        Self {
            card,
            failure: None,
        }
    }

    pub fn failed(card: BusinessCard, failure: CardError) -> Self {
        Self {
            card,
            failure: Some(failure),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}
