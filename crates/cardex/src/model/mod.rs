pub mod card;
pub mod status;

pub use card::{
    Address, BusinessCard, CompanyData, ImageRef, PersonalData, RawImage, SocialMedia, Submission,
};
pub use status::{InvalidTransition, JobStatus, UnknownStatus};
