//! Builders for test images and extraction results.

#![allow(dead_code)]

use cardex::{CompanyData, Extraction, PersonalData, RawImage};

/// A small JPEG-typed image whose bytes identify it.
pub fn jpeg(name: &str) -> RawImage {
    RawImage::new(name, "image/jpeg", format!("jpeg:{}", name).into_bytes())
}

pub fn png(name: &str) -> RawImage {
    RawImage::new(name, "image/png", format!("png:{}", name).into_bytes())
}

/// Builder for `Extraction` values returned by scripted extractors.
pub struct ExtractionBuilder {
    personal: PersonalData,
    company: CompanyData,
    raw_text: String,
}

impl ExtractionBuilder {
    pub fn new() -> Self {
        Self {
            personal: PersonalData::default(),
            company: CompanyData::default(),
            raw_text: "{}".to_string(),
        }
    }

    pub fn full_name(mut self, name: &str) -> Self {
        self.personal.full_name = name.to_string();
        self
    }

    pub fn email(mut self, email: &str) -> Self {
        self.personal.email = email.to_string();
        self
    }

    pub fn job_title(mut self, title: &str) -> Self {
        self.personal.job_title = title.to_string();
        self
    }

    pub fn company(mut self, name: &str) -> Self {
        self.company.name = name.to_string();
        self
    }

    pub fn city(mut self, city: &str) -> Self {
        self.company.address.city = city.to_string();
        self
    }

    pub fn raw_text(mut self, text: &str) -> Self {
        self.raw_text = text.to_string();
        self
    }

    pub fn build(self) -> Extraction {
        Extraction {
            personal_data: self.personal,
            company_data: self.company,
            raw_text: self.raw_text,
        }
    }
}

impl Default for ExtractionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A complete personal and company extraction.
pub fn full_extraction() -> Extraction {
    ExtractionBuilder::new()
        .full_name("Ada Lovelace")
        .email("ada@analytical.example")
        .job_title("Chief Engineer")
        .company("Analytical Engines Ltd")
        .city("London")
        .raw_text(r#"{"personalData": {"fullName": "Ada Lovelace"}}"#)
        .build()
}
