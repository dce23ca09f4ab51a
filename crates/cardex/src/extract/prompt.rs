/// Instruction sent ahead of the card images.
///
/// The JSON skeleton mirrors `PersonalData` and `CompanyData` field for field;
/// keep them in sync.
pub const EXTRACTION_PROMPT: &str = r#"Read the attached business card image(s) and transcribe the contact details into JSON.

Respond with exactly one JSON object of this shape:

{
  "personal_data": {
    "full_name": "",
    "first_name": "",
    "last_name": "",
    "job_title": "",
    "department": "",
    "email": "",
    "phone": "",
    "mobile": "",
    "linkedin": "",
    "website": ""
  },
  "company_data": {
    "name": "",
    "industry": "",
    "website": "",
    "email": "",
    "phone": "",
    "address": {
      "street": "",
      "city": "",
      "state": "",
      "postal_code": "",
      "country": "",
      "full": ""
    },
    "social_media": {
      "linkedin": "",
      "twitter": "",
      "facebook": "",
      "instagram": ""
    }
  }
}

Guidelines:
- Copy text exactly as printed.
- When there are two images (front and back), merge what they show into one object.
- Use "" for anything the card does not show. Never invent values.
- Put a landline in "phone" and a cell number in "mobile" when the card distinguishes them.
- Give websites as full URLs when the card prints one.
- Social media entries may be handles or full URLs.
- Fill both the address components and "full" with the address as printed.
- Output the JSON object only: no markdown, no commentary.
"#;
