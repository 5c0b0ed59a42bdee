// Extraction Cell - turns free-text intake notes into fixed-shape JSON records
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{
    Allergy,
    ContactInfo,
    DemographicInfo,
    ExtractionSchema,
    Illness,
    MedicalHistory,
    Medication,
    PersonName,
    PersonalInfo,
    PostalAddress,
    Schema,
    Specifications,
    Surgery,
};

pub use router::extraction_routes;

pub use services::{
    extractor::{ExtractionError, ExtractionService, NO_ANSWER_REPLY},
    normalizer::normalize_reply,
    sanitizer::{conform, sanitize, sanitize_into},
};
