//! API recommendation: catalog, selection, payload synthesis and rendering

pub mod catalog;
pub mod engine;
pub mod render;
pub mod schema;

pub use catalog::{ApiCatalogEntry, ApiField, Catalog};
pub use engine::{PayloadFormat, Recommendation, RecommendationEngine};
pub use render::{compose_conversation_aware_request, format_recommendation, RECOMMENDATION_HEADER};
