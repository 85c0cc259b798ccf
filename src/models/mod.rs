mod api;

pub use api::{AuditEventsResponse, HealthResponse, WhoAmIResponse};
