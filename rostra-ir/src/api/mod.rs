//! HTTP API handlers

pub mod batches;
pub mod categories;
pub mod health;
pub mod identity;
pub mod observations;
pub mod reviews;
pub mod sse;

pub use batches::batch_routes;
pub use categories::category_routes;
pub use health::health_routes;
pub use identity::OperatorIdentity;
pub use observations::observation_routes;
pub use reviews::review_routes;
pub use sse::event_stream;
