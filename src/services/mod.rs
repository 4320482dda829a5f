// Services layer - business operations on top of the database interface

pub mod content_service;
pub mod counter_projection;
pub mod query_service;
pub mod relationship_store;
pub mod toggle_engine;

pub use content_service::{ContentService, WriteStatus};
pub use counter_projection::CounterProjection;
pub use query_service::{FollowCounts, QueryService};
pub use relationship_store::RelationshipStore;
pub use toggle_engine::{EngagementToggleEngine, ToggleOutcome};
