// Core types and primitives

pub mod models;
pub mod relationship;
pub mod strong_types;

pub use models::{
    AccountType, Location, MaritalStatus, Message, MessageFilter, NewMessage, NewTuit, NewUser,
    StatsUpdate, Tuit, TuitStats, TuitUpdate, User, UserUpdate,
};
pub use relationship::{Follow, Relationship, RelationshipKind, RelationshipScope};
pub use strong_types::{current_time_millis, millis_to_datetime, EntityId};
