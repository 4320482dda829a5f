// Core infrastructure modules
pub mod database;        // Database interface and PostgreSQL implementation
pub mod id_generator;    // ID generation system
pub mod sqlite_database; // SQLite implementation
pub mod viewer;          // Viewer context

pub use database::{
    initialize_database, DatabaseInterface, DatabaseTransaction, PostgresDatabase, TuitFilter,
};
pub use id_generator::IdGenerator;
pub use sqlite_database::SqliteDatabase;
pub use viewer::{viewer_context_middleware, HasSessionConfig, UserRef, Viewer, ViewerContext};
