// Schema-store implementation backing the migration engine.

mod sqlite_schema_store;

pub use sqlite_schema_store::SqliteSchemaStore;
