//! Schema initialization for the SurrealDB user store

use crate::storage::errors::StorageError;
use surrealdb::{Connection, Surreal};

/// Define the `person` table and its edge fields.
///
/// Every statement is `IF NOT EXISTS`, so running this against an existing
/// database is a no-op.
pub async fn initialize_schema<C>(client: &Surreal<C>) -> Result<(), StorageError>
where
    C: Connection,
{
    let person_table_query = r#"
        DEFINE TABLE IF NOT EXISTS person SCHEMAFULL
        COMMENT "User records with mirrored relationship edges";

        DEFINE FIELD IF NOT EXISTS user_id ON person TYPE string READONLY;
        DEFINE FIELD IF NOT EXISTS display_name ON person TYPE option<string>;
        DEFINE FIELD IF NOT EXISTS avatar ON person TYPE option<string>;
        DEFINE FIELD IF NOT EXISTS friends ON person TYPE array<string> DEFAULT [];
        DEFINE FIELD IF NOT EXISTS pending ON person TYPE array<string> DEFAULT [];
        DEFINE FIELD IF NOT EXISTS requested ON person TYPE array<string> DEFAULT [];
        DEFINE FIELD IF NOT EXISTS created_at ON person TYPE datetime DEFAULT time::now();
        DEFINE FIELD IF NOT EXISTS updated_at ON person TYPE datetime DEFAULT time::now();

        DEFINE INDEX IF NOT EXISTS person_friends_idx ON person FIELDS friends;
        DEFINE INDEX IF NOT EXISTS person_requested_idx ON person FIELDS requested;
    "#;

    client
        .query(person_table_query)
        .await
        .map_err(|e| StorageError::Query(format!("Failed to define person table: {}", e)))?
        .check()
        .map_err(|e| StorageError::Query(format!("Failed to define person table: {}", e)))?;

    tracing::debug!("SurrealDB person schema initialised");
    Ok(())
}
