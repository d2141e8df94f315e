use super::{lock, SharedConnection};
use crate::domain::error::DomainError;
use crate::domain::ports::vector_store::VectorStore;
use rusqlite::{params, OptionalExtension};

pub struct SqliteVectorStore {
    conn: SharedConnection,
}

impl SqliteVectorStore {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn serialize_vector(v: &[f32]) -> Vec<u8> {
        v.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_vector(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }
}

impl VectorStore for SqliteVectorStore {
    fn store(&self, id: &str, vector: &[f32]) -> Result<(), DomainError> {
        let conn = lock(&self.conn)?;
        let blob = Self::serialize_vector(vector);
        conn.execute(
            "INSERT OR REPLACE INTO vectors (id, vector) VALUES (?1, ?2)",
            params![id, blob],
        )
        .map_err(|e| DomainError::Database(format!("Failed to store vector: {e}")))?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<Vec<f32>>, DomainError> {
        let conn = lock(&self.conn)?;
        let blob: Option<Vec<u8>> = conn
            .query_row("SELECT vector FROM vectors WHERE id = ?1", params![id], |r| r.get(0))
            .optional()?;
        Ok(blob.map(|b| Self::deserialize_vector(&b)))
    }

    fn get_stored_dimension(&self) -> Result<Option<usize>, DomainError> {
        let conn = lock(&self.conn)?;
        let bytes: Option<i64> = conn
            .query_row("SELECT length(vector) FROM vectors LIMIT 1", [], |r| r.get(0))
            .optional()?;
        Ok(bytes.map(|b| b as usize / 4))
    }
}
