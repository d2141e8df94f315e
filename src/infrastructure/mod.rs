pub mod embeddings;
pub mod progress;
pub mod sqlite;
