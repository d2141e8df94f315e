pub mod embedding_port;
pub mod extraction_store;
pub mod opportunity_repository;
pub mod progress;
pub mod signal_repository;
pub mod trend_service;
pub mod vector_store;
