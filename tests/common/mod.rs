//! Shared test helpers.
#![allow(dead_code)]

use feedbackmap::application::add_signal::NewSignal;
use feedbackmap::config::EngineConfig;
use feedbackmap::domain::error::DomainError;
use feedbackmap::domain::ports::embedding_port::EmbeddingProvider;
use feedbackmap::domain::ports::progress::{NoProgress, ProgressEvent, ProgressObserver};
use feedbackmap::infrastructure::embeddings::noop::NoopProvider;
use feedbackmap::FeedbackMap;
use std::sync::{Arc, Mutex};

pub fn setup() -> FeedbackMap {
    setup_with(EngineConfig::default())
}

pub fn setup_with(config: EngineConfig) -> FeedbackMap {
    FeedbackMap::with_components(
        ":memory:",
        Arc::new(NoopProvider),
        None,
        Arc::new(NoProgress),
        config,
    )
    .unwrap()
}

/// Database at `path` with the keyword embedder wired in.
pub fn open_with_embedder(path: &str, config: EngineConfig) -> FeedbackMap {
    FeedbackMap::with_components(
        path,
        Arc::new(KeywordEmbedder),
        None,
        Arc::new(NoProgress),
        config,
    )
    .unwrap()
}

pub fn signal(source: &str, content: &str) -> NewSignal {
    NewSignal {
        source: source.to_string(),
        signal_type: "message".to_string(),
        content: content.to_string(),
        metadata: None,
        created_at: None,
    }
}

pub fn signal_with(source: &str, content: &str, metadata: serde_json::Value) -> NewSignal {
    NewSignal {
        metadata: Some(metadata),
        ..signal(source, content)
    }
}

/// Two-dimensional vectors: one axis per keyword.
pub struct KeywordEmbedder;

#[async_trait::async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError> {
        Ok(texts
            .iter()
            .map(|t| {
                if t.to_lowercase().contains("dashboard") {
                    vec![1.0, 0.0]
                } else {
                    vec![0.0, 1.0]
                }
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        2
    }
}

/// Keeps every event for inspection.
#[derive(Default)]
pub struct RecordingProgress {
    pub events: Mutex<Vec<ProgressEvent>>,
}

impl ProgressObserver for RecordingProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
