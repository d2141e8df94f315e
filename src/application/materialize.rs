//! Turns validated clusters into persisted opportunities.
//!
//! Customers and topics are aggregated from signal metadata, heuristic
//! mentions in content and LLM extractions. Extraction lookups are best
//! effort: a failing store is logged and treated as "no extra data".

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::entities::cluster::Cluster;
use crate::domain::entities::extraction::Extraction;
use crate::domain::entities::opportunity::Opportunity;
use crate::domain::entities::signal::Signal;
use crate::domain::error::DomainError;
use crate::domain::ports::extraction_store::ExtractionStore;
use crate::domain::ports::opportunity_repository::OpportunityRepository;
use crate::domain::values::text::{
    customers_match, extract_customer_mentions, meaningful_words, normalize_customer_name,
    truncate_chars,
};

pub const MAX_TITLE_CHARS: usize = 150;
const TITLE_CUSTOMERS: usize = 2;
const TITLE_TOPICS: usize = 2;
const TITLE_WORDS: usize = 3;

/// Generated text plus the aggregates it was built from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpportunityText {
    pub title: String,
    pub description: String,
    pub customers: Vec<String>,
    pub topics: Vec<String>,
}

/// Items ordered by frequency (desc), ties by first appearance.
struct Tally {
    items: Vec<(String, usize)>,
}

impl Tally {
    fn new() -> Self {
        Self { items: Vec::new() }
    }

    fn add_with<F: Fn(&str, &str) -> bool>(&mut self, value: &str, same: F) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        match self.items.iter_mut().find(|(v, _)| same(v, value)) {
            Some((_, count)) => *count += 1,
            None => self.items.push((value.to_string(), 1)),
        }
    }

    fn ranked(mut self) -> Vec<String> {
        // stable sort keeps first-seen order among equal counts
        self.items.sort_by(|a, b| b.1.cmp(&a.1));
        self.items.into_iter().map(|(v, _)| v).collect()
    }
}

/// Customer names across signals, best-supported first.
pub fn aggregate_customers(
    signals: &[Signal],
    extractions: &HashMap<String, Extraction>,
) -> Vec<String> {
    let mut tally = Tally::new();
    for s in signals {
        let from_content;
        let names: &[String] = if s.metadata.customers.is_empty() {
            from_content = extract_customer_mentions(&s.content);
            &from_content
        } else {
            &s.metadata.customers
        };
        for name in names {
            tally.add_with(name, customers_match);
        }
        if let Some(ex) = extractions.get(&s.id) {
            for name in &ex.customers {
                tally.add_with(name, customers_match);
            }
        }
    }
    tally.ranked()
}

/// Topics and themes across signals (case-insensitive), best-supported first.
pub fn aggregate_topics(
    signals: &[Signal],
    extractions: &HashMap<String, Extraction>,
) -> Vec<String> {
    let mut tally = Tally::new();
    let same = |a: &str, b: &str| a.eq_ignore_ascii_case(b);
    for s in signals {
        for label in s.metadata.labels() {
            tally.add_with(&label, same);
        }
        if let Some(ex) = extractions.get(&s.id) {
            for theme in &ex.themes {
                tally.add_with(theme, same);
            }
        }
    }
    tally.ranked()
}

/// Most frequent meaningful words, skipping ones already named by customers or topics.
fn top_words(
    signals: &[Signal],
    customers: &[String],
    topics: &[String],
    limit: usize,
) -> Vec<String> {
    let mut taken: Vec<String> = customers
        .iter()
        .chain(topics.iter())
        .flat_map(|c| {
            normalize_customer_name(c)
                .split_whitespace()
                .map(String::from)
                .collect::<Vec<_>>()
        })
        .collect();
    taken.sort();
    taken.dedup();

    let mut counts: HashMap<String, usize> = HashMap::new();
    for s in signals {
        for w in meaningful_words(&s.content) {
            *counts.entry(w).or_default() += 1;
        }
    }
    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .filter(|(w, _)| taken.binary_search(w).is_err())
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(limit).map(|(w, _)| w).collect()
}

fn count_by<F: Fn(&Signal) -> &str>(signals: &[Signal], key: F) -> String {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for s in signals {
        let k = key(s);
        match counts.iter_mut().find(|(v, _)| v == k) {
            Some((_, c)) => *c += 1,
            None => counts.push((k.to_string(), 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
        .iter()
        .map(|(k, c)| format!("{k} ({c})"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build title and description for a set of signals.
pub fn describe_signals(
    signals: &[Signal],
    extractions: &HashMap<String, Extraction>,
) -> OpportunityText {
    let customers = aggregate_customers(signals, extractions);
    let topics = aggregate_topics(signals, extractions);
    let words = top_words(signals, &customers, &topics, TITLE_WORDS);

    let mut parts: Vec<String> = Vec::new();
    if !customers.is_empty() {
        parts.push(customers.iter().take(TITLE_CUSTOMERS).cloned().collect::<Vec<_>>().join(", "));
    }
    if !topics.is_empty() {
        parts.push(topics.iter().take(TITLE_TOPICS).cloned().collect::<Vec<_>>().join(", "));
    }
    if !words.is_empty() {
        parts.push(words.join(" "));
    }
    let head = if parts.is_empty() {
        "Related feedback".to_string()
    } else {
        parts.join(" | ")
    };
    let title = truncate_chars(&format!("{head} ({} signals)", signals.len()), MAX_TITLE_CHARS);

    let mut lines = vec![format!("Cluster of {} related signals.", signals.len())];
    if !customers.is_empty() {
        lines.push(format!("Customers: {}", customers.join(", ")));
    }
    if !topics.is_empty() {
        lines.push(format!("Topics: {}", topics.join(", ")));
    }
    lines.push(format!("Sources: {}", count_by(signals, |s| s.source.as_str())));
    lines.push(format!("Signal types: {}", count_by(signals, |s| s.signal_type.as_str())));

    OpportunityText {
        title,
        description: lines.join("\n"),
        customers,
        topics,
    }
}

pub struct Materializer {
    opportunity_repo: Arc<dyn OpportunityRepository>,
    extraction_store: Arc<dyn ExtractionStore>,
}

impl Materializer {
    pub fn new(
        opportunity_repo: Arc<dyn OpportunityRepository>,
        extraction_store: Arc<dyn ExtractionStore>,
    ) -> Self {
        Self {
            opportunity_repo,
            extraction_store,
        }
    }

    /// Extractions for the given signals; empty on failure.
    pub async fn enrichment(&self, signals: &[Signal]) -> HashMap<String, Extraction> {
        let ids: Vec<String> = signals.iter().map(|s| s.id.clone()).collect();
        match self.extraction_store.for_signals(&ids).await {
            Ok(map) => map,
            Err(e) => {
                warn!(
                    error = %e,
                    signals = ids.len(),
                    "Extraction lookup failed; continuing without it"
                );
                HashMap::new()
            }
        }
    }

    pub async fn describe(&self, signals: &[Signal]) -> OpportunityText {
        let extractions = self.enrichment(signals).await;
        describe_signals(signals, &extractions)
    }

    /// Persist a cluster as a new opportunity with all its links, atomically.
    pub async fn materialize(&self, cluster: &Cluster) -> Result<Opportunity, DomainError> {
        if cluster.is_empty() {
            return Err(DomainError::InvalidInput("Cannot materialize an empty cluster".into()));
        }
        let text = self.describe(&cluster.signals).await;
        let opportunity = Opportunity::new(text.title, text.description);
        self.opportunity_repo
            .create_with_links(&opportunity, &cluster.ids())?;
        debug!(
            opportunity_id = %opportunity.id,
            signals = cluster.len(),
            "Opportunity created"
        );
        Ok(opportunity)
    }

    /// Recompute title and description from an opportunity's current signal set.
    pub async fn refresh(&self, opportunity_id: &str) -> Result<Opportunity, DomainError> {
        let signals = self.opportunity_repo.linked_signals(opportunity_id)?;
        let text = self.describe(&signals).await;
        self.opportunity_repo
            .update_text(opportunity_id, &text.title, &text.description)?;
        self.opportunity_repo
            .get(opportunity_id)?
            .ok_or_else(|| {
                DomainError::NotFound(format!("Opportunity not found: {opportunity_id}"))
            })
    }
}
