use crate::domain::entities::signal::Signal;
use std::collections::HashSet;

/// Ephemeral grouping of signals built during one detection run.
///
/// The first member is the seed. Membership is seed-anchored: every other
/// member was found related to the seed, not necessarily to each other.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cluster {
    pub signals: Vec<Signal>,
}

impl Cluster {
    pub fn from_seed(seed: Signal) -> Self {
        Self { signals: vec![seed] }
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.signals.iter().map(|s| s.id.clone()).collect()
    }

    pub fn id_set(&self) -> HashSet<&str> {
        self.signals.iter().map(|s| s.id.as_str()).collect()
    }

    /// Append members of `other` not already present.
    pub fn absorb(&mut self, other: Cluster) {
        let mut seen: HashSet<String> = self.signals.iter().map(|s| s.id.clone()).collect();
        for s in other.signals {
            if seen.insert(s.id.clone()) {
                self.signals.push(s);
            }
        }
    }

    /// Mean of each member's quality (default applied when missing).
    pub fn average_quality(&self) -> f64 {
        if self.signals.is_empty() {
            return 0.0;
        }
        self.signals.iter().map(|s| s.metadata.quality()).sum::<f64>() / self.signals.len() as f64
    }
}
