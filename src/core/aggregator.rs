use std::collections::HashMap;

use crate::models::{AnalysisResult, ExtractedBattles, RankedCounts};

/// Label counts that remember first-seen order
#[derive(Debug, Clone, Default)]
pub struct FrequencyMap {
    index: HashMap<String, usize>,
    entries: Vec<(String, u32)>,
}

impl FrequencyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence of `label`
    pub fn record(&mut self, label: &str) {
        match self.index.get(label) {
            Some(&slot) => self.entries[slot].1 += 1,
            None => {
                self.index.insert(label.to_string(), self.entries.len());
                self.entries.push((label.to_string(), 1));
            }
        }
    }

    pub fn count(&self, label: &str) -> u32 {
        self.index
            .get(label)
            .map(|&slot| self.entries[slot].1)
            .unwrap_or(0)
    }

    /// The `limit` highest counts, descending
    ///
    /// Equal counts keep first-seen order; entries past the cutoff are dropped
    /// even when tied with the last one kept.
    pub fn top(&self, limit: usize) -> RankedCounts {
        let mut ranked = self.entries.clone();
        // sort_by is stable
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(limit);
        RankedCounts(ranked)
    }
}

/// Running win/loss counters for one analysis run
#[derive(Debug, Clone, Default)]
pub struct OutcomeTally {
    pub wins: FrequencyMap,
    pub losses: FrequencyMap,
    matches: usize,
}

impl OutcomeTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the labels of one match
    pub fn accumulate(&mut self, battles: &ExtractedBattles) {
        for label in &battles.wins {
            self.wins.record(label);
        }
        for label in &battles.losses {
            self.losses.record(label);
        }
        self.matches += 1;
    }

    /// Number of matches accumulated so far
    pub fn matches(&self) -> usize {
        self.matches
    }

    pub fn finalize(&self, top_limit: usize) -> AnalysisResult {
        AnalysisResult {
            wins: self.wins.top(top_limit),
            losses: self.losses.top(top_limit),
        }
    }
}
