use serde::ser::{Serialize, SerializeMap, Serializer};

/// Outcome of a single offense battle, as marked on the match page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleOutcome {
    Win,
    Loss,
}

/// Opponent labels pulled from one match page, split by outcome
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedBattles {
    pub wins: Vec<String>,
    pub losses: Vec<String>,
}

impl ExtractedBattles {
    pub fn is_empty(&self) -> bool {
        self.wins.is_empty() && self.losses.is_empty()
    }

    /// Append labels to the bucket for `outcome`
    pub fn push_all<I>(&mut self, outcome: BattleOutcome, labels: I)
    where
        I: IntoIterator<Item = String>,
    {
        match outcome {
            BattleOutcome::Win => self.wins.extend(labels),
            BattleOutcome::Loss => self.losses.extend(labels),
        }
    }
}

/// Label counts in rank order (highest count first)
///
/// Serializes as a JSON object whose keys keep this order, so clients can
/// render the ranking without re-sorting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankedCounts(pub Vec<(String, u32)>);

impl RankedCounts {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<u32> {
        self.0
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, count)| *count)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(label, _)| label.as_str())
    }
}

impl Serialize for RankedCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, count) in &self.0 {
            map.serialize_entry(label, count)?;
        }
        map.end()
    }
}

/// Final top-N counters for one analysis run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisResult {
    pub wins: RankedCounts,
    pub losses: RankedCounts,
}
