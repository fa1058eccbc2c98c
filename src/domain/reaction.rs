use serde::{Deserialize, Serialize};

/// Reaction counts for a post or comment, most popular first.
///
/// Entries never carry a zero count. Equal counts keep the order in which
/// their symbols were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionTally {
    entries: Vec<(String, u32)>,
}

impl ReactionTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `count` to `symbol`, registering it on first sight. Zero is ignored.
    pub fn add(&mut self, symbol: &str, count: u32) {
        if count == 0 {
            return;
        }
        match self.entries.iter_mut().find(|(s, _)| s == symbol) {
            Some((_, total)) => *total = total.saturating_add(count),
            None => self.entries.push((symbol.to_string(), count)),
        }
    }

    /// Sort descending by count. `sort_by` is stable, so ties stay in
    /// first-seen order.
    pub fn finish(mut self) -> Self {
        self.entries.sort_by(|a, b| b.1.cmp(&a.1));
        self
    }

    pub fn entries(&self) -> &[(String, u32)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, c)| u64::from(*c)).sum()
    }

    /// Summary line: `👍 3; 🔥 1`, or an empty string.
    pub fn summary(&self) -> String {
        self.entries
            .iter()
            .map(|(symbol, count)| format!("{} {}", symbol, count))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_summary() {
        assert_eq!(ReactionTally::new().finish().summary(), "");
    }

    #[test]
    fn test_zero_counts_dropped() {
        let mut tally = ReactionTally::new();
        tally.add("👍", 0);
        assert!(tally.finish().is_empty());
    }

    #[test]
    fn test_large_counts_saturate() {
        let mut tally = ReactionTally::new();
        tally.add("x", u32::MAX);
        tally.add("x", 1);
        assert_eq!(tally.entries(), &[("x".to_string(), u32::MAX)]);
    }

    #[test]
    fn test_summary_format() {
        let mut tally = ReactionTally::new();
        tally.add("🔥", 1);
        tally.add("👍", 3);
        assert_eq!(tally.finish().summary(), "👍 3; 🔥 1");
    }
}
