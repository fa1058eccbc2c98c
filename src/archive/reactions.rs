use crate::api::RawReaction;
use crate::domain::ReactionTally;

/// Turns raw reaction entries into a [`ReactionTally`].
#[derive(Debug, Clone)]
pub struct ReactionAggregator {
    custom_symbol: String,
}

impl Default for ReactionAggregator {
    fn default() -> Self {
        Self::new("(CustomEmoji)")
    }
}

impl ReactionAggregator {
    /// `custom_symbol` stands in for reactions that carry no emoticon glyph.
    pub fn new(custom_symbol: &str) -> Self {
        Self {
            custom_symbol: custom_symbol.to_string(),
        }
    }

    pub fn aggregate(&self, source: Option<&[RawReaction]>) -> ReactionTally {
        let mut tally = ReactionTally::new();
        for reaction in source.unwrap_or_default() {
            let symbol = reaction
                .emoticon
                .as_deref()
                .unwrap_or(&self.custom_symbol);
            tally.add(symbol, reaction.count);
        }
        tally.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reaction(emoticon: Option<&str>, count: u32) -> RawReaction {
        RawReaction {
            emoticon: emoticon.map(String::from),
            count,
        }
    }

    #[test]
    fn test_absent_reactions_yield_empty_tally() {
        let tally = ReactionAggregator::default().aggregate(None);
        assert!(tally.is_empty());
        assert_eq!(tally.summary(), "");
    }

    #[test]
    fn test_sorted_descending() {
        let raw = vec![
            reaction(Some("🔥"), 1),
            reaction(Some("👍"), 5),
            reaction(Some("❤"), 3),
        ];
        let tally = ReactionAggregator::default().aggregate(Some(&raw));
        let counts: Vec<u32> = tally.entries().iter().map(|(_, c)| *c).collect();
        assert_eq!(counts, vec![5, 3, 1]);
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let raw = vec![
            reaction(Some("🎉"), 2),
            reaction(Some("👀"), 7),
            reaction(Some("🔥"), 2),
            reaction(Some("👍"), 2),
        ];
        let tally = ReactionAggregator::default().aggregate(Some(&raw));
        assert_eq!(tally.summary(), "👀 7; 🎉 2; 🔥 2; 👍 2");
    }

    #[test]
    fn test_custom_reactions_grouped_under_placeholder() {
        let raw = vec![
            reaction(None, 2),
            reaction(Some("👍"), 1),
            reaction(None, 4),
        ];
        let tally = ReactionAggregator::new("(CustomEmoji)").aggregate(Some(&raw));
        assert_eq!(tally.summary(), "(CustomEmoji) 6; 👍 1");
    }

    #[test]
    fn test_total_preserved_and_no_zero_entries() {
        let raw = vec![
            reaction(Some("👍"), 3),
            reaction(Some("👎"), 0),
            reaction(Some("👍"), 2),
            reaction(None, 1),
        ];
        let input_total: u64 = raw.iter().map(|r| u64::from(r.count)).sum();
        let tally = ReactionAggregator::default().aggregate(Some(&raw));

        assert_eq!(tally.total(), input_total);
        assert!(tally.entries().iter().all(|(_, c)| *c > 0));
        assert_eq!(tally.summary(), "👍 5; (CustomEmoji) 1");
    }
}
