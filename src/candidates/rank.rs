use crate::model::DigitCandidate;

/// Hard upper bound on `RankedResult::alternates`.
pub const MAX_ALTERNATES: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct RankingOptions {
    pub max_alternates: usize,
    /// Lowest best-candidate confidence that counts towards multi-frame consensus.
    pub min_confidence: f32,
}

impl Default for RankingOptions {
    fn default() -> Self {
        Self {
            max_alternates: 5,
            min_confidence: 0.7,
        }
    }
}

/// Orders candidates by confidence, highest first, and keeps the top
/// `max_alternates` (never more than `MAX_ALTERNATES`). The sort is stable,
/// so ties keep extraction order.
pub fn rank(mut candidates: Vec<DigitCandidate>, max_alternates: usize) -> Vec<DigitCandidate> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    candidates.truncate(max_alternates.min(MAX_ALTERNATES));
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::BBoxPx;

    fn digits(value: &str, confidence: f32) -> DigitCandidate {
        DigitCandidate {
            digits_only: value.to_string(),
            confidence,
            bbox: BBoxPx::default(),
        }
    }

    fn values(ranked: &[DigitCandidate]) -> Vec<&str> {
        ranked.iter().map(|c| c.digits_only.as_str()).collect()
    }

    #[test]
    fn sorts_by_confidence_descending() {
        let ranked = rank(vec![digits("111111", 0.4), digits("222222", 0.9), digits("333333", 0.6)], 5);
        assert_eq!(values(&ranked), vec!["222222", "333333", "111111"]);
    }

    #[test]
    fn ties_keep_extraction_order() {
        let ranked = rank(
            vec![digits("aaaaaa", 0.5), digits("bbbbbb", 0.8), digits("cccccc", 0.5)],
            5,
        );
        assert_eq!(values(&ranked), vec!["bbbbbb", "aaaaaa", "cccccc"]);
    }

    #[test]
    fn truncates_to_limit_with_best_included() {
        let input = (0..8)
            .map(|i| digits(&format!("00000{i}"), i as f32 / 10.0))
            .collect::<Vec<_>>();
        let ranked = rank(input, 5);
        assert_eq!(ranked.len(), 5);
        assert_eq!(ranked[0].digits_only, "000007");
        assert!(ranked.windows(2).all(|pair| pair[0].confidence >= pair[1].confidence));
    }

    #[test]
    fn limit_above_cap_is_clamped() {
        let input = (0..8)
            .map(|i| digits(&format!("00000{i}"), 0.5))
            .collect::<Vec<_>>();
        assert_eq!(rank(input, 10).len(), MAX_ALTERNATES);
    }
}
