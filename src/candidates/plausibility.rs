use tracing::{debug, warn};

use crate::model::{DigitCandidate, LastKnownReading};

/// Acceptance band around the previous reading, as ratios of it.
///
/// Meters count upwards, so the band is asymmetric: a little room below for
/// misreads, a lot above for heavy-usage periods.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlausibilityPolicy {
    pub lower_ratio: f64,
    pub upper_ratio: f64,
}

impl Default for PlausibilityPolicy {
    fn default() -> Self {
        Self {
            lower_ratio: 0.95,
            upper_ratio: 1.50,
        }
    }
}

impl PlausibilityPolicy {
    /// Inclusive `(min, max)` band, or `None` when there is no usable history.
    pub fn band(&self, last: Option<&LastKnownReading>) -> Option<(f64, f64)> {
        let value = last?.numeric_value;
        if !value.is_finite() || value <= 0.0 {
            return None;
        }
        Some((value * self.lower_ratio, value * self.upper_ratio))
    }

    pub fn contains(&self, band: (f64, f64), value: f64) -> bool {
        band.0 <= value && value <= band.1
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlausibilityOutcome {
    pub candidates: Vec<DigitCandidate>,
    pub implausible_fallback: bool,
}

/// Drops candidates outside the band around the last known reading.
/// Candidates are compared in meter units, so a decimal register's last
/// digit counts as tenths.
///
/// If that would drop every candidate, all of them are kept and the result
/// is flagged instead; digit-correct readings are never thrown away here.
pub fn filter_plausible(
    candidates: Vec<DigitCandidate>,
    last: Option<&LastKnownReading>,
    policy: &PlausibilityPolicy,
    has_decimal_point: bool,
) -> PlausibilityOutcome {
    let Some(band) = policy.band(last) else {
        debug!(count = candidates.len(), "no usable history; plausibility check skipped");
        return PlausibilityOutcome {
            candidates,
            implausible_fallback: false,
        };
    };

    let plausible = candidates
        .iter()
        .filter(|candidate| {
            let keep = candidate
                .numeric_value(has_decimal_point)
                .map(|value| policy.contains(band, value))
                .unwrap_or(false);
            debug!(
                digits = %candidate.digits_only,
                min = band.0,
                max = band.1,
                keep,
                "plausibility check"
            );
            keep
        })
        .cloned()
        .collect::<Vec<_>>();

    if plausible.is_empty() && !candidates.is_empty() {
        warn!(
            count = candidates.len(),
            min = band.0,
            max = band.1,
            "every candidate is implausible; keeping all digit-correct candidates"
        );
        return PlausibilityOutcome {
            candidates,
            implausible_fallback: true,
        };
    }

    PlausibilityOutcome {
        candidates: plausible,
        implausible_fallback: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::BBoxPx;

    fn digits(value: &str) -> DigitCandidate {
        DigitCandidate {
            digits_only: value.to_string(),
            confidence: 0.5,
            bbox: BBoxPx::default(),
        }
    }

    fn kept(values: &[&str], last: f64) -> Vec<String> {
        let input = values.iter().map(|v| digits(v)).collect();
        let last = LastKnownReading::new(last);
        filter_plausible(input, Some(&last), &PlausibilityPolicy::default(), false)
            .candidates
            .into_iter()
            .map(|c| c.digits_only)
            .collect()
    }

    #[test]
    fn band_edges_are_inclusive() {
        let policy = PlausibilityPolicy::default();
        let band = policy.band(Some(&LastKnownReading::new(1000.0))).expect("band");
        assert!(policy.contains(band, 1049.0));
        assert!(policy.contains(band, 950.0));
        assert!(policy.contains(band, 1500.0));
        assert!(!policy.contains(band, 1501.0));
        assert!(!policy.contains(band, 949.0));
    }

    #[test]
    fn keeps_only_values_inside_band() {
        assert_eq!(
            kept(&["001049", "001501", "000949", "000950", "001234"], 1000.0),
            vec!["001049", "000950", "001234"]
        );
    }

    #[test]
    fn without_history_everything_passes() {
        let input = vec![digits("000001"), digits("999999")];
        let out =
            filter_plausible(input.clone(), None, &PlausibilityPolicy::default(), false);
        assert_eq!(out.candidates, input);
        assert!(!out.implausible_fallback);
    }

    #[test]
    fn non_positive_history_is_ignored() {
        let policy = PlausibilityPolicy::default();
        for last in [0.0, -5.0, f64::NAN] {
            let input = vec![digits("123456")];
            let out = filter_plausible(input, Some(&LastKnownReading::new(last)), &policy, false);
            assert_eq!(out.candidates.len(), 1);
            assert!(!out.implausible_fallback);
        }
    }

    #[test]
    fn all_implausible_falls_back_to_everything() {
        let input = vec![digits("001234"), digits("005678")];
        let out = filter_plausible(
            input.clone(),
            Some(&LastKnownReading::new(2000.0)),
            &PlausibilityPolicy::default(),
            false,
        );
        assert_eq!(out.candidates, input);
        assert!(out.implausible_fallback);
    }

    #[test]
    fn empty_input_is_not_a_fallback() {
        let out = filter_plausible(
            Vec::new(),
            Some(&LastKnownReading::new(2000.0)),
            &PlausibilityPolicy::default(),
            false,
        );
        assert!(out.candidates.is_empty());
        assert!(!out.implausible_fallback);
    }

    #[test]
    fn custom_band_is_honored() {
        let policy = PlausibilityPolicy {
            lower_ratio: 1.0,
            upper_ratio: 1.1,
        };
        let input = vec![digits("000999"), digits("001050")];
        let out = filter_plausible(input, Some(&LastKnownReading::new(1000.0)), &policy, false);
        assert_eq!(out.candidates.len(), 1);
        assert_eq!(out.candidates[0].digits_only, "001050");
    }

    #[test]
    fn decimal_register_is_compared_in_meter_units() {
        let last = LastKnownReading::new(1234.5);
        let input = vec![digits("012350"), digits("123500")];
        let out = filter_plausible(input, Some(&last), &PlausibilityPolicy::default(), true);
        assert!(!out.implausible_fallback);
        assert_eq!(out.candidates.len(), 1);
        assert_eq!(out.candidates[0].digits_only, "012350");
    }
}
