use std::fmt::Write;

use crate::model::{MeterProfile, Outcome, Preprocessing, RankedResult};

/// Plain-text summary of a recognition run.
///
/// Timing is left out so the output only depends on the candidates.
pub fn render_report(result: &RankedResult, profile: &MeterProfile) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "meter: {} ({} digits{})",
        profile.meter_id,
        profile.expected_digit_count,
        if profile.has_decimal_point {
            ", last is decimal"
        } else {
            ""
        }
    );
    let outcome = match result.outcome() {
        Outcome::Accepted => "accepted",
        Outcome::Empty => "empty",
        Outcome::ImplausibleFallback => "implausible fallback",
    };
    let _ = writeln!(out, "outcome: {}", outcome);
    let _ = writeln!(out, "preprocessing: {}", describe_preprocessing(&result.preprocessing));

    match &result.best {
        Some(best) => {
            let _ = writeln!(
                out,
                "best: {} ({:.2})",
                display_value(&best.digits_only, profile.has_decimal_point),
                best.confidence
            );
        }
        None => {
            let _ = writeln!(out, "best: none, enter the reading manually");
        }
    }
    if result.implausible_fallback {
        let _ = writeln!(
            out,
            "warning: no candidate is close to the last reading; check before accepting"
        );
    }
    if !result.alternates.is_empty() {
        let _ = writeln!(out, "alternates:");
        for (index, candidate) in result.alternates.iter().enumerate() {
            let _ = writeln!(
                out,
                "  {}. {} ({:.2})",
                index + 1,
                display_value(&candidate.digits_only, profile.has_decimal_point),
                candidate.confidence
            );
        }
    }
    out.trim_end().to_string()
}

fn describe_preprocessing(preprocessing: &Preprocessing) -> String {
    match preprocessing {
        Preprocessing::Applied {
            rotated_by: Some(angle),
        } => format!("applied, rotated {:.1} deg", angle),
        Preprocessing::Applied { rotated_by: None } => "applied".to_string(),
        Preprocessing::Skipped => "skipped".to_string(),
        Preprocessing::Unavailable => "unavailable, raw capture used".to_string(),
    }
}

fn display_value(digits: &str, has_decimal_point: bool) -> String {
    if !has_decimal_point || digits.len() < 2 {
        return digits.to_string();
    }
    let (whole, fraction) = digits.split_at(digits.len() - 1);
    format!("{}.{}", whole, fraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::BBoxPx;
    use crate::model::DigitCandidate;

    fn candidate(value: &str, confidence: f32) -> DigitCandidate {
        DigitCandidate {
            digits_only: value.to_string(),
            confidence,
            bbox: BBoxPx::default(),
        }
    }

    #[test]
    fn empty_result_prompts_manual_entry() {
        let profile = MeterProfile::new("m-1", 6, false).unwrap();
        let report = render_report(&RankedResult::empty(Preprocessing::Skipped), &profile);
        assert_eq!(
            report,
            "meter: m-1 (6 digits)\noutcome: empty\npreprocessing: skipped\nbest: none, enter the reading manually"
        );
    }

    #[test]
    fn decimal_meter_shows_fraction_and_warning() {
        let profile = MeterProfile::new("m-2", 6, true).unwrap();
        let alternates = vec![candidate("012345", 0.9)];
        let result = RankedResult {
            best: alternates.first().cloned(),
            alternates,
            implausible_fallback: true,
            preprocessing: Preprocessing::Applied {
                rotated_by: Some(-5.71),
            },
            capture_hash: String::new(),
            processing_ms: 99,
        };
        let report = render_report(&result, &profile);
        assert!(report.contains("meter: m-2 (6 digits, last is decimal)"));
        assert!(report.contains("outcome: implausible fallback"));
        assert!(report.contains("preprocessing: applied, rotated -5.7 deg"));
        assert!(report.contains("best: 01234.5 (0.90)"));
        assert!(report.contains("warning:"));
        assert!(report.ends_with("  1. 01234.5 (0.90)"));
    }
}
