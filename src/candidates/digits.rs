use crate::model::{DigitCandidate, TextCandidate};

/// Keeps candidates whose digits, once every other character is stripped,
/// number exactly `expected_digit_count`.
///
/// No tolerance either way: serial numbers and partly covered dials produce
/// near-miss lengths far more often than real readings do.
pub fn filter_digits(candidates: &[TextCandidate], expected_digit_count: usize) -> Vec<DigitCandidate> {
    candidates
        .iter()
        .filter_map(|candidate| {
            let digits_only = digits_only(&candidate.raw_text);
            (digits_only.len() == expected_digit_count).then(|| DigitCandidate {
                digits_only,
                confidence: candidate.confidence,
                bbox: candidate.bbox,
            })
        })
        .collect()
}

pub(crate) fn digits_only(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}
