mod digits;
mod plausibility;
mod rank;

pub use digits::filter_digits;
pub use plausibility::{PlausibilityOutcome, PlausibilityPolicy, filter_plausible};
pub use rank::{MAX_ALTERNATES, RankingOptions, rank};

pub(crate) use digits::digits_only;
