//! Confidence classification of a local result set
//!
//! Single gate for both "is this worth caching" and "should we ask Genius".

use crate::models::Confidence;

/// Classify match statistics
///
/// * `high_matches` - similarity-tier matches at or above the high threshold
/// * `medium_matches` - similarity-tier matches between the two thresholds
/// * `total_matches` - size of the merged result set
///
/// Never returns `Confidence::Ongoing`.
pub fn classify(high_matches: usize, medium_matches: usize, total_matches: usize) -> Confidence {
    if high_matches >= 3 {
        Confidence::High
    } else if high_matches > 0 || medium_matches >= 2 || total_matches >= 4 {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}
