//! Overlay of holiday exceptions onto a generated baseline schedule.

use tracing::debug;

use crate::model::{ExceptionPair, Schedule};

/// Replace baseline dates by their holiday replacements.
///
/// An exception applies only when its original date is present in the category's baseline;
/// otherwise it refers to a date outside the generated range and is ignored.
#[must_use]
pub fn reconcile(mut baseline: Schedule, exceptions: Vec<ExceptionPair>) -> Schedule {
    for exception in exceptions {
        if baseline.remove(&exception.category, exception.original) {
            baseline.insert(&exception.category, exception.replacement);
            debug!(
                category = %exception.category,
                original = %exception.original,
                replacement = %exception.replacement,
                "Applied pickup exception"
            );
        } else {
            debug!(
                category = %exception.category,
                original = %exception.original,
                "Ignoring exception for date outside the baseline"
            );
        }
    }
    baseline
}
