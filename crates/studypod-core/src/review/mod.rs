//! Weekly review aggregation.
//!
//! Summarizes a pod's or a learner's check-ins over one ISO week:
//! volume, minutes, mood mix and member participation. Reviews for a week
//! that has not fully elapsed are marked partial.

mod week;
mod weekly;

pub use week::WeekKey;

pub use weekly::{
    MoodDistribution, ReviewSubject, WeeklyReview, WeeklyReviewAggregator,
};

pub(crate) use weekly::median;
