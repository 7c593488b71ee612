// Evaluation — compare cluster assignments against gold sentence labels.

pub mod gold;
pub mod metrics;
