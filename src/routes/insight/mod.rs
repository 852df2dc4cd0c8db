mod model;

pub use model::{Insight, InsightChanges, InsightFilter, NewInsight};
