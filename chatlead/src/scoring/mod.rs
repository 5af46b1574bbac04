mod classifier;
mod engine;
mod rules;

pub use classifier::PipelineClassifier;
pub use engine::ScoringEngine;
pub use rules::{KeywordMatcher, RuleSpec, RuleTable, ScoringRule, DEFAULT_RULES};
