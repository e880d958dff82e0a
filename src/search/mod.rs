pub mod analyzer;
pub mod hydrate;
pub mod matcher;
pub mod recommend;

pub use analyzer::QueryAnalyzer;
pub use recommend::Recommender;
