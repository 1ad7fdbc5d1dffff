//! Ranking and explanation on top of the vector index.

mod engine;
pub mod explain;
mod result;

pub use engine::{BuildReport, EngineState, SearchEngine, SearchOptions};
pub use result::{Explanation, SearchResult};
