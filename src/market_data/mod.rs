pub mod candle_cache;
pub mod source;

// Re-export the source seam for convenient access (e.g. `use crate::market_data::CandleSource`).
pub use candle_cache::CachedSource;
pub use source::{CandleSource, SourceError};
