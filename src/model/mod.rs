pub mod encoder;
pub mod metric;
pub mod scores;
pub mod thresholds;
