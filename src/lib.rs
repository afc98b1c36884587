pub mod aggregates;
pub mod aligner;
pub mod composer;
pub mod config;
pub mod market_data;
pub mod normalizer;
pub mod pipeline;
pub mod signals;
pub mod sink;
pub mod source;
pub mod stats;

pub use composer::{FearGreedReport, MissingPolicy};
pub use config::{FearGreedConfig, Variant, VariantConfig};
pub use pipeline::FearGreedPipeline;
