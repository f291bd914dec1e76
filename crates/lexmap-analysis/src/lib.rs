//! # lexmap-analysis
//!
//! Text analysis for lexmap indexes.
//!
//! ## Features
//! - `normalize`: deterministic Greek phonetic and accent folding, so that
//!   "αυτοκίνητο" and "αφτοκινιτο" compare equal
//! - `GreekFoldFilter`: the same folding as a Tantivy token filter
//! - `AnalyzerKind`: named analyzer pipelines (standard, Greek, per-language stemming)

pub mod analyzer;
pub mod error;
pub mod filter;
pub mod normalize;

pub use analyzer::{register_text_analyzer, AnalyzerKind, ENGLISH_STOP_WORDS, TEXT_ANALYZER};
pub use error::AnalysisError;
pub use filter::GreekFoldFilter;
pub use normalize::{needs_normalization, normalize, GREEK_THRESHOLD};
