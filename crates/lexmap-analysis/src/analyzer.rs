//! Named analyzer pipelines.
//!
//! Analyzed fields reference a single tokenizer name, [`TEXT_ANALYZER`]; the
//! pipeline registered under it is chosen by configuration each time an index
//! is opened.

use std::fmt;
use std::str::FromStr;

use tantivy::tokenizer::{
    AsciiFoldingFilter, Language, LowerCaser, RemoveLongFilter, SimpleTokenizer, Stemmer,
    StopWordFilter, TextAnalyzer, TokenStream, TokenizerManager,
};
use tracing::debug;

use crate::error::AnalysisError;
use crate::filter::GreekFoldFilter;
use crate::normalize::normalize;

/// Tokenizer name used by every analyzed field.
pub const TEXT_ANALYZER: &str = "lexmap_text";

/// Tokens longer than this are dropped.
const MAX_TOKEN_LEN: usize = 40;

/// Classic English stop set.
pub const ENGLISH_STOP_WORDS: [&str; 33] = [
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with",
];

/// Analyzer applied to analyzed fields at index and query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalyzerKind {
    /// Tokenize and lower-case only
    Standard,
    /// tokenize -> lowercase -> fold diacritics -> Greek fold -> English stop words
    #[default]
    Greek,
    /// Per-language stemming
    Stemmed(Language),
}

impl AnalyzerKind {
    /// Build the Tantivy analyzer for this kind.
    pub fn build(&self) -> TextAnalyzer {
        match self {
            AnalyzerKind::Standard => TextAnalyzer::builder(SimpleTokenizer::default())
                .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
                .filter(LowerCaser)
                .build(),
            AnalyzerKind::Greek => TextAnalyzer::builder(SimpleTokenizer::default())
                .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
                .filter(LowerCaser)
                .filter(AsciiFoldingFilter)
                .filter(GreekFoldFilter)
                .filter(StopWordFilter::remove(
                    ENGLISH_STOP_WORDS.iter().map(|w| w.to_string()),
                ))
                .build(),
            AnalyzerKind::Stemmed(language) => TextAnalyzer::builder(SimpleTokenizer::default())
                .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
                .filter(LowerCaser)
                .filter(Stemmer::new(*language))
                .build(),
        }
    }

    /// Fold a like or fuzzy literal the way this analyzer folds tokens.
    ///
    /// Wildcards pass through unchanged.
    pub fn transform_query(&self, text: &str) -> String {
        match self {
            AnalyzerKind::Greek => normalize(text),
            AnalyzerKind::Standard | AnalyzerKind::Stemmed(_) => text.to_lowercase(),
        }
    }

    /// Run `text` through the analyzer and collect the token texts.
    pub fn analyze(&self, text: &str) -> Vec<String> {
        let mut analyzer = self.build();
        let mut stream = analyzer.token_stream(text);
        let mut tokens = Vec::new();
        while stream.advance() {
            tokens.push(stream.token().text.clone());
        }
        tokens
    }
}

impl fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalyzerKind::Standard => f.write_str("standard"),
            AnalyzerKind::Greek => f.write_str("greek"),
            AnalyzerKind::Stemmed(language) => write!(f, "stemmed({language:?})"),
        }
    }
}

impl FromStr for AnalyzerKind {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let language = match s.trim().to_ascii_lowercase().as_str() {
            "standard" => return Ok(AnalyzerKind::Standard),
            "greek" | "greek_aci" => return Ok(AnalyzerKind::Greek),
            "ar" => Language::Arabic,
            "da" => Language::Danish,
            "nl" => Language::Dutch,
            "en" => Language::English,
            "fi" => Language::Finnish,
            "fr" => Language::French,
            "de" => Language::German,
            "el" => Language::Greek,
            "hu" => Language::Hungarian,
            "it" => Language::Italian,
            "no" | "nb" => Language::Norwegian,
            "pt" => Language::Portuguese,
            "ro" => Language::Romanian,
            "ru" => Language::Russian,
            "es" => Language::Spanish,
            "sv" => Language::Swedish,
            "ta" => Language::Tamil,
            "tr" => Language::Turkish,
            _ => return Err(AnalysisError::UnknownLanguage(s.to_string())),
        };
        Ok(AnalyzerKind::Stemmed(language))
    }
}

/// Register `kind` under [`TEXT_ANALYZER`] in an index's tokenizer manager.
pub fn register_text_analyzer(manager: &TokenizerManager, kind: AnalyzerKind) {
    manager.register(TEXT_ANALYZER, kind.build());
    debug!(analyzer = %kind, "Registered text analyzer");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greek_pipeline() {
        let tokens = AnalyzerKind::Greek.analyze("The Αυτοκίνητο and the café");
        assert_eq!(tokens, vec!["αφτοκινιτο", "cafe"]);
    }

    #[test]
    fn test_standard_pipeline_keeps_accents() {
        let tokens = AnalyzerKind::Standard.analyze("The Αυτοκίνητο");
        assert_eq!(tokens, vec!["the", "αυτοκίνητο"]);
    }

    #[test]
    fn test_stemmed_pipeline() {
        let tokens = AnalyzerKind::Stemmed(Language::English).analyze("running shops");
        assert_eq!(tokens, vec!["run", "shop"]);
    }

    #[test]
    fn test_transform_query_follows_analyzer() {
        assert_eq!(AnalyzerKind::Greek.transform_query("Αυτοκ*"), "αφτοκ*");
        assert_eq!(AnalyzerKind::Standard.transform_query("Αυτοκ*"), "αυτοκ*");
        assert_eq!(
            AnalyzerKind::Stemmed(Language::Greek).transform_query("Αυτοκ?"),
            "αυτοκ?"
        );
    }

    #[test]
    fn test_parse_kinds() {
        assert_eq!("greek".parse::<AnalyzerKind>().unwrap(), AnalyzerKind::Greek);
        assert_eq!(
            "standard".parse::<AnalyzerKind>().unwrap(),
            AnalyzerKind::Standard
        );
        assert_eq!(
            "DE".parse::<AnalyzerKind>().unwrap(),
            AnalyzerKind::Stemmed(Language::German)
        );
        assert!(matches!(
            "xx".parse::<AnalyzerKind>(),
            Err(AnalysisError::UnknownLanguage(_))
        ));
    }

    #[test]
    fn test_register_text_analyzer() {
        let manager = TokenizerManager::default();
        register_text_analyzer(&manager, AnalyzerKind::Greek);
        assert!(manager.get(TEXT_ANALYZER).is_some());
    }
}
