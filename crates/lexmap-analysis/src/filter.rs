//! Tantivy token filter applying Greek phonetic and accent folding.
//!
//! Tokens without Greek letters pass through untouched; the filter sits after
//! `LowerCaser` in the analyzer chain, so in practice only Greek tokens are
//! rewritten.

use tantivy::tokenizer::{Token, TokenFilter, TokenStream, Tokenizer};

use crate::normalize::{needs_normalization, normalize};

/// Folds each token with [`normalize`].
#[derive(Clone, Copy, Debug, Default)]
pub struct GreekFoldFilter;

impl TokenFilter for GreekFoldFilter {
    type Tokenizer<T: Tokenizer> = GreekFoldFilterWrapper<T>;

    fn transform<T: Tokenizer>(self, tokenizer: T) -> Self::Tokenizer<T> {
        GreekFoldFilterWrapper { inner: tokenizer }
    }
}

#[derive(Clone)]
pub struct GreekFoldFilterWrapper<T> {
    inner: T,
}

impl<T: Tokenizer> Tokenizer for GreekFoldFilterWrapper<T> {
    type TokenStream<'a> = GreekFoldTokenStream<T::TokenStream<'a>>;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> Self::TokenStream<'a> {
        GreekFoldTokenStream {
            tail: self.inner.token_stream(text),
        }
    }
}

pub struct GreekFoldTokenStream<T> {
    tail: T,
}

impl<T: TokenStream> TokenStream for GreekFoldTokenStream<T> {
    fn advance(&mut self) -> bool {
        if !self.tail.advance() {
            return false;
        }
        let token = self.tail.token_mut();
        if needs_normalization(&token.text) {
            token.text = normalize(&token.text);
        }
        // a lower-cased trailing Σ comes through as σ
        if token.text.ends_with('σ') {
            token.text.pop();
            token.text.push('ς');
        }
        true
    }

    fn token(&self) -> &Token {
        self.tail.token()
    }

    fn token_mut(&mut self) -> &mut Token {
        self.tail.token_mut()
    }
}
