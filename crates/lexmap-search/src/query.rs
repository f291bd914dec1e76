//! Query construction.
//!
//! Search clauses are built with the constructors on [`SearchClause`] and
//! compiled by [`QueryBuilder`] into a [`QueryDescriptor`]: one boolean query
//! over the non-spatial clauses plus an optional area filter.

use std::ops::Bound;

use chrono::NaiveDateTime;
use tantivy::query::{
    AllQuery, BooleanQuery, BoostQuery, EmptyQuery, FuzzyTermQuery, Occur, Query, QueryParser,
    RangeQuery, RegexQuery, TermQuery,
};
use tantivy::schema::{Field, IndexRecordOption};
use tantivy::Term;
use tracing::debug;

use lexmap_types::GeoPoint;

use crate::codec::{FieldKind, DATE_FORMAT};
use crate::error::{QueryCompositionError, SchemaError, SearchError};
use crate::index::DocumentStore;
use crate::schema::{FieldBinding, Record, RecordSchema};
use crate::spatial::{SearchArea, SpatialStrategy};

/// Similarity used by fuzzy clauses the parser cannot split into words.
pub const FUZZY_SIMILARITY: f32 = 0.7;

/// Edit distance for fuzzy clauses over plain words.
pub const FUZZY_MAX_EDITS: u8 = 2;

/// Characters with a meaning in query parser syntax.
const QUERY_SPECIAL_CHARS: &[char] = &[
    '+', '-', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':', '\\',
    '/',
];

/// How a clause takes part in the boolean combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Occurrence {
    #[default]
    Must,
    Should,
    MustNot,
}

impl From<Occurrence> for Occur {
    fn from(occurrence: Occurrence) -> Self {
        match occurrence {
            Occurrence::Must => Occur::Must,
            Occurrence::Should => Occur::Should,
            Occurrence::MustNot => Occur::MustNot,
        }
    }
}

/// Closed interval bounds of a range clause.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeBounds {
    Int { from: i64, to: i64 },
    Double { from: f64, to: f64 },
    Date { from: NaiveDateTime, to: NaiveDateTime },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClauseKind {
    /// Literal handed to the query parser
    Term(String),
    /// Prefix or `*`/`?` wildcard pattern
    Like(String),
    /// Edit-distance match
    Fuzzy(String),
    /// Whole-value match on the raw field
    Exact(String),
    Range(RangeBounds),
    InArea(SearchArea),
}

/// One search predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchClause {
    /// Record property the clause applies to; ignored by area clauses
    pub property: String,
    pub kind: ClauseKind,
    pub boost: Option<f32>,
    pub occurrence: Occurrence,
}

impl SearchClause {
    fn new(property: &str, kind: ClauseKind) -> Self {
        Self {
            property: property.to_string(),
            kind,
            boost: None,
            occurrence: Occurrence::Must,
        }
    }

    pub fn term(property: &str, text: &str) -> Self {
        Self::new(property, ClauseKind::Term(text.to_string()))
    }

    pub fn like(property: &str, pattern: &str) -> Self {
        Self::new(property, ClauseKind::Like(pattern.to_string()))
    }

    pub fn fuzzy(property: &str, text: &str) -> Self {
        Self::new(property, ClauseKind::Fuzzy(text.to_string()))
    }

    pub fn exact(property: &str, value: impl ToString) -> Self {
        Self::new(property, ClauseKind::Exact(value.to_string()))
    }

    pub fn range_int(property: &str, from: i64, to: i64) -> Self {
        Self::new(property, ClauseKind::Range(RangeBounds::Int { from, to }))
    }

    pub fn range_double(property: &str, from: f64, to: f64) -> Self {
        Self::new(property, ClauseKind::Range(RangeBounds::Double { from, to }))
    }

    pub fn range_date(property: &str, from: NaiveDateTime, to: NaiveDateTime) -> Self {
        Self::new(property, ClauseKind::Range(RangeBounds::Date { from, to }))
    }

    /// Area around `center` on the record's geo property.
    pub fn in_area(center: GeoPoint, radius_km: f64) -> Result<Self, QueryCompositionError> {
        let area = SearchArea::new(center, radius_km)?;
        Ok(Self::new("", ClauseKind::InArea(area)))
    }

    pub fn boost(mut self, boost: f32) -> Self {
        self.boost = Some(boost);
        self
    }

    pub fn with_occurrence(mut self, occurrence: Occurrence) -> Self {
        self.occurrence = occurrence;
        self
    }

    pub fn must(self) -> Self {
        self.with_occurrence(Occurrence::Must)
    }

    pub fn should(self) -> Self {
        self.with_occurrence(Occurrence::Should)
    }

    pub fn must_not(self) -> Self {
        self.with_occurrence(Occurrence::MustNot)
    }

    pub fn is_area(&self) -> bool {
        matches!(self.kind, ClauseKind::InArea(_))
    }
}

/// Requested sort on a record property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOption {
    pub property: String,
    pub descending: bool,
}

impl SortOption {
    pub fn asc(property: &str) -> Self {
        Self {
            property: property.to_string(),
            descending: false,
        }
    }

    pub fn desc(property: &str) -> Self {
        Self {
            property: property.to_string(),
            descending: true,
        }
    }
}

/// Sort option resolved to its document field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field_name: String,
    pub kind: FieldKind,
    pub descending: bool,
}

impl SortKey {
    pub fn resolve<T: Record>(
        schema: &RecordSchema<T>,
        option: &SortOption,
    ) -> Result<Self, SchemaError> {
        let binding = schema.binding(&option.property)?;
        Ok(Self {
            field_name: binding.raw_field().to_string(),
            kind: binding.kind,
            descending: option.descending,
        })
    }
}

/// Area filter of a compiled query.
#[derive(Debug)]
pub struct SpatialFilter {
    pub area: SearchArea,
    /// Bounding-box prefilter over the x/y fields
    pub filter: Box<dyn Query>,
    pub x: Field,
    pub y: Field,
}

/// Compiled form of a clause list.
#[derive(Debug, Default)]
pub struct QueryDescriptor {
    query: Option<Box<dyn Query>>,
    spatial: Option<SpatialFilter>,
}

impl QueryDescriptor {
    /// True when an area clause is present; hits are then ranked by distance.
    pub fn is_spatial(&self) -> bool {
        self.spatial.is_some()
    }

    pub fn spatial(&self) -> Option<&SpatialFilter> {
        self.spatial.as_ref()
    }

    /// True when there is nothing to evaluate.
    pub fn is_empty(&self) -> bool {
        self.query.is_none() && self.spatial.is_none()
    }

    /// The evaluable query: the boolean combination, AND the area filter.
    pub fn to_query(&self) -> Option<Box<dyn Query>> {
        match (&self.query, &self.spatial) {
            (None, None) => None,
            (Some(query), None) => Some(query.box_clone()),
            (None, Some(spatial)) => Some(spatial.filter.box_clone()),
            (Some(query), Some(spatial)) => Some(Box::new(BooleanQuery::new(vec![
                (Occur::Must, query.box_clone()),
                (Occur::Must, spatial.filter.box_clone()),
            ]))),
        }
    }
}

/// Compiles clauses against one record type's store.
pub struct QueryBuilder<'a, T> {
    store: &'a DocumentStore,
    schema: &'a RecordSchema<T>,
}

impl<'a, T: Record> QueryBuilder<'a, T> {
    pub fn new(store: &'a DocumentStore, schema: &'a RecordSchema<T>) -> Self {
        Self { store, schema }
    }

    /// Compile `clauses`, in order, into a descriptor.
    pub fn build(&self, clauses: &[SearchClause]) -> Result<QueryDescriptor, SearchError> {
        let mut subqueries: Vec<(Occur, Box<dyn Query>)> = Vec::with_capacity(clauses.len());
        let mut spatial: Option<SpatialFilter> = None;

        for clause in clauses {
            if let ClauseKind::InArea(area) = &clause.kind {
                if spatial.is_some() {
                    return Err(QueryCompositionError::DuplicateArea.into());
                }
                spatial = Some(self.spatial_filter(*area)?);
                continue;
            }

            let binding = self.schema.binding(&clause.property)?;
            let mut query = self.clause_query(binding, &clause.kind)?;
            if let Some(boost) = clause.boost {
                query = Box::new(BoostQuery::new(query, boost));
            }
            subqueries.push((clause.occurrence.into(), query));
        }

        let query = if subqueries.is_empty() {
            None
        } else {
            // a purely negative combination matches nothing on its own
            if subqueries.iter().all(|(occur, _)| *occur == Occur::MustNot) {
                subqueries.push((Occur::Must, Box::new(AllQuery)));
            }
            Some(Box::new(BooleanQuery::new(subqueries)) as Box<dyn Query>)
        };

        debug!(
            clauses = clauses.len(),
            spatial = spatial.is_some(),
            "Built query descriptor"
        );

        Ok(QueryDescriptor { query, spatial })
    }

    /// Resolve sort options through the record schema.
    pub fn resolve_sort(&self, sort: &[SortOption]) -> Result<Vec<SortKey>, SearchError> {
        sort.iter()
            .map(|option| SortKey::resolve(self.schema, option).map_err(SearchError::from))
            .collect()
    }

    /// Multi-property free-text query.
    ///
    /// Every word of `text` is folded by the store's analyzer and
    /// prefix-matched on the text field of each property; words combine as
    /// SHOULD. Returns `None` for blank text.
    pub fn free_text(
        &self,
        text: &str,
        properties: &[&str],
    ) -> Result<Option<Box<dyn Query>>, SearchError> {
        let analyzer = self.store.config().analyzer;
        let words: Vec<String> = text
            .split(|c: char| c.is_whitespace() || c == '-')
            .filter(|w| !w.is_empty())
            .map(|w| analyzer.transform_query(w))
            .collect();
        if words.is_empty() || properties.is_empty() {
            return Ok(None);
        }

        let mut fields = Vec::with_capacity(properties.len());
        for property in properties {
            let binding = self.schema.binding(property)?;
            fields.push(self.store.field(binding.text_field())?);
        }

        let mut per_word: Vec<(Occur, Box<dyn Query>)> = Vec::with_capacity(words.len());
        for word in &words {
            let pattern = wildcard_pattern(word);
            let mut per_field: Vec<(Occur, Box<dyn Query>)> = Vec::with_capacity(fields.len());
            for field in &fields {
                let regex = RegexQuery::from_pattern(&pattern, *field)?;
                per_field.push((Occur::Should, Box::new(regex)));
            }
            per_word.push((Occur::Should, Box::new(BooleanQuery::new(per_field))));
        }
        Ok(Some(Box::new(BooleanQuery::new(per_word))))
    }

    fn spatial_filter(&self, area: SearchArea) -> Result<SpatialFilter, SearchError> {
        let prefix = self
            .schema
            .geo()
            .and_then(|b| b.spatial_prefix.as_deref())
            .ok_or_else(|| SchemaError::NoGeoField(self.schema.name().to_string()))?;
        let strategy = SpatialStrategy::from_prefix(prefix);
        let x = self.store.field(&strategy.x_field())?;
        let y = self.store.field(&strategy.y_field())?;
        Ok(SpatialFilter {
            area,
            filter: strategy.circle_filter(&area, x, y),
            x,
            y,
        })
    }

    fn clause_query(
        &self,
        binding: &FieldBinding,
        kind: &ClauseKind,
    ) -> Result<Box<dyn Query>, SearchError> {
        match kind {
            ClauseKind::Term(text) => self.term_query(binding, text),
            ClauseKind::Like(pattern) => self.like_query(binding, pattern),
            ClauseKind::Fuzzy(text) => self.fuzzy_query(binding, text),
            ClauseKind::Exact(literal) => {
                let field = self.store.field(binding.raw_field())?;
                let term = exact_term(binding, field, literal)?;
                Ok(Box::new(TermQuery::new(term, IndexRecordOption::Basic)))
            }
            ClauseKind::Range(bounds) => {
                let field = self.store.field(binding.raw_field())?;
                range_query(binding, field, bounds)
            }
            ClauseKind::InArea(_) => Err(QueryCompositionError::DuplicateArea.into()),
        }
    }

    fn term_query(&self, binding: &FieldBinding, text: &str) -> Result<Box<dyn Query>, SearchError> {
        if text.trim().is_empty() {
            return Ok(Box::new(EmptyQuery));
        }
        let field = self.store.field(binding.text_field())?;
        let parser = QueryParser::for_index(self.store.index(), vec![field]);
        match parser.parse_query(text) {
            Ok(query) => Ok(query),
            Err(err) => {
                debug!(text, error = %err, "Retrying term query as escaped literal");
                Ok(parser.parse_query(&escape_query(text))?)
            }
        }
    }

    fn like_query(&self, binding: &FieldBinding, pattern: &str) -> Result<Box<dyn Query>, SearchError> {
        let field = self.store.field(binding.text_field())?;
        let words: Vec<String> = if binding.analysis_name.is_some() {
            let analyzer = self.store.config().analyzer;
            pattern
                .split_whitespace()
                .map(|w| analyzer.transform_query(w))
                .collect()
        } else {
            // a raw field holds the whole value verbatim as one term
            let trimmed = pattern.trim();
            if trimmed.is_empty() {
                Vec::new()
            } else {
                vec![trimmed.to_string()]
            }
        };
        if words.is_empty() {
            return Ok(Box::new(EmptyQuery));
        }

        let mut subqueries: Vec<(Occur, Box<dyn Query>)> = Vec::with_capacity(words.len());
        for word in &words {
            let regex = RegexQuery::from_pattern(&wildcard_pattern(word), field)?;
            subqueries.push((Occur::Must, Box::new(regex)));
        }
        Ok(Box::new(BooleanQuery::new(subqueries)))
    }

    fn fuzzy_query(&self, binding: &FieldBinding, text: &str) -> Result<Box<dyn Query>, SearchError> {
        let field = self.store.field(binding.text_field())?;
        let analyzed = binding.analysis_name.is_some();
        let normalized = if analyzed {
            self.store.config().analyzer.transform_query(text.trim())
        } else {
            text.trim().to_string()
        };
        if normalized.is_empty() {
            return Ok(Box::new(EmptyQuery));
        }

        let words: Vec<&str> = normalized.split_whitespace().collect();
        let plain = analyzed && words.iter().all(|w| w.chars().all(char::is_alphanumeric));

        if plain {
            let subqueries: Vec<(Occur, Box<dyn Query>)> = words
                .iter()
                .map(|word| {
                    let term = Term::from_field_text(field, word);
                    let fuzzy = FuzzyTermQuery::new(term, FUZZY_MAX_EDITS, true);
                    (Occur::Must, Box::new(fuzzy) as Box<dyn Query>)
                })
                .collect();
            return Ok(Box::new(BooleanQuery::new(subqueries)));
        }

        // not splittable into words: one term at the fixed similarity
        let edits = edits_for_similarity(&normalized, FUZZY_SIMILARITY);
        let term = Term::from_field_text(field, &normalized);
        Ok(Box::new(FuzzyTermQuery::new(term, edits, true)))
    }
}

/// Backslash-escape query parser syntax in `text`.
pub fn escape_query(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() * 2);
    for c in text.chars() {
        if QUERY_SPECIAL_CHARS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Regex for a like pattern: `*` is any run, `?` any one character.
/// A pattern without wildcards matches as a prefix.
pub fn wildcard_pattern(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 2);
    let mut wildcard = false;
    for c in pattern.chars() {
        match c {
            '*' => {
                regex.push_str(".*");
                wildcard = true;
            }
            '?' => {
                regex.push('.');
                wildcard = true;
            }
            other => regex.push_str(&regex::escape(other.encode_utf8(&mut [0u8; 4]))),
        }
    }
    if !wildcard {
        regex.push_str(".*");
    }
    regex
}

/// Edit distance allowed for `text` at the given similarity, capped at 2.
pub fn edits_for_similarity(text: &str, similarity: f32) -> u8 {
    let chars = text.chars().count() as f32;
    let edits = ((1.0 - similarity) * chars).floor() as u8;
    edits.min(FUZZY_MAX_EDITS)
}

/// Parse a date literal in the stored form or ISO 8601.
fn parse_date(literal: &str) -> Option<NaiveDateTime> {
    [DATE_FORMAT, "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(literal, format).ok())
}

fn invalid_literal(binding: &FieldBinding, literal: &str, reason: impl ToString) -> QueryCompositionError {
    QueryCompositionError::InvalidLiteral {
        field: binding.field_name.clone(),
        literal: literal.to_string(),
        reason: reason.to_string(),
    }
}

/// Whole-value term for `literal` on the binding's raw field.
fn exact_term(binding: &FieldBinding, field: Field, literal: &str) -> Result<Term, QueryCompositionError> {
    let term = match binding.kind {
        FieldKind::Int => {
            let n = literal
                .trim()
                .parse::<i64>()
                .map_err(|e| invalid_literal(binding, literal, e))?;
            Term::from_field_i64(field, n)
        }
        FieldKind::UInt => {
            let n = literal
                .trim()
                .parse::<u64>()
                .map_err(|e| invalid_literal(binding, literal, e))?;
            Term::from_field_u64(field, n)
        }
        FieldKind::Float => {
            let n = literal
                .trim()
                .parse::<f64>()
                .map_err(|e| invalid_literal(binding, literal, e))?;
            Term::from_field_f64(field, n)
        }
        FieldKind::Date => {
            let date = parse_date(literal.trim())
                .ok_or_else(|| invalid_literal(binding, literal, "not a date"))?;
            Term::from_field_text(field, &date.format(DATE_FORMAT).to_string())
        }
        FieldKind::Identity | FieldKind::Text | FieldKind::Geo | FieldKind::Structured => {
            Term::from_field_text(field, literal)
        }
    };
    Ok(term)
}

/// Inclusive range over the binding's raw field.
fn range_query(
    binding: &FieldBinding,
    field: Field,
    bounds: &RangeBounds,
) -> Result<Box<dyn Query>, SearchError> {
    let (from, to) = match (binding.kind, bounds) {
        (FieldKind::Int, RangeBounds::Int { from, to }) => (
            Term::from_field_i64(field, *from),
            Term::from_field_i64(field, *to),
        ),
        (FieldKind::UInt, RangeBounds::Int { from, to }) if *from >= 0 && *to >= 0 => (
            Term::from_field_u64(field, *from as u64),
            Term::from_field_u64(field, *to as u64),
        ),
        (FieldKind::Float, RangeBounds::Double { from, to }) => (
            Term::from_field_f64(field, *from),
            Term::from_field_f64(field, *to),
        ),
        (FieldKind::Float, RangeBounds::Int { from, to }) => (
            Term::from_field_f64(field, *from as f64),
            Term::from_field_f64(field, *to as f64),
        ),
        // the stored date form sorts lexicographically in time order
        (FieldKind::Date, RangeBounds::Date { from, to }) => (
            Term::from_field_text(field, &from.format(DATE_FORMAT).to_string()),
            Term::from_field_text(field, &to.format(DATE_FORMAT).to_string()),
        ),
        (kind, _) => {
            return Err(QueryCompositionError::RangeKind {
                field: binding.field_name.clone(),
                kind,
            }
            .into())
        }
    };
    Ok(Box::new(RangeQuery::new(
        Bound::Included(from),
        Bound::Included(to),
    )))
}
