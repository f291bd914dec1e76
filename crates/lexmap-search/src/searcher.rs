//! Typed search over a document store.
//!
//! A [`Searcher`] compiles clauses with the [`QueryBuilder`], evaluates them
//! against its reader, applies the area test and sort, and decodes the
//! requested page back into records.

use std::cmp::Ordering;
use std::sync::Arc;

use tantivy::collector::TopDocs;
use tantivy::query::{AllQuery, Query};
use tantivy::{IndexReader, TantivyDocument};
use tracing::{debug, info};

use lexmap_types::GeoPoint;

use crate::codec::{FieldKind, FieldPayload};
use crate::document::{doc_to_record, stored_payload};
use crate::error::{QueryCompositionError, SearchError};
use crate::index::DocumentStore;
use crate::paginate::{page_count, paginate};
use crate::query::{Occurrence, QueryBuilder, SearchClause, SortKey, SortOption, SpatialFilter};
use crate::schema::{resolve, Record, RecordSchema};
use crate::spatial::distance_km;

/// A decoded record with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit<T> {
    pub record: T,
    /// Relevance score from the index
    pub score: f32,
    /// Distance from the area center, on area searches
    pub distance_km: Option<f64>,
}

/// One page of results.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultPage<T> {
    pub hits: Vec<SearchHit<T>>,
    /// Matching records; page count for [`Searcher::all_paged`]
    pub total: usize,
}

impl<T> ResultPage<T> {
    pub fn empty() -> Self {
        Self {
            hits: Vec::new(),
            total: 0,
        }
    }

    pub fn records(&self) -> impl Iterator<Item = &T> {
        self.hits.iter().map(|hit| &hit.record)
    }

    pub fn into_records(self) -> Vec<T> {
        self.hits.into_iter().map(|hit| hit.record).collect()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// A matched document before decoding.
struct Candidate {
    score: f32,
    doc: TantivyDocument,
    distance_km: Option<f64>,
}

/// Searches records of type `T`.
pub struct Searcher<T> {
    store: DocumentStore,
    reader: IndexReader,
    schema: Arc<RecordSchema<T>>,
}

impl<T: Record> Searcher<T> {
    /// Create a searcher; fails if the store has no index yet.
    pub fn new(store: &DocumentStore) -> Result<Self, SearchError> {
        if !store.exists() {
            return Err(SearchError::IndexUnavailable {
                name: store.name().to_string(),
                path: store.path().display().to_string(),
            });
        }
        let schema = resolve::<T>()?;
        let reader = store.reader()?;
        Ok(Self {
            store: store.clone(),
            reader,
            schema,
        })
    }

    /// Reload the reader to see recent commits.
    pub fn refresh(&self) -> Result<(), SearchError> {
        self.reader.reload()?;
        debug!(record = self.schema.name(), "Reloaded search reader");
        Ok(())
    }

    /// Number of live documents visible to the reader.
    pub fn count(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    /// Pages needed to list every record at `page_size` per page.
    pub fn page_count(&self, page_size: usize) -> usize {
        page_count(self.count() as usize, page_size)
    }

    /// Start a fluent request.
    pub fn request(&self) -> SearchRequest<'_, T> {
        SearchRequest::new(self)
    }

    /// Evaluate `clauses` and return the requested page.
    pub fn search(
        &self,
        clauses: &[SearchClause],
        page: i64,
        page_size: usize,
        sort: &[SortOption],
    ) -> Result<ResultPage<T>, SearchError> {
        let builder = QueryBuilder::new(&self.store, &self.schema);
        let descriptor = builder.build(clauses)?;
        let sort = builder.resolve_sort(sort)?;

        let Some(query) = descriptor.to_query() else {
            return Ok(ResultPage::empty());
        };
        let candidates = self.execute(
            query.as_ref(),
            descriptor.spatial(),
            &sort,
            self.store.config().max_results,
        )?;

        let (window, total) = paginate(&candidates, page, page_size);
        let hits = self.decode(window)?;
        info!(
            record = self.schema.name(),
            clauses = clauses.len(),
            total,
            returned = hits.len(),
            "Search complete"
        );
        Ok(ResultPage { hits, total })
    }

    /// The single record whose `property` equals `value` exactly.
    pub fn search_by_field(
        &self,
        property: &str,
        value: impl ToString,
    ) -> Result<Option<T>, SearchError> {
        let page = self.search(&[SearchClause::exact(property, value)], 1, 1, &[])?;
        Ok(page.into_records().into_iter().next())
    }

    pub fn search_exact_one(
        &self,
        property: &str,
        value: impl ToString,
    ) -> Result<Option<T>, SearchError> {
        self.search_by_field(property, value)
    }

    /// Page through every record.
    ///
    /// `total` is the number of pages, `ceil(count / page_size)`, not the
    /// number of records.
    pub fn all_paged(
        &self,
        page: i64,
        page_size: usize,
        sort: &[SortOption],
    ) -> Result<ResultPage<T>, SearchError> {
        let sort = QueryBuilder::new(&self.store, &self.schema).resolve_sort(sort)?;
        let count = self.count() as usize;
        let candidates = self.execute(&AllQuery, None, &sort, count)?;

        let (window, _) = paginate(&candidates, page, page_size);
        let hits = self.decode(window)?;
        let total = page_count(count, page_size);
        debug!(record = self.schema.name(), page, pages = total, "Listed records");
        Ok(ResultPage { hits, total })
    }

    /// Free-text search across several properties.
    pub fn search_text(
        &self,
        text: &str,
        properties: &[&str],
        page: i64,
        page_size: usize,
        sort: &[SortOption],
    ) -> Result<ResultPage<T>, SearchError> {
        let builder = QueryBuilder::new(&self.store, &self.schema);
        let sort = builder.resolve_sort(sort)?;
        let Some(query) = builder.free_text(text, properties)? else {
            return Ok(ResultPage::empty());
        };
        let candidates = self.execute(
            query.as_ref(),
            None,
            &sort,
            self.store.config().max_results,
        )?;

        let (window, total) = paginate(&candidates, page, page_size);
        let hits = self.decode(window)?;
        info!(
            record = self.schema.name(),
            text,
            total,
            "Text search complete"
        );
        Ok(ResultPage { hits, total })
    }

    /// Collect, area-filter and order matching documents, keeping `limit`.
    fn execute(
        &self,
        query: &dyn Query,
        spatial: Option<&SpatialFilter>,
        sort: &[SortKey],
        limit: usize,
    ) -> Result<Vec<Candidate>, SearchError> {
        let searcher = self.reader.searcher();
        if limit == 0 {
            return Ok(Vec::new());
        }

        // ordering other than relevance needs every match before truncation
        let collect = if spatial.is_some() || !sort.is_empty() {
            (searcher.num_docs() as usize).max(1)
        } else {
            limit
        };
        let top_docs = searcher.search(query, &TopDocs::with_limit(collect))?;

        let mut candidates = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let doc: TantivyDocument = searcher.doc(address)?;
            let distance_km = match spatial {
                Some(filter) => match hit_distance(&doc, filter) {
                    Some(distance) => Some(distance),
                    None => continue,
                },
                None => None,
            };
            candidates.push(Candidate {
                score,
                doc,
                distance_km,
            });
        }

        if !sort.is_empty() {
            let mut keyed = Vec::with_capacity(candidates.len());
            for candidate in candidates {
                let keys = self.sort_keys(&candidate.doc, sort)?;
                keyed.push((keys, candidate));
            }
            keyed.sort_by(|(a_keys, a), (b_keys, b)| {
                compare_keys(a_keys, b_keys, sort).then_with(|| compare_distance(a, b))
            });
            candidates = keyed.into_iter().map(|(_, candidate)| candidate).collect();
        } else if spatial.is_some() {
            candidates.sort_by(compare_distance);
        }

        candidates.truncate(limit);
        Ok(candidates)
    }

    fn sort_keys(
        &self,
        doc: &TantivyDocument,
        sort: &[SortKey],
    ) -> Result<Vec<Option<FieldPayload>>, SearchError> {
        sort.iter()
            .map(|key| {
                let field = self.store.field(&key.field_name)?;
                Ok(stored_payload(doc, field, key.kind))
            })
            .collect()
    }

    fn decode(&self, window: &[Candidate]) -> Result<Vec<SearchHit<T>>, SearchError> {
        let mut hits = Vec::with_capacity(window.len());
        for candidate in window {
            let mut record = doc_to_record(
                &self.schema,
                self.store.schema(),
                self.store.codec(),
                &candidate.doc,
            )?;
            if let Some(distance) = candidate.distance_km {
                record.set_distance(distance);
            }
            hits.push(SearchHit {
                record,
                score: candidate.score,
                distance_km: candidate.distance_km,
            });
        }
        Ok(hits)
    }
}

/// Distance of the document's point from the area center, if inside it.
fn hit_distance(doc: &TantivyDocument, filter: &SpatialFilter) -> Option<f64> {
    let Some(FieldPayload::F64(longitude)) = stored_payload(doc, filter.x, FieldKind::Float) else {
        return None;
    };
    let Some(FieldPayload::F64(latitude)) = stored_payload(doc, filter.y, FieldKind::Float) else {
        return None;
    };
    let point = GeoPoint::new(latitude, longitude);
    filter
        .area
        .contains(&point)
        .then(|| distance_km(&filter.area.center, &point))
}

fn compare_distance(a: &Candidate, b: &Candidate) -> Ordering {
    match (a.distance_km, b.distance_km) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        _ => Ordering::Equal,
    }
}

/// Compare sort keys in order; missing values sort last either way.
fn compare_keys(a: &[Option<FieldPayload>], b: &[Option<FieldPayload>], sort: &[SortKey]) -> Ordering {
    for ((a, b), key) in a.iter().zip(b).zip(sort) {
        let ordering = match (a, b) {
            (Some(a), Some(b)) => {
                let ordering = compare_payloads(a, b);
                if key.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn compare_payloads(a: &FieldPayload, b: &FieldPayload) -> Ordering {
    match (a, b) {
        (FieldPayload::Text(a), FieldPayload::Text(b)) => a.cmp(b),
        (FieldPayload::I64(a), FieldPayload::I64(b)) => a.cmp(b),
        (FieldPayload::U64(a), FieldPayload::U64(b)) => a.cmp(b),
        (FieldPayload::F64(a), FieldPayload::F64(b)) => a.total_cmp(b),
        _ => Ordering::Equal,
    }
}

/// Fluent builder for one search.
pub struct SearchRequest<'a, T> {
    searcher: &'a Searcher<T>,
    clauses: Vec<SearchClause>,
    page: i64,
    page_size: usize,
    sort: Vec<SortOption>,
}

impl<'a, T: Record> SearchRequest<'a, T> {
    fn new(searcher: &'a Searcher<T>) -> Self {
        Self {
            searcher,
            clauses: Vec::new(),
            page: 1,
            page_size: searcher.store.config().page_size,
            sort: Vec::new(),
        }
    }

    /// Add a clause with its own occurrence.
    pub fn clause(mut self, clause: SearchClause) -> Self {
        self.clauses.push(clause);
        self
    }

    pub fn must(self, clause: SearchClause) -> Self {
        self.clause(clause.with_occurrence(Occurrence::Must))
    }

    pub fn should(self, clause: SearchClause) -> Self {
        self.clause(clause.with_occurrence(Occurrence::Should))
    }

    pub fn not(self, clause: SearchClause) -> Self {
        self.clause(clause.with_occurrence(Occurrence::MustNot))
    }

    /// Restrict to an area; a request takes at most one.
    pub fn in_area(self, center: GeoPoint, radius_km: f64) -> Result<Self, QueryCompositionError> {
        if self.clauses.iter().any(SearchClause::is_area) {
            return Err(QueryCompositionError::DuplicateArea);
        }
        Ok(self.clause(SearchClause::in_area(center, radius_km)?))
    }

    /// Exact match on an identity or other raw property.
    pub fn by_id(self, property: &str, value: impl ToString) -> Self {
        self.must(SearchClause::exact(property, value))
    }

    pub fn page(mut self, page: i64) -> Self {
        self.page = page;
        self
    }

    pub fn per_page(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn sort_by(mut self, property: &str, descending: bool) -> Self {
        self.sort.push(SortOption {
            property: property.to_string(),
            descending,
        });
        self
    }

    pub fn run(self) -> Result<ResultPage<T>, SearchError> {
        self.searcher
            .search(&self.clauses, self.page, self.page_size, &self.sort)
    }
}
