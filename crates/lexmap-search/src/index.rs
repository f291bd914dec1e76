//! Tantivy index management.
//!
//! A [`DocumentStore`] is the store session shared by the indexer and
//! searcher of one record type: the open index, its schema, the registered
//! text analyzer and the field codec.

use std::path::{Path, PathBuf};

use tantivy::schema::{Field, Schema};
use tantivy::tokenizer::TokenStream;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy};
use tracing::{debug, info};

use lexmap_analysis::{register_text_analyzer, AnalyzerKind};
use lexmap_types::Settings;

use crate::codec::FieldCodec;
use crate::document::build_store_schema;
use crate::error::SearchError;
use crate::schema::{Record, RecordSchema};

/// Default memory budget for IndexWriter (50MB)
const DEFAULT_WRITER_MEMORY_MB: usize = 50;

/// Default cap on hits collected per search
const DEFAULT_MAX_RESULTS: usize = 500;

/// Default records per page
const DEFAULT_PAGE_SIZE: usize = 20;

/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Root directory; each record type is stored in `<root>/<index name>`
    pub index_root: PathBuf,
    /// Memory budget for writer in MB
    pub writer_memory_mb: usize,
    /// Analyzer registered for analyzed fields
    pub analyzer: AnalyzerKind,
    /// Upper bound on hits collected by a single search
    pub max_results: usize,
    /// Records per page for requests that do not set one
    pub page_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            index_root: PathBuf::from("./lexmap-indexes"),
            writer_memory_mb: DEFAULT_WRITER_MEMORY_MB,
            analyzer: AnalyzerKind::default(),
            max_results: DEFAULT_MAX_RESULTS,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl StoreConfig {
    pub fn new(index_root: impl Into<PathBuf>) -> Self {
        Self {
            index_root: index_root.into(),
            ..Self::default()
        }
    }

    /// Build from loaded settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, SearchError> {
        Ok(Self {
            index_root: settings.expanded_index_path(),
            writer_memory_mb: settings.writer_memory_mb,
            analyzer: settings.analyzer.parse()?,
            max_results: settings.max_results,
            page_size: settings.page_size,
        })
    }

    pub fn with_memory_mb(mut self, mb: usize) -> Self {
        self.writer_memory_mb = mb;
        self
    }

    pub fn with_analyzer(mut self, analyzer: AnalyzerKind) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }
}

/// An open index for one record type.
#[derive(Clone)]
pub struct DocumentStore {
    index: Index,
    schema: Schema,
    name: String,
    path: PathBuf,
    config: StoreConfig,
    codec: FieldCodec,
}

impl DocumentStore {
    /// Open the record type's index, creating it if needed.
    pub fn open_or_create<T: Record>(
        config: StoreConfig,
        record: &RecordSchema<T>,
    ) -> Result<Self, SearchError> {
        let path = config.index_root.join(record.name());
        let index = if index_exists(&path) {
            debug!(path = ?path, "Opening existing index");
            Index::open_in_dir(&path)?
        } else {
            info!(path = ?path, "Creating new index");
            std::fs::create_dir_all(&path)?;
            Index::create_in_dir(&path, build_store_schema(record))?
        };
        Self::from_index(index, path, config, record)
    }

    /// Open the record type's index; fails if it has not been created.
    pub fn open<T: Record>(config: StoreConfig, record: &RecordSchema<T>) -> Result<Self, SearchError> {
        let path = config.index_root.join(record.name());
        if !index_exists(&path) {
            return Err(SearchError::IndexUnavailable {
                name: record.name().to_string(),
                path: path.display().to_string(),
            });
        }
        let index = Index::open_in_dir(&path)?;
        Self::from_index(index, path, config, record)
    }

    fn from_index<T: Record>(
        index: Index,
        path: PathBuf,
        config: StoreConfig,
        record: &RecordSchema<T>,
    ) -> Result<Self, SearchError> {
        let schema = index.schema();
        for (_, wanted) in build_store_schema(record).fields() {
            let name = wanted.name();
            let field = schema.get_field(name).map_err(|_| {
                SearchError::SchemaMismatch(format!(
                    "index at {} has no field {name}",
                    path.display()
                ))
            })?;
            let found = schema.get_field_entry(field).field_type().value_type();
            let expected = wanted.field_type().value_type();
            if found != expected {
                return Err(SearchError::SchemaMismatch(format!(
                    "field {name} at {} holds {found:?}, {} expects {expected:?}",
                    path.display(),
                    record.name()
                )));
            }
        }

        register_text_analyzer(index.tokenizers(), config.analyzer);
        info!(path = ?path, record = record.name(), analyzer = %config.analyzer, "Opened document store");

        Ok(Self {
            index,
            schema,
            name: record.name().to_string(),
            path,
            config,
            codec: FieldCodec::new(),
        })
    }

    /// Get the underlying Tantivy index
    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn codec(&self) -> &FieldCodec {
        &self.codec
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Index name (the record type's index name)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the index path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the index exists on disk
    pub fn exists(&self) -> bool {
        index_exists(&self.path)
    }

    /// Resolve a document field handle by name.
    pub fn field(&self, name: &str) -> Result<Field, SearchError> {
        self.schema
            .get_field(name)
            .map_err(|_| SearchError::SchemaMismatch(format!("no field {name} in index {}", self.name)))
    }

    /// Create an IndexWriter with configured memory budget
    pub fn writer(&self) -> Result<IndexWriter, SearchError> {
        let memory_budget = self.config.writer_memory_mb * 1024 * 1024;
        let writer = self.index.writer(memory_budget)?;
        debug!(
            memory_mb = self.config.writer_memory_mb,
            "Created index writer"
        );
        Ok(writer)
    }

    /// Create an IndexReader that only reloads on explicit refresh
    pub fn reader(&self) -> Result<IndexReader, SearchError> {
        let reader = self
            .index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        debug!("Created index reader");
        Ok(reader)
    }

    /// Tokens produced by `field`'s analyzer for `text`.
    pub fn analyze(&self, field: Field, text: &str) -> Result<Vec<String>, SearchError> {
        let mut analyzer = self.index.tokenizer_for_field(field)?;
        let mut stream = analyzer.token_stream(text);
        let mut tokens = Vec::new();
        while stream.advance() {
            tokens.push(stream.token().text.clone());
        }
        Ok(tokens)
    }
}

/// True if `path` holds a committed index.
pub fn index_exists(path: &Path) -> bool {
    path.join("meta.json").exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{resolve, SchemaBuilder};
    use tempfile::TempDir;

    #[derive(Debug, Default)]
    struct Note {
        body: String,
        code: String,
    }

    impl Record for Note {
        fn describe(schema: &mut SchemaBuilder<Self>) {
            schema
                .analyzed("body", |n| &n.body, |n| &mut n.body)
                .field("code", |n| &n.code, |n| &mut n.code);
        }
    }

    #[derive(Debug, Default)]
    struct Renamed {
        title: String,
    }

    impl Record for Renamed {
        fn describe(schema: &mut SchemaBuilder<Self>) {
            schema.field("title", |r| &r.title, |r| &mut r.title);
        }

        fn index_name() -> String {
            "Note".to_string()
        }
    }

    #[test]
    fn test_create_new_index() {
        let temp_dir = TempDir::new().unwrap();
        let schema = resolve::<Note>().unwrap();
        let store = DocumentStore::open_or_create(StoreConfig::new(temp_dir.path()), &schema).unwrap();
        assert!(store.exists());
        assert_eq!(store.path(), temp_dir.path().join("Note"));
    }

    #[test]
    fn test_reopen_existing_index() {
        let temp_dir = TempDir::new().unwrap();
        let schema = resolve::<Note>().unwrap();
        let config = StoreConfig::new(temp_dir.path());

        let _first = DocumentStore::open_or_create(config.clone(), &schema).unwrap();
        let second = DocumentStore::open(config, &schema).unwrap();
        assert!(second.exists());
    }

    #[test]
    fn test_open_missing_index_is_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let schema = resolve::<Note>().unwrap();
        let result = DocumentStore::open(StoreConfig::new(temp_dir.path()), &schema);
        assert!(matches!(result, Err(SearchError::IndexUnavailable { .. })));
    }

    #[test]
    fn test_schema_mismatch_on_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig::new(temp_dir.path());
        let note = resolve::<Note>().unwrap();
        let _store = DocumentStore::open_or_create(config.clone(), &note).unwrap();

        let renamed = resolve::<Renamed>().unwrap();
        let result = DocumentStore::open(config, &renamed);
        assert!(matches!(result, Err(SearchError::SchemaMismatch(_))));
    }

    #[derive(Debug, Default)]
    struct Retyped {
        body: String,
        code: i64,
    }

    impl Record for Retyped {
        fn describe(schema: &mut SchemaBuilder<Self>) {
            schema
                .analyzed("body", |r| &r.body, |r| &mut r.body)
                .field("code", |r| &r.code, |r| &mut r.code);
        }

        fn index_name() -> String {
            "Note".to_string()
        }
    }

    #[test]
    fn test_field_type_change_on_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig::new(temp_dir.path());
        let note = resolve::<Note>().unwrap();
        let _store = DocumentStore::open_or_create(config.clone(), &note).unwrap();

        let retyped = resolve::<Retyped>().unwrap();
        match DocumentStore::open(config.clone(), &retyped) {
            Err(SearchError::SchemaMismatch(msg)) => assert!(msg.contains("code"), "{msg}"),
            other => panic!("expected SchemaMismatch, got {:?}", other.map(|s| s.path().to_path_buf())),
        }
        assert!(matches!(
            DocumentStore::open_or_create(config, &retyped),
            Err(SearchError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_create_writer_and_reader() {
        let temp_dir = TempDir::new().unwrap();
        let schema = resolve::<Note>().unwrap();
        let store = DocumentStore::open_or_create(StoreConfig::new(temp_dir.path()), &schema).unwrap();

        let _writer = store.writer().unwrap();
        let _reader = store.reader().unwrap();
    }

    #[test]
    fn test_analyze_uses_registered_analyzer() {
        let temp_dir = TempDir::new().unwrap();
        let schema = resolve::<Note>().unwrap();
        let store = DocumentStore::open_or_create(StoreConfig::new(temp_dir.path()), &schema).unwrap();

        let body = store.field("body-analysis").unwrap();
        assert_eq!(store.analyze(body, "Το Αυτοκίνητο").unwrap(), vec!["το", "αφτοκινιτο"]);

        // raw fields keep the whole value as one token
        let code = store.field("code").unwrap();
        assert_eq!(store.analyze(code, "AB-12 x").unwrap(), vec!["AB-12 x"]);
    }

    #[test]
    fn test_config_builders() {
        let config = StoreConfig::new("/tmp/test")
            .with_memory_mb(100)
            .with_max_results(10)
            .with_page_size(5)
            .with_analyzer(AnalyzerKind::Standard);
        assert_eq!(config.writer_memory_mb, 100);
        assert_eq!(config.max_results, 10);
        assert_eq!(config.page_size, 5);
        assert_eq!(config.analyzer, AnalyzerKind::Standard);
    }

    #[test]
    fn test_config_from_settings() {
        let settings = Settings {
            index_path: "/srv/lexmap".to_string(),
            analyzer: "en".to_string(),
            ..Settings::default()
        };
        let config = StoreConfig::from_settings(&settings).unwrap();
        assert_eq!(config.index_root, PathBuf::from("/srv/lexmap"));
        assert!(matches!(config.analyzer, AnalyzerKind::Stemmed(_)));

        let bad = Settings {
            analyzer: "klingon".to_string(),
            ..Settings::default()
        };
        assert!(matches!(
            StoreConfig::from_settings(&bad),
            Err(SearchError::Analysis(_))
        ));
    }
}
