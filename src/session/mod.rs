//! The viewer's operations against a [`VectorStore`].
//!
//! Every operation reports its own failures to the console and returns normally,
//! so one bad request never ends the interactive session.

use tracing::debug;

use crate::config::Settings;
use crate::console::{Column, Console, TableView, Tone};
use crate::db::{Metadata, PeekResult, Result, StoreError, VectorStore};

const ELLIPSIS: &str = "...";
const NONE: &str = "None";

/// Outcome of listing collections.
///
/// A failed listing and an empty database are kept apart so callers can tell
/// "nothing there" from "could not ask".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionListing {
    Found(Vec<String>),
    Empty,
    /// The request failed; the error has already been reported.
    Unavailable,
}

impl CollectionListing {
    /// The listed names; empty when the database is empty or the request failed.
    pub fn names(&self) -> &[String] {
        match self {
            CollectionListing::Found(names) => names,
            CollectionListing::Empty | CollectionListing::Unavailable => &[],
        }
    }
}

/// One displayed record of a peek.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewRow {
    pub id: String,
    pub document: String,
    pub metadata: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSummary {
    pub name: String,
    pub count: u64,
    pub metadata: Option<Metadata>,
}

/// How much of a collection to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewOptions {
    pub limit: usize,
    pub document_width: usize,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        PreviewOptions {
            limit: 5,
            document_width: 100,
        }
    }
}

impl From<&Settings> for PreviewOptions {
    fn from(settings: &Settings) -> Self {
        PreviewOptions {
            limit: settings.preview_limit,
            document_width: settings.document_width,
        }
    }
}

pub struct Session<S> {
    store: S,
    preview: PreviewOptions,
}

impl<S: VectorStore> Session<S> {
    pub fn new(store: S) -> Self {
        Session {
            store,
            preview: PreviewOptions::default(),
        }
    }

    pub fn with_preview(mut self, preview: PreviewOptions) -> Self {
        self.preview = preview;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn list_collections(&self, console: &mut dyn Console) -> CollectionListing {
        match self.store.list_collections().await {
            Ok(names) if names.is_empty() => CollectionListing::Empty,
            Ok(names) => CollectionListing::Found(names),
            Err(err) => {
                report(console, "Error listing collections", &err);
                CollectionListing::Unavailable
            }
        }
    }

    /// Shows up to `limit` records of `name` followed by the collection's total size.
    pub async fn peek_collection(&self, console: &mut dyn Console, name: &str, limit: usize) {
        if let Err(err) = self.try_peek(console, name, limit).await {
            report(console, "Error peeking collection", &err);
        }
    }

    async fn try_peek(&self, console: &mut dyn Console, name: &str, limit: usize) -> Result<()> {
        let collection = self.store.get_collection(name).await?;
        let result = self.store.peek(&collection, limit).await?;

        if !result.has_ids() {
            console.message("Collection is empty", Tone::Notice);
            return Ok(());
        }

        let rows = build_preview_rows(&result, limit, self.preview.document_width);
        debug!(collection = name, rows = rows.len(), "peeked collection");
        console.table(&preview_table(name, &rows));

        let total = self.store.count(&collection).await?;
        console.message(&format!("\nTotal items in collection: {}", total), Tone::Info);
        Ok(())
    }

    /// Shows the collection's size and metadata, then a preview of its records.
    pub async fn show_collection_info(&self, console: &mut dyn Console, name: &str) {
        match self.summarize(name).await {
            Ok(summary) => {
                console.table(&summary_table(&summary));
                console.message("\nCollection Preview:", Tone::Info);
                self.peek_collection(console, name, self.preview.limit).await;
            }
            Err(err) => report(console, "Error getting collection info", &err),
        }
    }

    pub async fn summarize(&self, name: &str) -> Result<CollectionSummary> {
        let collection = self.store.get_collection(name).await?;
        let count = self.store.count(&collection).await?;
        Ok(CollectionSummary {
            name: collection.name,
            count,
            metadata: collection.metadata,
        })
    }
}

fn report(console: &mut dyn Console, context: &str, err: &StoreError) {
    debug!(kind = err.kind_label(), error = %err, "{}", context);
    console.message(&format!("{}: {}", context, err), Tone::Error);
}

/// Cuts `text` to `width` characters, marking the cut with an ellipsis.
pub fn truncate_document(text: &str, width: usize) -> String {
    match text.char_indices().nth(width) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}

/// Renders record metadata; missing or empty metadata shows as `None`.
pub fn render_metadata(metadata: Option<&Metadata>) -> String {
    match metadata {
        Some(map) if !map.is_empty() => metadata_json(map),
        _ => NONE.to_string(),
    }
}

/// Renders collection metadata; only missing metadata shows as `None`.
pub fn describe_metadata(metadata: Option<&Metadata>) -> String {
    metadata.map(metadata_json).unwrap_or_else(|| NONE.to_string())
}

fn metadata_json(map: &Metadata) -> String {
    serde_json::Value::Object(map.clone()).to_string()
}

/// Lines up the peeked sequences. Only indices present in all three are shown,
/// and never more than `limit`.
pub fn build_preview_rows(result: &PeekResult, limit: usize, document_width: usize) -> Vec<PreviewRow> {
    let ids = result.ids.as_deref().unwrap_or_default();
    let documents = result.documents.as_deref().unwrap_or_default();
    let metadatas = result.metadatas.as_deref().unwrap_or_default();

    ids.iter()
        .zip(documents)
        .zip(metadatas)
        .take(limit)
        .map(|((id, document), metadata)| PreviewRow {
            id: id.clone(),
            document: document
                .as_deref()
                .map(|doc| truncate_document(doc, document_width))
                .unwrap_or_else(|| NONE.to_string()),
            metadata: render_metadata(metadata.as_ref()),
        })
        .collect()
}

pub fn preview_table(name: &str, rows: &[PreviewRow]) -> TableView {
    let mut table = TableView::new(
        format!("Preview of {}", name),
        vec![
            Column::new("ID", Tone::Accent),
            Column::new("Document", Tone::Success),
            Column::new("Metadata", Tone::Notice),
        ],
    );
    for row in rows {
        table.add_row(vec![row.id.clone(), row.document.clone(), row.metadata.clone()]);
    }
    table
}

pub fn summary_table(summary: &CollectionSummary) -> TableView {
    let mut table = TableView::new(
        format!("Collection: {}", summary.name),
        vec![
            Column::new("Property", Tone::Accent),
            Column::new("Value", Tone::Success),
        ],
    );
    table.add_row(vec!["Number of items".to_string(), summary.count.to_string()]);
    table.add_row(vec![
        "Metadata".to_string(),
        describe_metadata(summary.metadata.as_ref()),
    ]);
    table
}

pub fn collections_table(names: &[String]) -> TableView {
    let mut table = TableView::new(
        "Available Collections",
        vec![Column::new("Collection Name", Tone::Accent)],
    );
    for name in names {
        table.add_row(vec![name.clone()]);
    }
    table
}

#[cfg(test)]
pub(crate) mod testing {
    //! An in-memory store for exercising the session and the menu loop.

    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    use crate::db::{CollectionHandle, Metadata, PeekResult, Result, StoreError, VectorStore};

    #[derive(Default)]
    pub struct FakeStore {
        pub collections: Vec<(CollectionHandle, PeekResult, u64)>,
        pub fail_list: bool,
        pub fail_count: bool,
        pub fail_peek: bool,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeStore {
        pub fn with(mut self, name: &str, result: PeekResult, count: u64) -> Self {
            let handle = CollectionHandle {
                id: format!("id-{}", name),
                name: name.to_string(),
                metadata: None,
            };
            self.collections.push((handle, result, count));
            self
        }

        pub fn with_metadata(mut self, name: &str, metadata: serde_json::Value) -> Self {
            if let Some((handle, _, _)) = self.collections.iter_mut().find(|(h, _, _)| h.name == name) {
                handle.metadata = metadata.as_object().cloned();
            }
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn find(&self, id: &str) -> Result<&(CollectionHandle, PeekResult, u64)> {
            self.collections
                .iter()
                .find(|(h, _, _)| h.id == id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))
        }
    }

    /// The three-record collection used throughout the tests.
    pub fn docs_result() -> PeekResult {
        let meta: Metadata = json!({"k": 1}).as_object().cloned().unwrap();
        PeekResult {
            ids: Some(vec!["a".into(), "b".into(), "c".into()]),
            documents: Some(vec![
                Some("hello".into()),
                Some("world".into()),
                Some("!".into()),
            ]),
            metadatas: Some(vec![Some(meta), None, Some(Metadata::new())]),
        }
    }

    #[async_trait]
    impl VectorStore for FakeStore {
        async fn list_collections(&self) -> Result<Vec<String>> {
            self.record("list_collections".to_string());
            if self.fail_list {
                return Err(StoreError::Connection("connection refused".to_string()));
            }
            Ok(self.collections.iter().map(|(h, _, _)| h.name.clone()).collect())
        }

        async fn get_collection(&self, name: &str) -> Result<CollectionHandle> {
            self.record(format!("get_collection {}", name));
            self.collections
                .iter()
                .find(|(h, _, _)| h.name == name)
                .map(|(h, _, _)| h.clone())
                .ok_or_else(|| StoreError::NotFound(format!("Collection [{}] does not exist", name)))
        }

        async fn peek(&self, collection: &CollectionHandle, limit: usize) -> Result<PeekResult> {
            self.record(format!("peek {} {}", collection.name, limit));
            if self.fail_peek {
                return Err(StoreError::MalformedResponse("expected value".to_string()));
            }
            Ok(self.find(&collection.id)?.1.clone())
        }

        async fn count(&self, collection: &CollectionHandle) -> Result<u64> {
            self.record(format!("count {}", collection.name));
            if self.fail_count {
                return Err(StoreError::Service {
                    status: 500,
                    message: "internal".to_string(),
                });
            }
            Ok(self.find(&collection.id)?.2)
        }
    }
}
