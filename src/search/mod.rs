//! Full-text index over task text.
//!
//! SQLite stays authoritative. The index is rebuilt at startup and every task
//! or comment write is pushed through [`SearchIndex::apply`], which commits and
//! reloads before returning so a search issued afterwards sees the change.

use std::path::Path;

use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, Schema, Value, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::Mutex;

use crate::db::TaskSearchText;
use crate::errors::AppError;

const WRITER_HEAP_BYTES: usize = 32 * 1024 * 1024;

const TASK_ID: &str = "task_id";
const TITLE: &str = "title";
const DESCRIPTION: &str = "description";
const COMMENTS: &str = "comments";

/// Relative weight of a match in each text field.
const FIELD_WEIGHTS: [(&str, f32); 3] = [(TITLE, 4.0), (DESCRIPTION, 2.0), (COMMENTS, 1.0)];

/// A mutation of the index.
#[derive(Debug, Clone)]
pub enum IndexChange {
    /// Drop every document and index these instead.
    Reset(Vec<TaskSearchText>),
    /// Index a task, replacing any earlier document for it.
    Upsert(TaskSearchText),
    Remove(Vec<String>),
}

/// A matching task and its relevance score.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub task_id: String,
    pub score: f32,
}

pub struct SearchIndex {
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    parser: QueryParser,
    task_id: Field,
    title: Field,
    description: Field,
    comments: Field,
}

fn task_schema() -> Schema {
    let mut builder = Schema::builder();
    builder.add_text_field(TASK_ID, STRING | STORED);
    for (name, _) in FIELD_WEIGHTS {
        builder.add_text_field(name, TEXT);
    }
    builder.build()
}

impl SearchIndex {
    /// Open the index stored under `index_path`, creating it when absent.
    pub fn open(index_path: &Path) -> Result<Self, AppError> {
        std::fs::create_dir_all(index_path)
            .map_err(|e| AppError::Search(format!("Failed to create index directory: {}", e)))?;
        let directory = MmapDirectory::open(index_path)
            .map_err(|e| AppError::Search(format!("Failed to open index directory: {}", e)))?;
        let index = Index::open_or_create(directory, task_schema())?;

        let schema = index.schema();
        let title = schema.get_field(TITLE)?;
        let description = schema.get_field(DESCRIPTION)?;
        let comments = schema.get_field(COMMENTS)?;

        let mut parser = QueryParser::for_index(&index, vec![title, description, comments]);
        for (name, weight) in FIELD_WEIGHTS {
            parser.set_field_boost(schema.get_field(name)?, weight);
        }

        let reader: IndexReader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        let writer: IndexWriter = index.writer_with_num_threads(1, WRITER_HEAP_BYTES)?;

        Ok(Self {
            reader,
            writer: Mutex::new(writer),
            parser,
            task_id: schema.get_field(TASK_ID)?,
            title,
            description,
            comments,
        })
    }

    /// Apply one change and make it visible to searches.
    pub async fn apply(&self, change: IndexChange) -> Result<(), AppError> {
        let mut writer = self.writer.lock().await;

        match &change {
            IndexChange::Reset(tasks) => {
                writer.delete_all_documents()?;
                for task in tasks {
                    writer.add_document(self.document(task))?;
                }
            }
            IndexChange::Upsert(task) => {
                writer.delete_term(self.id_term(&task.task_id));
                writer.add_document(self.document(task))?;
            }
            IndexChange::Remove(task_ids) if task_ids.is_empty() => return Ok(()),
            IndexChange::Remove(task_ids) => {
                for task_id in task_ids {
                    writer.delete_term(self.id_term(task_id));
                }
            }
        }

        writer.commit()?;
        self.reader.reload()?;

        if let IndexChange::Reset(tasks) = &change {
            tracing::info!(documents = tasks.len(), "Search index rebuilt");
        }
        Ok(())
    }

    /// The best `limit` matches for `query`, highest score first.
    ///
    /// Malformed query syntax is tolerated: the parts that parse are searched
    /// and the rest is ignored. Callers filter the hits by visibility.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, AppError> {
        if query.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let (parsed, errors) = self.parser.parse_query_lenient(query);
        if !errors.is_empty() {
            tracing::debug!(errors = errors.len(), "Search query partially ignored");
        }

        let searcher = self.reader.searcher();
        let top_docs = searcher.search(&parsed, &TopDocs::with_limit(limit))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let document: TantivyDocument = searcher.doc(address)?;
            if let Some(task_id) = document.get_first(self.task_id).and_then(|v| v.as_str()) {
                hits.push(SearchHit {
                    task_id: task_id.to_string(),
                    score,
                });
            }
        }
        Ok(hits)
    }

    fn id_term(&self, task_id: &str) -> Term {
        Term::from_field_text(self.task_id, task_id)
    }

    fn document(&self, task: &TaskSearchText) -> TantivyDocument {
        doc!(
            self.task_id => task.task_id.clone(),
            self.title => task.title.clone(),
            self.description => task.description.clone(),
            self.comments => task.comments.clone()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn task(id: &str, title: &str, description: &str, comments: &str) -> TaskSearchText {
        TaskSearchText {
            task_id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            comments: comments.to_string(),
        }
    }

    fn ids(hits: &[SearchHit]) -> Vec<&str> {
        hits.iter().map(|hit| hit.task_id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_field_weights_order_hits() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open(temp_dir.path()).unwrap();

        index
            .apply(IndexChange::Reset(vec![
                task("comment", "Landing page", "Hero copy", "mention the deploy date"),
                task("title", "Deploy pipeline", "Set up CI", "staging first"),
                task("description", "Release", "Deploy after review", ""),
            ]))
            .await
            .unwrap();

        let hits = index.search("deploy", 10).unwrap();
        assert_eq!(ids(&hits), vec!["title", "description", "comment"]);
        assert!(hits[0].score > hits[2].score);
    }

    #[tokio::test]
    async fn test_upsert_replaces_and_remove_drops() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open(temp_dir.path()).unwrap();

        index.apply(IndexChange::Upsert(task("1", "Old title", "", ""))).await.unwrap();
        index.apply(IndexChange::Upsert(task("1", "Renamed card", "", ""))).await.unwrap();

        assert!(index.search("old", 10).unwrap().is_empty());
        assert_eq!(ids(&index.search("renamed", 10).unwrap()), vec!["1"]);

        index.apply(IndexChange::Remove(Vec::new())).await.unwrap();
        assert_eq!(index.search("renamed", 10).unwrap().len(), 1);

        index.apply(IndexChange::Remove(vec!["1".to_string()])).await.unwrap();
        assert!(index.search("renamed", 10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_queries_do_not_fail() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open(temp_dir.path()).unwrap();
        index
            .apply(IndexChange::Upsert(task("1", "Deploy pipeline", "", "")))
            .await
            .unwrap();

        for query in ["deploy (", "title:", "\"unterminated", "AND OR", "nosuchfield:deploy"] {
            assert!(index.search(query, 10).is_ok(), "query {:?} failed", query);
        }
        assert_eq!(ids(&index.search("pipeline", 10).unwrap()), vec!["1"]);
    }

    #[tokio::test]
    async fn test_reopen_keeps_documents() {
        let temp_dir = TempDir::new().unwrap();
        {
            let index = SearchIndex::open(temp_dir.path()).unwrap();
            index
                .apply(IndexChange::Reset(vec![task("1", "Quarterly report", "", "")]))
                .await
                .unwrap();
        }

        let index = SearchIndex::open(temp_dir.path()).unwrap();
        assert_eq!(ids(&index.search("quarterly", 10).unwrap()), vec!["1"]);
    }

    #[tokio::test]
    async fn test_blank_query_or_zero_limit_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open(temp_dir.path()).unwrap();
        index
            .apply(IndexChange::Upsert(task("1", "Anything", "", "")))
            .await
            .unwrap();

        assert!(index.search("   ", 10).unwrap().is_empty());
        assert!(index.search("anything", 0).unwrap().is_empty());
    }
}
