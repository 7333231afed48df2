//! pipeline.rs — One request, start to finish.
//!
//! text → phrase → query (model) → rows (store) → either a bare scalar, or a
//! display pivot plus recap sentences and a narrative (model). Runs
//! synchronously; the HTTP layer puts it on a blocking worker.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::config::AppConfig;
use crate::error::{LlmError, PipelineError};
use crate::extract::{preprocess_input, LocationTable};
use crate::llm::{strip_code_fences, ChatClient, TextCompletion};
use crate::logging::{backend_info, backend_warn};
use crate::pivot::{build_pivot, collapse_for_display, DisplayPivotTable};
use crate::query_schema::PIVOT_COLUMNS;
use crate::recap::{aggregate_recap, recap_text};
use crate::store::{DataStore, QueryExecutor, SqliteStore};
use crate::synthesis::{NarrativeSynthesizer, QuerySynthesizer};

#[derive(Debug, Clone, Serialize)]
pub struct TableReport {
    pub query: String,
    pub record_count: usize,
    pub display: DisplayPivotTable,
    pub recap: Vec<String>,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// Single-cell result such as a COUNT; no pivot, no narrative.
    Scalar { query: String, value: Value },
    Table(TableReport),
}

pub struct Pipeline {
    locations: LocationTable,
    query: QuerySynthesizer,
    executor: QueryExecutor,
    narrative: NarrativeSynthesizer,
}

impl Pipeline {
    pub fn new(
        locations: LocationTable,
        query_model: Arc<dyn TextCompletion>,
        summary_model: Arc<dyn TextCompletion>,
        store: Box<dyn DataStore>,
        table: &str,
        narrative_language: &str,
    ) -> Self {
        Self {
            locations,
            query: QuerySynthesizer::new(query_model, table),
            executor: QueryExecutor::new(store),
            narrative: NarrativeSynthesizer::new(summary_model, narrative_language),
        }
    }

    /// Wire up the OpenRouter clients and the SQLite store from config.
    pub fn from_config(cfg: &AppConfig) -> Result<Self, LlmError> {
        let query_model = Arc::new(ChatClient::new(&cfg.llm, &cfg.llm.query_model)?);
        let summary_model = Arc::new(ChatClient::new(&cfg.llm, &cfg.llm.summary_model)?);
        let store = SqliteStore::new(&cfg.database.path);
        let locations = LocationTable::new(&cfg.locations);
        if locations.is_empty() {
            backend_warn("No locations configured; every question uses the raw-text LOKASI filter");
        }
        backend_info(format!(
            "Pipeline ready (db={}, table={}, locations={})",
            store.path(),
            cfg.database.table,
            locations.len()
        ));
        Ok(Self::new(
            locations,
            query_model,
            summary_model,
            Box::new(store),
            &cfg.database.table,
            &cfg.llm.narrative_language,
        ))
    }

    /// Normalized phrase only; no model or store calls.
    pub fn phrase(&self, message: &str) -> String {
        preprocess_input(&self.locations, message)
    }

    pub fn run(&self, message: &str) -> Result<PipelineOutcome, PipelineError> {
        if message.trim().is_empty() {
            return Err(PipelineError::MissingMessage);
        }

        let phrase = self.phrase(message);
        backend_info(format!("Normalized phrase: {}", phrase));

        let raw = self.query.generate_query(&phrase)?;
        let sql = strip_code_fences(&raw);
        if sql.is_empty() {
            return Err(PipelineError::NoValidQuery { raw });
        }
        backend_info(format!("SQL_Query: {}", sql));

        let rows = self.executor.generate_table(&sql).ok_or(PipelineError::NoResults)?;

        if let Some(value) = rows.scalar() {
            backend_info(format!("Scalar result: {}", value));
            return Ok(PipelineOutcome::Scalar { query: sql, value: value.clone() });
        }

        let missing = rows.missing_columns(&PIVOT_COLUMNS);
        if !missing.is_empty() {
            return Err(PipelineError::MalformedRecords {
                missing: missing.into_iter().map(String::from).collect(),
            });
        }

        let records = rows.to_records();
        let pivot = build_pivot(&records);
        let display = collapse_for_display(&pivot);
        backend_info(format!(
            "Pivot built: {} row(s) x {} column(s), {} container(s)",
            pivot.rows.len(),
            pivot.columns.len(),
            pivot.total()
        ));

        let recap = aggregate_recap(&records);
        let text = recap_text(&recap);
        backend_info(format!("Recap: {}", text));
        let summary = self.narrative.generate_summary(&text)?;

        Ok(PipelineOutcome::Table(TableReport {
            query: sql,
            record_count: records.len(),
            display,
            recap,
            summary,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_locations;
    use crate::error::StoreError;
    use crate::record::QueryRows;
    use serde_json::json;
    use std::sync::Mutex;

    struct Scripted {
        answer: String,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(answer: &str) -> Arc<Self> {
            Arc::new(Self { answer: answer.into(), prompts: Mutex::new(Vec::new()) })
        }
    }

    impl TextCompletion for Scripted {
        fn complete(&self, _system: &str, user: &str) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(user.to_string());
            Ok(self.answer.clone())
        }
    }

    struct FixedStore(Result<QueryRows, ()>);

    impl DataStore for FixedStore {
        fn run_query(&self, sql: &str) -> Result<QueryRows, StoreError> {
            self.0.clone().map_err(|_| StoreError::Query {
                query: sql.to_string(),
                source: rusqlite::Error::QueryReturnedNoRows,
            })
        }
    }

    fn rows(columns: &[&str], data: Vec<Vec<Value>>) -> QueryRows {
        QueryRows::new(columns.iter().map(|c| c.to_string()).collect(), data)
    }

    fn pipeline(query: Arc<Scripted>, summary: Arc<Scripted>, store: FixedStore) -> Pipeline {
        Pipeline::new(
            LocationTable::new(&default_locations()),
            query,
            summary,
            Box::new(store),
            "data_all",
            "Indonesian",
        )
    }

    fn three_records() -> QueryRows {
        rows(
            &["STATE", "CONTAINER", "TYPE", "LOKASI", "CONTAINER GRADE"],
            vec![
                vec![json!("AV"), json!("TGHU1"), json!("20"), json!("TANJUNG PRIOK"), json!("A")],
                vec![json!("AV"), json!("TGHU2"), json!("20"), json!("JAKARTA UTARA"), json!("A")],
                vec![json!("AV"), json!("TGHU3"), json!("20"), json!("TANJUNG PRIOK"), json!("B")],
            ],
        )
    }

    #[test]
    fn test_empty_message_never_calls_model() {
        let query = Scripted::new("SELECT 1");
        let p = pipeline(query.clone(), Scripted::new(""), FixedStore(Ok(three_records())));
        assert!(matches!(p.run("   "), Err(PipelineError::MissingMessage)));
        assert!(query.prompts.lock().unwrap().is_empty());
    }

    #[test]
    fn test_table_outcome() {
        let query = Scripted::new("```sql\nSELECT * FROM data_all\n```");
        let summary = Scripted::new("<p>ringkasan</p>");
        let p = pipeline(query.clone(), summary.clone(), FixedStore(Ok(three_records())));

        let outcome = p.run("Tampilkan data Jakarta tanggal 01/03/2024").unwrap();
        let PipelineOutcome::Table(report) = outcome else { panic!("expected table") };

        assert_eq!(report.query, "SELECT * FROM data_all");
        assert_eq!(report.record_count, 3);
        assert_eq!(report.display.rows.len(), 2);
        assert_eq!(report.summary, "<p>ringkasan</p>");
        assert_eq!(report.recap.len(), 2);

        let sent = query.prompts.lock().unwrap();
        assert!(sent[0].contains("'JAKARTA UTARA' & 'TANJUNG PRIOK' dan 'TGL. STATUS' = 01/03/2024"));
        let recap_prompt = &summary.prompts.lock().unwrap()[0];
        assert!(recap_prompt.starts_with("At TANJUNG PRIOK, JAKARTA UTARA, there are 2 containers"));
    }

    #[test]
    fn test_scalar_outcome_skips_narrative() {
        let summary = Scripted::new("unused");
        let store = FixedStore(Ok(rows(&["COUNT(CONTAINER)"], vec![vec![json!(17)]])));
        let p = pipeline(Scripted::new("SELECT COUNT(CONTAINER) FROM data_all"), summary.clone(), store);

        match p.run("berapa kontainer di AMBON").unwrap() {
            PipelineOutcome::Scalar { value, .. } => assert_eq!(value, json!(17)),
            other => panic!("expected scalar, got {:?}", other),
        }
        assert!(summary.prompts.lock().unwrap().is_empty());
    }

    #[test]
    fn test_blank_model_answer_is_no_valid_query() {
        let p = pipeline(Scripted::new("```sql\n```"), Scripted::new(""), FixedStore(Ok(three_records())));
        match p.run("AMBON") {
            Err(PipelineError::NoValidQuery { raw }) => assert_eq!(raw, "```sql\n```"),
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_store_error_and_empty_set_both_no_results() {
        let failing = pipeline(Scripted::new("SELECT x"), Scripted::new(""), FixedStore(Err(())));
        assert!(matches!(failing.run("AMBON"), Err(PipelineError::NoResults)));

        let empty = pipeline(
            Scripted::new("SELECT x"),
            Scripted::new(""),
            FixedStore(Ok(rows(&["LOKASI"], vec![]))),
        );
        assert!(matches!(empty.run("AMBON"), Err(PipelineError::NoResults)));
    }

    #[test]
    fn test_row_shaped_result_without_pivot_columns_is_malformed() {
        let store = FixedStore(Ok(rows(
            &["CONTAINER", "OWNER"],
            vec![vec![json!("A1"), json!("MSK")], vec![json!("A2"), json!("MSK")]],
        )));
        let p = pipeline(Scripted::new("SELECT CONTAINER, OWNER FROM data_all"), Scripted::new(""), store);
        match p.run("AMBON") {
            Err(PipelineError::MalformedRecords { missing }) => {
                assert_eq!(missing, vec!["LOKASI", "STATE", "TYPE", "CONTAINER GRADE"])
            }
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_phrase_fallback() {
        let p = pipeline(Scripted::new(""), Scripted::new(""), FixedStore(Err(())));
        assert_eq!(p.phrase("kontainer rusak"), "tampilkan data di 'LOKASI' = kontainer rusak");
    }
}
