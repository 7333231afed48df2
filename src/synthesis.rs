//! Model-backed stages: phrase → query text, recap → HTML narrative.
//!
//! Both are thin wrappers around [`TextCompletion`] with fixed prompts.
//! Neither inspects or repairs what the model returns.

use std::sync::Arc;

use crate::error::LlmError;
use crate::llm::TextCompletion;
use crate::logging::backend_info;
use crate::query_schema::{
    build_query_system_prompt, build_query_user_prompt, build_summary_system_prompt,
    build_summary_user_prompt,
};

pub struct QuerySynthesizer {
    model: Arc<dyn TextCompletion>,
    system_prompt: String,
}

impl QuerySynthesizer {
    pub fn new(model: Arc<dyn TextCompletion>, table: &str) -> Self {
        Self { model, system_prompt: build_query_system_prompt(table) }
    }

    /// Raw model answer for the normalized phrase. Code fences, if any, are
    /// still present; the caller strips them.
    pub fn generate_query(&self, phrase: &str) -> Result<String, LlmError> {
        let raw = self.model.complete(&self.system_prompt, &build_query_user_prompt(phrase))?;
        backend_info(format!("Query model answered ({} chars)", raw.len()));
        Ok(raw)
    }
}

pub struct NarrativeSynthesizer {
    model: Arc<dyn TextCompletion>,
    system_prompt: String,
}

impl NarrativeSynthesizer {
    pub fn new(model: Arc<dyn TextCompletion>, language: &str) -> Self {
        Self { model, system_prompt: build_summary_system_prompt(language) }
    }

    /// HTML paragraph(s) summarizing the recap, passed through unchanged.
    pub fn generate_summary(&self, recap_text: &str) -> Result<String, LlmError> {
        self.model.complete(&self.system_prompt, &build_summary_user_prompt(recap_text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recording {
        answer: String,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl TextCompletion for Recording {
        fn complete(&self, system_prompt: &str, user_text: &str) -> Result<String, LlmError> {
            self.calls
                .lock()
                .unwrap()
                .push((system_prompt.to_string(), user_text.to_string()));
            Ok(self.answer.clone())
        }
    }

    fn recording(answer: &str) -> Arc<Recording> {
        Arc::new(Recording { answer: answer.into(), calls: Mutex::new(Vec::new()) })
    }

    #[test]
    fn test_generate_query_returns_raw_answer() {
        let model = recording("```sql\nSELECT 1\n```");
        let synth = QuerySynthesizer::new(model.clone(), "data_all");
        assert_eq!(synth.generate_query("Tampilkan data").unwrap(), "```sql\nSELECT 1\n```");

        let calls = model.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.contains("'data_all'"));
        assert!(calls[0].1.starts_with("input:\nTampilkan data\n"));
    }

    #[test]
    fn test_generate_summary_passes_markup_through() {
        let model = recording("<p>unclosed");
        let synth = NarrativeSynthesizer::new(model.clone(), "Indonesian");
        assert_eq!(synth.generate_summary("At X, there are 1 containers").unwrap(), "<p>unclosed");
        assert!(model.calls.lock().unwrap()[0].1.starts_with("At X, there are 1 containers\n"));
    }

    #[test]
    fn test_errors_propagate() {
        struct Failing;
        impl TextCompletion for Failing {
            fn complete(&self, _: &str, _: &str) -> Result<String, LlmError> {
                Err(LlmError::EmptyChoice)
            }
        }
        let synth = QuerySynthesizer::new(Arc::new(Failing), "data_all");
        assert!(matches!(synth.generate_query("x"), Err(LlmError::EmptyChoice)));
    }
}
