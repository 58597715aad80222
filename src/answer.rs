//! Query/answer service: embed the question, retrieve context, ask the
//! language model.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};

use crate::config::validate_temperature;
use crate::document::ScoredRecord;
use crate::embedding::{embed_query, Embedder};
use crate::error::{RagError, RagResult};
use crate::llm::{CompletionRequest, LanguageModel};
use crate::prompt::{render_context, system_prompt, ChatMode};
use crate::session::{ChatSession, Role};
use crate::vector_index::VectorIndex;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnswerOptions {
    pub temperature: f32,
    pub mode: ChatMode,
}

impl Default for AnswerOptions {
    fn default() -> Self {
        Self {
            temperature: crate::config::DEFAULT_TEMPERATURE,
            mode: ChatMode::Concise,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<ScoredRecord>,
}

pub struct AnswerService {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    llm: Arc<dyn LanguageModel>,
    index_name: String,
    top_k: usize,
}

impl AnswerService {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn LanguageModel>,
        index_name: impl Into<String>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            llm,
            index_name: index_name.into(),
            top_k: top_k.max(1),
        }
    }

    /// Answers one question. An empty index is not special-cased: the model
    /// receives an empty context and is instructed to say it doesn't know.
    pub async fn answer(&self, question: &str, options: AnswerOptions) -> RagResult<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::InvalidInput("question must not be empty".into()));
        }
        validate_temperature(options.temperature)?;

        let vector = embed_query(self.embedder.as_ref(), question)?;
        let sources = self
            .index
            .query(&self.index_name, &vector, self.top_k)
            .await?;
        info!(retrieved = sources.len(), mode = ?options.mode, "retrieved context");

        let request = CompletionRequest {
            system: system_prompt(&render_context(&sources), options.mode),
            user: question.to_string(),
            temperature: options.temperature,
        };
        let answer = self.llm.complete(&request).await?;
        Ok(Answer { answer, sources })
    }

    /// Runs one chat turn against `session`. The question and answer are
    /// appended on success; on failure the history is left as it was.
    pub async fn handle_turn(
        &self,
        session: &mut ChatSession,
        question: &str,
        options: AnswerOptions,
    ) -> RagResult<Answer> {
        session.push(Role::User, question.trim());
        match self.answer(question, options).await {
            Ok(answer) => {
                session.push(Role::Assistant, answer.answer.clone());
                Ok(answer)
            }
            Err(err) => {
                error!(error = %err, "failed to answer question");
                session.discard_pending_question();
                Err(err)
            }
        }
    }
}
