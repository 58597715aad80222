use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::document::ScoredRecord;

const SYSTEM_PROMPT: &str = "You are an assistant for question-answering tasks.
Use the following pieces of retrieved context to answer the question.
If you don't know the answer, say that you don't know.

";

const CONCISE_INSTRUCTION: &str = "Use three sentences maximum and keep the answer concise.";
const DETAILED_INSTRUCTION: &str = "Provide a detailed explanation with supporting information.";

/// Answer style. Only changes the instruction text, never retrieval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    #[default]
    Concise,
    Detailed,
}

impl ChatMode {
    fn instruction(self) -> &'static str {
        match self {
            ChatMode::Concise => CONCISE_INSTRUCTION,
            ChatMode::Detailed => DETAILED_INSTRUCTION,
        }
    }
}

/// Retrieved chunk texts in retrieval order, separated by blank lines.
pub fn render_context(records: &[ScoredRecord]) -> String {
    records
        .iter()
        .map(|r| r.metadata.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn system_prompt(context: &str, mode: ChatMode) -> String {
    format!("{SYSTEM_PROMPT}{context}\n{}", mode.instruction())
}
