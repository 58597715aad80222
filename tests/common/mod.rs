#![allow(dead_code)]

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use pdf_rag_chatbot::{
    CompletionRequest, Document, DocumentLoader, Embedder, EmbeddingVector, LanguageModel,
    RagError, RagResult,
};

pub const DIM: usize = 384;

/// Bag-of-words embedder: each word bumps one hashed component.
pub struct HashEmbedder {
    pub dimension: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self { dimension: DIM }
    }
}

impl Embedder for HashEmbedder {
    fn embed(&self, texts: &[String]) -> RagResult<Vec<EmbeddingVector>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0.0_f32; self.dimension];
                for word in words(text) {
                    let mut hasher = DefaultHasher::new();
                    word.hash(&mut hasher);
                    v[(hasher.finish() % self.dimension as u64) as usize] += 1.0;
                }
                v
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
}

/// Serves fixed documents regardless of the directory asked for.
pub struct StaticLoader(pub Vec<Document>);

impl DocumentLoader for StaticLoader {
    fn load(&self, _dir: &Path) -> RagResult<Vec<Document>> {
        Ok(self.0.clone())
    }
}

pub struct FailingLoader;

impl DocumentLoader for FailingLoader {
    fn load(&self, dir: &Path) -> RagResult<Vec<Document>> {
        Err(RagError::io(
            dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such directory"),
        ))
    }
}

/// Answers from the system prompt: says it doesn't know unless the
/// question's last word appears in the supplied context.
#[derive(Default)]
pub struct ScriptedModel {
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub fn last_request(&self) -> CompletionRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("model was never called")
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, request: &CompletionRequest) -> RagResult<String> {
        self.requests.lock().unwrap().push(request.clone());
        let topic = words(&request.user).last().unwrap_or_default();
        let context = request.system.to_lowercase();
        if !topic.is_empty() && context.contains(&format!("{topic} ")) {
            Ok(format!("According to the documents, {topic} is covered."))
        } else {
            Ok("I don't know.".to_string())
        }
    }
}

pub struct FailingModel;

#[async_trait]
impl LanguageModel for FailingModel {
    async fn complete(&self, _request: &CompletionRequest) -> RagResult<String> {
        Err(RagError::Llm("connection refused".into()))
    }
}

/// Builds a one-page PDF whose page dictionary carries `page_entries`
/// (for example `/MediaBox [0 0 612 792]`) and draws `text` in Helvetica.
pub fn one_page_pdf(page_entries: &str, text: &str) -> Vec<u8> {
    let content = format!("BT /F1 12 Tf 72 712 Td ({text}) Tj ET");
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        format!(
            "<< /Type /Page /Parent 2 0 R {page_entries} \
             /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>"
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
        format!(
            "<< /Length {} >>\nstream\n{content}\nendstream",
            content.len()
        ),
    ];

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
    }

    let xref = pdf.len();
    let mut tail = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        tail.push_str(&format!("{offset:010} 00000 n \n"));
    }
    tail.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
        objects.len() + 1
    ));
    pdf.extend_from_slice(tail.as_bytes());
    pdf
}

pub const MEDIA_BOX: &str = "/MediaBox [0 0 612 792]";
