mod common;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use common::{FailingModel, HashEmbedder, ScriptedModel, DIM};
use pdf_rag_chatbot::server::{self, AppState, ChatRequest};
use pdf_rag_chatbot::{
    Answer, AnswerOptions, AnswerService, ChatMode, ChatSession, Chunk, Embedder, InMemoryIndex,
    IndexRecord, LanguageModel, Metric, RagError, Role, VectorIndex,
};

const INDEX: &str = "medicalchatbot";

async fn index_with(texts: &[&str]) -> Arc<InMemoryIndex> {
    let index = Arc::new(InMemoryIndex::new());
    index.ensure_index(INDEX, DIM, Metric::Cosine).await.unwrap();
    let embedder = HashEmbedder::default();
    let records = texts
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let chunk = Chunk {
                text: text.to_string(),
                source_path: "data/medical_book.pdf".into(),
                chunk_index: i,
                start_offset: 0,
            };
            let vector = embedder.embed(&[chunk.text.clone()]).unwrap().remove(0);
            IndexRecord::from_chunk(&chunk, vector)
        })
        .collect();
    index.upsert(INDEX, records).await.unwrap();
    index
}

fn service(index: Arc<InMemoryIndex>, llm: Arc<dyn LanguageModel>) -> AnswerService {
    AnswerService::new(Arc::new(HashEmbedder::default()), index, llm, INDEX, 3)
}

#[tokio::test]
async fn empty_index_yields_a_disclaimer_not_an_error() {
    let llm = Arc::new(ScriptedModel::default());
    let service = service(index_with(&[]).await, llm.clone());

    let answer = service
        .answer("What causes anemia?", AnswerOptions::default())
        .await
        .unwrap();
    assert!(answer.sources.is_empty());
    assert!(answer.answer.contains("don't know"));

    let request = llm.last_request();
    assert!(request.system.contains("say that you don't know"));
    assert_eq!(request.user, "What causes anemia?");
}

#[tokio::test]
async fn top_k_is_capped_by_index_size() {
    let llm = Arc::new(ScriptedModel::default());
    let index = index_with(&["Anemia is a lack of healthy red blood cells. "]).await;
    let service = service(index, llm.clone());

    let answer = service
        .answer("Tell me about anemia", AnswerOptions::default())
        .await
        .unwrap();
    assert_eq!(answer.sources.len(), 1);
    assert!(answer.answer.contains("anemia"));
    assert!(llm.last_request().system.contains("red blood cells"));
}

#[tokio::test]
async fn most_relevant_chunk_comes_first() {
    let llm = Arc::new(ScriptedModel::default());
    let index = index_with(&[
        "Fever is a temporary rise in body temperature. ",
        "Anemia is a lack of healthy red blood cells. ",
        "Migraine is a recurring headache. ",
        "Asthma narrows the airways. ",
    ])
    .await;
    let service = service(index, llm);

    let answer = service
        .answer("anemia red blood cells", AnswerOptions::default())
        .await
        .unwrap();
    assert_eq!(answer.sources.len(), 3);
    assert!(answer.sources[0].metadata.text.starts_with("Anemia"));
    assert!(answer.sources[0].score >= answer.sources[1].score);
}

#[tokio::test]
async fn chat_mode_changes_only_the_instruction() {
    let llm = Arc::new(ScriptedModel::default());
    let index = index_with(&["Asthma narrows the airways. ", "Fever is common. "]).await;
    let service = service(index, llm.clone());

    let concise = service
        .answer(
            "asthma",
            AnswerOptions {
                temperature: 0.4,
                mode: ChatMode::Concise,
            },
        )
        .await
        .unwrap();
    let concise_prompt = llm.last_request().system;
    let detailed = service
        .answer(
            "asthma",
            AnswerOptions {
                temperature: 0.9,
                mode: ChatMode::Detailed,
            },
        )
        .await
        .unwrap();
    let detailed_request = llm.last_request();

    let ids = |a: &Answer| a.sources.iter().map(|s| s.id.clone()).collect::<Vec<_>>();
    assert_eq!(ids(&concise), ids(&detailed));
    assert!(concise_prompt.contains("three sentences maximum"));
    assert!(detailed_request.system.contains("detailed explanation"));
    assert!((detailed_request.temperature - 0.9).abs() < f32::EPSILON);
}

#[tokio::test]
async fn out_of_range_temperature_is_rejected() {
    let service = service(index_with(&[]).await, Arc::new(ScriptedModel::default()));
    let err = service
        .answer(
            "anything",
            AnswerOptions {
                temperature: 1.5,
                mode: ChatMode::Concise,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::InvalidInput(_)));

    let err = service
        .answer("   ", AnswerOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::InvalidInput(_)));
}

#[tokio::test]
async fn turns_are_recorded_in_the_session() {
    let service = service(
        index_with(&["Fever is a temporary rise in body temperature. "]).await,
        Arc::new(ScriptedModel::default()),
    );
    let mut session = ChatSession::new();

    service
        .handle_turn(&mut session, "What is fever", AnswerOptions::default())
        .await
        .unwrap();
    service
        .handle_turn(&mut session, "And migraine?", AnswerOptions::default())
        .await
        .unwrap();

    let roles: Vec<Role> = session.turns().iter().map(|t| t.role).collect();
    assert_eq!(
        roles,
        vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
    );
    assert_eq!(session.turns()[0].message, "What is fever");

    session.clear();
    assert!(session.is_empty());
}

#[tokio::test]
async fn failed_turn_leaves_history_untouched() {
    let service = service(index_with(&[]).await, Arc::new(FailingModel));
    let mut session = ChatSession::new();

    let err = service
        .handle_turn(&mut session, "What is fever?", AnswerOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::Llm(_)));
    assert!(session.is_empty());
}

#[tokio::test]
async fn http_handlers_share_one_session() {
    let service = service(
        index_with(&["Asthma narrows the airways. "]).await,
        Arc::new(ScriptedModel::default()),
    );
    let state = Arc::new(AppState::new(service, AnswerOptions::default()));

    let Json(reply) = server::chat(
        State(state.clone()),
        Json(ChatRequest {
            message: "asthma".into(),
            temperature: None,
            mode: Some(ChatMode::Detailed),
        }),
    )
    .await
    .unwrap_or_else(|_| panic!("chat failed"));
    assert_eq!(reply.sources.len(), 1);
    assert_eq!(reply.history.len(), 2);

    let Json(history) = server::history(State(state.clone())).await;
    assert_eq!(history.len(), 2);

    assert_eq!(
        server::clear_history(State(state.clone())).await,
        StatusCode::NO_CONTENT
    );
    let Json(history) = server::history(State(state)).await;
    assert!(history.is_empty());
}

#[tokio::test]
async fn invalid_requests_map_to_bad_request() {
    let service = service(index_with(&[]).await, Arc::new(ScriptedModel::default()));
    let state = Arc::new(AppState::new(service, AnswerOptions::default()));

    let result = server::chat(
        State(state),
        Json(ChatRequest {
            message: "hello".into(),
            temperature: Some(2.0),
            mode: None,
        }),
    )
    .await;
    let response = match result {
        Ok(_) => panic!("temperature 2.0 must be rejected"),
        Err(err) => err.into_response(),
    };
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upstream_failures_map_to_bad_gateway() {
    let service = service(index_with(&[]).await, Arc::new(FailingModel));
    let state = Arc::new(AppState::new(service, AnswerOptions::default()));

    let result = server::chat(
        State(state),
        Json(ChatRequest {
            message: "hello".into(),
            temperature: None,
            mode: None,
        }),
    )
    .await;
    let response = match result {
        Ok(_) => panic!("model failure must surface"),
        Err(err) => err.into_response(),
    };
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
