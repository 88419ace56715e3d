/*!
 * Tests of the hosted-API adapters against local fake services
 */

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;

use gagana::errors::{ProviderError, RelayError};
use gagana::providers::openai::OpenAI;
use gagana::providers::replicate::Replicate;
use gagana::relay::RelayStream;
use gagana::{StreamingRelay, TranslationRequest};

use crate::common::fake_backends::{
    FakeBackend, chat_completion_body, prediction_body, spawn_chat_completion, spawn_chat_completion_failing,
    spawn_prediction, spawn_prediction_failing,
};

fn openai_relay(fake: &FakeBackend) -> StreamingRelay {
    StreamingRelay::new(8000, Some(Duration::from_secs(5))).with_adapter(Arc::new(OpenAI::new("sk-test", &fake.endpoint)))
}

fn replicate_relay(fake: &FakeBackend) -> StreamingRelay {
    StreamingRelay::new(8000, Some(Duration::from_secs(5)))
        .with_adapter(Arc::new(Replicate::new("r8-test", &fake.endpoint)))
}

async fn collect(stream: RelayStream) -> (String, Option<RelayError>) {
    let mut text = String::new();
    let mut items = stream;
    while let Some(item) = items.next().await {
        match item {
            Ok(fragment) => text.push_str(&fragment),
            Err(e) => return (text, Some(e)),
        }
    }
    (text, None)
}

#[tokio::test]
async fn test_openai_shouldStreamDeltasAndSendChatRequest() {
    let fake = spawn_chat_completion(chat_completion_body(&["Tal", "ofa"])).await;
    let relay = openai_relay(&fake);

    let stream = relay
        .dispatch(TranslationRequest::new("enToSm", "Hello", 1))
        .await
        .expect("dispatch should succeed");
    let (text, error) = collect(stream).await;

    assert_eq!(text, "Talofa");
    assert!(error.is_none());

    let requests = fake.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request["model"], "gpt-4");
    assert_eq!(request["stream"], true);
    assert_eq!(request["messages"][0]["role"], "system");
    assert!(request["messages"][0]["content"].as_str().unwrap().contains("English to Samoan"));
    assert_eq!(request["messages"][1]["role"], "user");
    assert_eq!(request["messages"][1]["content"], "Hello");
    assert_eq!(fake.authorization().as_deref(), Some("Bearer sk-test"));
}

#[tokio::test]
async fn test_openai_withAuthFailure_shouldFailDispatch() {
    let fake = spawn_chat_completion_failing(401).await;
    let relay = openai_relay(&fake);

    let result = relay.dispatch(TranslationRequest::new("smToEn", "Talofa", 2)).await;

    assert!(matches!(
        result,
        Err(RelayError::BackendDispatch(ProviderError::AuthenticationError(_)))
    ));
}

#[tokio::test]
async fn test_openai_withoutDoneMarker_shouldReportInterruption() {
    let mut body = chat_completion_body(&["Tal"]);
    body.truncate(body.len() - "data: [DONE]\n\n".len());
    let fake = spawn_chat_completion(body).await;
    let relay = openai_relay(&fake);

    let stream = relay.dispatch(TranslationRequest::new("enToSm", "Hello", 1)).await.unwrap();
    let (text, error) = collect(stream).await;

    assert_eq!(text, "Tal");
    assert!(matches!(
        error,
        Some(RelayError::BackendStream(ProviderError::StreamInterrupted(_)))
    ));
}

#[tokio::test]
async fn test_openai_withErrorChunk_shouldFailStream() {
    let body = format!(
        "{}data: {{\"error\":{{\"message\":\"overloaded\"}}}}\n\n",
        chat_completion_body(&["Tal"]).replace("data: [DONE]\n\n", "")
    );
    let fake = spawn_chat_completion(body).await;
    let relay = openai_relay(&fake);

    let stream = relay.dispatch(TranslationRequest::new("enToSm", "Hello", 1)).await.unwrap();
    let (_, error) = collect(stream).await;

    match error {
        Some(RelayError::BackendStream(ProviderError::StreamFailed(message))) => assert_eq!(message, "overloaded"),
        other => panic!("expected a stream failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_replicate_shouldCreatePredictionAndFollowStream() {
    let fake = spawn_prediction(prediction_body(&["Hå", "fa", " adai"])).await;
    let relay = replicate_relay(&fake);

    let stream = relay
        .dispatch(TranslationRequest::new("enToCh", "Hello", 3))
        .await
        .expect("dispatch should succeed");
    let (text, error) = collect(stream).await;

    assert_eq!(text, "Håfa adai");
    assert!(error.is_none());

    let requests = fake.requests();
    let request = &requests[0];
    assert_eq!(request["stream"], true);
    assert_eq!(request["input"]["prompt"], "Hello");
    assert!(request["input"]["system_prompt"].as_str().unwrap().contains("English to Chamorro"));
    assert!(request["version"].as_str().is_some_and(|v| !v.is_empty()));
    assert_eq!(fake.authorization().as_deref(), Some("Bearer r8-test"));
    assert_eq!(fake.cancels(), 0);
}

#[tokio::test]
async fn test_replicate_withServerError_shouldFailDispatch() {
    let fake = spawn_prediction_failing(500).await;
    let relay = replicate_relay(&fake);

    let result = relay.dispatch(TranslationRequest::new("chToEn", "Håfa adai", 3)).await;

    assert!(matches!(
        result,
        Err(RelayError::BackendDispatch(ProviderError::ApiError { status_code: 500, .. }))
    ));
}

#[tokio::test]
async fn test_replicate_withCanceledPrediction_shouldFailStream() {
    let body = "event: output\ndata: Hå\n\nevent: done\ndata: {\"reason\":\"canceled\"}\n\n".to_string();
    let fake = spawn_prediction(body).await;
    let relay = replicate_relay(&fake);

    let stream = relay.dispatch(TranslationRequest::new("enToCh", "Hello", 3)).await.unwrap();
    let (text, error) = collect(stream).await;

    assert_eq!(text, "Hå");
    assert!(matches!(error, Some(RelayError::BackendStream(ProviderError::StreamFailed(_)))));
}

#[tokio::test]
async fn test_replicate_abandonedStream_shouldCancelPrediction() {
    let fake = spawn_prediction(prediction_body(&["Hå", "fa"])).await;
    let relay = replicate_relay(&fake);

    let mut stream = relay.dispatch(TranslationRequest::new("enToCh", "Hello", 3)).await.unwrap();
    let first = stream.next().await;
    assert!(matches!(first, Some(Ok(_))));
    drop(stream);

    for _ in 0..50 {
        if fake.cancels() > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(fake.cancels(), 1);
}

#[tokio::test]
async fn test_openai_withUnreachableEndpoint_shouldReportConnectionError() {
    let endpoint = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        format!("http://{}/v1", listener.local_addr().unwrap())
    };
    let relay = StreamingRelay::new(8000, None).with_adapter(Arc::new(OpenAI::new("sk-test", endpoint)));

    let result = relay.dispatch(TranslationRequest::new("enToSm", "Hello", 1)).await;

    assert!(matches!(
        result,
        Err(RelayError::BackendDispatch(ProviderError::ConnectionError(_)))
    ));
}
