mod common;

use agritech::fallback;
use agritech::Chatbot;
use common::mock_server::AgriMock;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, Request, ResponseTemplate};

#[tokio::test]
async fn test_advice_returns_first_choice() {
    let mock = AgriMock::start().await;
    mock.mount_fixture("chat/completion_valid.json").await;

    let answer = mock.advice_client().ask("Quand semer le blé ?").await;

    assert_eq!(answer, "Semez le blé d'hiver entre mi-octobre et début novembre.");
}

#[tokio::test]
async fn test_advice_request_shape() {
    let mock = AgriMock::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .and(header("authorization", "Bearer test_key"))
        .and(header("http-referer", "http://localhost:5173"))
        .and(|request: &Request| {
            let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap_or_default();
            body["model"] == "gpt-3.5-turbo"
                && body["messages"][0]["role"] == "system"
                && body["messages"][1]["content"] == "Quel engrais ?"
        })
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "Du compost." } }]
        })))
        .expect(1)
        .mount(&mock.server)
        .await;

    assert_eq!(mock.advice_client().ask("Quel engrais ?").await, "Du compost.");
}

#[tokio::test]
async fn test_empty_completion_gets_apology() {
    let mock = AgriMock::start().await;
    mock.mount_fixture("chat/completion_empty.json").await;

    let answer = mock.advice_client().ask("Bonjour").await;

    assert_eq!(answer, "Je m'excuse, mais je n'ai pas pu générer de conseil pour le moment.");
}

#[tokio::test]
async fn test_rate_limited_falls_back_to_keyword_answer() {
    let mock = AgriMock::start().await;
    mock.mount_fixture("chat/completion_rate_limited.json").await;

    let answer = mock.advice_client().ask("Comment planifier l'irrigation ?").await;

    assert_eq!(answer, fallback::respond("irrigation"));
    assert_ne!(answer, fallback::DEFAULT);
}

#[tokio::test]
async fn test_chatbot_tracks_state() {
    let mock = AgriMock::start().await;
    mock.mount_fixture("chat/completion_valid.json").await;

    let bot = Chatbot::new(mock.advice_client());
    let answer = bot.ask("  Quand semer le blé ?  ").await.unwrap();

    let state = bot.state();
    assert!(!state.loading);
    assert!(state.error.is_none());
    assert_eq!(state.last_answer.as_deref(), Some(answer.as_str()));

    assert!(bot.ask("").await.is_err());
    assert!(bot.state().error.is_some());
}
