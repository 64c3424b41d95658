use common::{ChatbotError, FinanceError};
use llm::{ChatMessage, FinancialChatbot, LlmClient, LlmProvider};
use mockito::{Matcher, Server};

fn local_client(server: &Server) -> LlmClient {
    LlmClient::new(
        LlmProvider::Local {
            url: server.url(),
            model: "test-model".to_string(),
        },
        256,
        0.2,
    )
}

#[tokio::test]
async fn test_local_provider_sends_full_conversation() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "model": "test-model",
            "messages": [
                {"role": "system", "content": "seja breve"},
                {"role": "user", "content": "Oi"}
            ]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"choices": [{"message": {"role": "assistant", "content": "Olá!"}}]}"#)
        .create_async()
        .await;

    let client = local_client(&server);
    let reply = client
        .chat(&[ChatMessage::system("seja breve"), ChatMessage::user("Oi")])
        .await
        .unwrap();

    assert_eq!(reply, "Olá!");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_local_url_with_v1_suffix_is_normalized() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(r#"{"choices": [{"message": {"role": "assistant", "content": "ok"}}]}"#)
        .create_async()
        .await;

    let client = LlmClient::new(
        LlmProvider::Local {
            url: format!("{}/v1/", server.url()),
            model: "m".to_string(),
        },
        64,
        0.0,
    );
    assert_eq!(client.chat(&[ChatMessage::user("x")]).await.unwrap(), "ok");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_empty_choices_is_an_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(r#"{"choices": []}"#)
        .create_async()
        .await;

    let err = local_client(&server)
        .chat(&[ChatMessage::user("Oi")])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FinanceError::Chatbot(ChatbotError::EmptyResponse(_))
    ));
}

#[tokio::test]
async fn test_http_error_carries_status() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(401)
        .with_body("invalid api key")
        .create_async()
        .await;

    let client = LlmClient::new(
        LlmProvider::OpenAI {
            api_key: "sk-test".to_string(),
            model: "gpt-4o-mini".to_string(),
        },
        128,
        0.7,
    )
    .with_base_url(&server.url());

    match client.chat(&[ChatMessage::user("Oi")]).await.unwrap_err() {
        FinanceError::Chatbot(ChatbotError::Provider {
            provider,
            status,
            message,
        }) => {
            assert_eq!(provider, "OpenAI");
            assert_eq!(status, 401);
            assert_eq!(message, "invalid api key");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_gemini_generate_content() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1beta/models/gemini-pro:generateContent")
        .match_query(Matcher::UrlEncoded("key".into(), "g-key".into()))
        .match_body(Matcher::PartialJson(serde_json::json!({
            "systemInstruction": {"parts": [{"text": "sistema"}]},
            "contents": [
                {"role": "user", "parts": [{"text": "Oi"}]},
                {"role": "model", "parts": [{"text": "Olá"}]},
                {"role": "user", "parts": [{"text": "Tudo bem?"}]}
            ]
        })))
        .with_status(200)
        .with_body(r#"{"candidates": [{"content": {"role": "model", "parts": [{"text": "Tudo ótimo!"}]}}]}"#)
        .create_async()
        .await;

    let client = LlmClient::new(
        LlmProvider::Gemini {
            api_key: "g-key".to_string(),
            model: "gemini-pro".to_string(),
        },
        512,
        0.7,
    )
    .with_base_url(&server.url());

    let reply = client
        .chat(&[
            ChatMessage::system("sistema"),
            ChatMessage::user("Oi"),
            ChatMessage::assistant("Olá"),
            ChatMessage::user("Tudo bem?"),
        ])
        .await
        .unwrap();

    assert_eq!(reply, "Tudo ótimo!");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_anthropic_moves_system_prompt() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/messages")
        .match_header("x-api-key", "a-key")
        .match_header("anthropic-version", "2023-06-01")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "system": "sistema",
            "messages": [{"role": "user", "content": "Oi"}]
        })))
        .with_status(200)
        .with_body(r#"{"content": [{"type": "text", "text": "Olá!"}]}"#)
        .create_async()
        .await;

    let client = LlmClient::new(
        LlmProvider::Anthropic {
            api_key: "a-key".to_string(),
            model: "claude-3-haiku-20240307".to_string(),
        },
        512,
        0.7,
    )
    .with_base_url(&server.url());

    let reply = client
        .chat(&[ChatMessage::system("sistema"), ChatMessage::user("Oi")])
        .await
        .unwrap();
    assert_eq!(reply, "Olá!");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_chatbot_over_http_backend() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(r#"{"choices": [{"message": {"role": "assistant", "content": "A poupança rende 0,5% ao mês."}}]}"#)
        .expect(2)
        .create_async()
        .await;

    let mut bot = FinancialChatbot::new(local_client(&server));
    bot.respond("Quanto rende a poupança?", None).await.unwrap();
    bot.respond("E o CDB?", None).await.unwrap();

    assert_eq!(bot.history().len(), 4);
    assert_eq!(bot.history()[3].role, "assistant");
}
