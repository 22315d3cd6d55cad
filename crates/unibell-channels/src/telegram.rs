//! Telegram Bot API messenger: `sendMessage` for chats and operator diagnostics.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use unibell_core::config::TelegramConfig;
use unibell_core::error::{Result, UnibellError};
use unibell_core::traits::{Messenger, SendOutcome};

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Telegram messenger.
pub struct TelegramMessenger {
    config: TelegramConfig,
    client: reqwest::Client,
}

impl TelegramMessenger {
    pub fn new(config: TelegramConfig) -> Result<Self> {
        if config.bot_token.trim().is_empty() {
            return Err(UnibellError::Config(
                "telegram.bot_token is empty (set UNIBELL_TELEGRAM_TOKEN)".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| UnibellError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.bot_token,
            method
        )
    }

    /// Bot identity, used as a startup check that the token works.
    pub async fn get_me(&self) -> Result<TelegramUser> {
        let response = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| UnibellError::Transient(format!("getMe failed: {e}")))?;
        let body: TelegramApiResponse<TelegramUser> = response
            .json()
            .await
            .map_err(|e| UnibellError::Channel(format!("Invalid getMe response: {e}")))?;
        if !body.ok {
            return Err(UnibellError::Channel(format!(
                "Telegram API error: {}",
                body.description.unwrap_or_default()
            )));
        }
        body.result
            .ok_or_else(|| UnibellError::Channel("No bot info".into()))
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<SendOutcome> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "disable_web_page_preview": true,
        });

        let response = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| UnibellError::Transient(format!("sendMessage failed: {e}")))?;

        let status = response.status();
        let result: TelegramApiResponse<serde_json::Value> = match response.json().await {
            Ok(result) => result,
            Err(e) if status.is_server_error() => {
                return Err(UnibellError::Transient(format!("Telegram unavailable ({status}): {e}")));
            }
            Err(e) => {
                return Err(UnibellError::Channel(format!("Invalid send response ({status}): {e}")));
            }
        };

        if result.ok {
            return Ok(SendOutcome::Delivered);
        }
        classify_failure(status.as_u16(), result)
    }
}

/// Map a failed `sendMessage` to an outcome. Only blocked or missing
/// recipients are terminal; everything else stays a per-tick failure.
fn classify_failure(status: u16, result: TelegramApiResponse<serde_json::Value>) -> Result<SendOutcome> {
    let code = result.error_code.unwrap_or(status);
    let description = result.description.unwrap_or_default();
    match code {
        403 => Ok(SendOutcome::Unreachable),
        400 if description.to_lowercase().contains("chat not found") => Ok(SendOutcome::Unreachable),
        429 => Ok(SendOutcome::RateLimited {
            retry_after_secs: result.parameters.and_then(|p| p.retry_after),
        }),
        500..=599 => Err(UnibellError::Transient(format!(
            "Telegram error {code}: {description}"
        ))),
        _ => Err(UnibellError::Channel(format!(
            "Send failed ({code}): {description}"
        ))),
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, chat_id: i64, text: &str) -> Result<SendOutcome> {
        let outcome = self.send_message(chat_id, text).await?;
        if outcome == SendOutcome::Unreachable {
            tracing::info!(chat_id, "Telegram recipient unreachable");
        }
        Ok(outcome)
    }

    async fn notify_operator(&self, text: &str) -> Result<()> {
        let Some(chat_id) = self.config.operator_chat_id else {
            return Ok(());
        };
        match self.send_message(chat_id, text).await? {
            SendOutcome::Delivered => Ok(()),
            other => Err(UnibellError::Channel(format!(
                "Operator chat {chat_id} did not accept diagnostics: {other:?}"
            ))),
        }
    }
}

// --- Telegram API Types ---

#[derive(Debug, Deserialize)]
pub struct TelegramApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<u16>,
    #[serde(default)]
    pub parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseParameters {
    pub retry_after: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    pub username: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn messenger(server: &MockServer, operator: Option<i64>) -> TelegramMessenger {
        TelegramMessenger::new(TelegramConfig {
            bot_token: "TEST".into(),
            operator_chat_id: operator,
            api_url: server.uri(),
        })
        .unwrap()
    }

    async fn reply(server: &MockServer, status: u16, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path("/botTEST/sendMessage"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(server)
            .await;
    }

    #[test]
    fn test_empty_token_rejected() {
        let err = TelegramMessenger::new(TelegramConfig::default()).err().unwrap();
        assert!(matches!(err, UnibellError::Config(_)));
    }

    #[tokio::test]
    async fn test_send_delivered() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTEST/sendMessage"))
            .and(body_partial_json(serde_json::json!({"chat_id": 42, "text": "hi"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"ok": true, "result": {"message_id": 1}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let outcome = messenger(&server, None).send(42, "hi").await.unwrap();
        assert_eq!(outcome, SendOutcome::Delivered);
    }

    #[tokio::test]
    async fn test_blocked_is_unreachable() {
        let server = MockServer::start().await;
        reply(
            &server,
            403,
            serde_json::json!({"ok": false, "error_code": 403, "description": "Forbidden: bot was blocked by the user"}),
        )
        .await;

        let outcome = messenger(&server, None).send(42, "hi").await.unwrap();
        assert_eq!(outcome, SendOutcome::Unreachable);
    }

    #[tokio::test]
    async fn test_chat_not_found_is_unreachable() {
        let server = MockServer::start().await;
        reply(
            &server,
            400,
            serde_json::json!({"ok": false, "error_code": 400, "description": "Bad Request: chat not found"}),
        )
        .await;

        let outcome = messenger(&server, None).send(42, "hi").await.unwrap();
        assert_eq!(outcome, SendOutcome::Unreachable);
    }

    #[tokio::test]
    async fn test_too_many_requests() {
        let server = MockServer::start().await;
        reply(
            &server,
            429,
            serde_json::json!({
                "ok": false,
                "error_code": 429,
                "description": "Too Many Requests: retry after 7",
                "parameters": {"retry_after": 7}
            }),
        )
        .await;

        let outcome = messenger(&server, None).send(42, "hi").await.unwrap();
        assert_eq!(outcome, SendOutcome::RateLimited { retry_after_secs: Some(7) });
    }

    #[tokio::test]
    async fn test_other_bad_request_is_channel_error() {
        let server = MockServer::start().await;
        reply(
            &server,
            400,
            serde_json::json!({"ok": false, "error_code": 400, "description": "Bad Request: message is too long"}),
        )
        .await;

        let err = messenger(&server, None).send(42, "hi").await.unwrap_err();
        assert!(matches!(err, UnibellError::Channel(_)));
    }

    #[tokio::test]
    async fn test_gateway_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTEST/sendMessage"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let err = messenger(&server, None).send(42, "hi").await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_operator_diagnostics() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTEST/sendMessage"))
            .and(body_partial_json(serde_json::json!({"chat_id": -100})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        messenger(&server, Some(-100)).notify_operator("boom").await.unwrap();
        // No operator configured: nothing is sent
        messenger(&server, None).notify_operator("boom").await.unwrap();
    }

    #[tokio::test]
    async fn test_get_me() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/botTEST/getMe"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": {"id": 1, "is_bot": true, "first_name": "Bell", "username": "bell_bot"}
            })))
            .mount(&server)
            .await;

        let me = messenger(&server, None).get_me().await.unwrap();
        assert_eq!(me.username.as_deref(), Some("bell_bot"));
    }
}
