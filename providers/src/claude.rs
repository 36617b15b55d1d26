//! Anthropic Messages API bridge.
//!
//! Non-streaming: the reply is a single small JSON object, so the bridge
//! sends one request, concatenates the text blocks of the response and hands
//! them to [`schema::parse_reply`].

use serde::Deserialize;
use serde_json::json;

use crate::retry::{RetryPolicy, SendOutcome, send_with_retry};
use crate::{
    BridgeError, BridgeFut, BridgeReply, BridgeRequest, BridgeTask, LlmBridge, check_bounded,
    http_client, read_capped_error_body, schema,
};
use waypoint_config::BridgeSettings;

const ANTHROPIC_VERSION: &str = "2023-06-01";

const SELECT_PROMPT: &str = "You resolve which option a user meant inside a chat assistant. \
You receive the user's message, recent chat context and a bounded list of candidates. \
Reply with exactly one JSON object and nothing else:\n\
{\"intent\":\"select\",\"args\":{\"choice_id\":\"<id from bounded_candidates>\"}} when one candidate clearly matches,\n\
{\"intent\":\"need_more_info\",\"args\":{\"question\":\"<short question>\"}} when the message is ambiguous,\n\
{\"intent\":\"fail\",\"args\":{\"reason\":\"<short reason>\"}} otherwise.\n\
Never invent ids. Never answer in prose.";

const CLASSIFY_PROMPT: &str = "You classify messages that an in-app assistant could not route to an app action. \
You receive the user's message, recent chat context and a summary of what is on screen. \
Reply with exactly one JSON object and nothing else:\n\
{\"intent\":\"general_answer\",\"args\":{\"topic\":\"time|math|knowledge\",\"answer\":\"<short answer>\"}} for general questions,\n\
{\"intent\":\"answer_from_context\",\"args\":{\"answer\":\"<answer>\"}} when the provided context answers it,\n\
{\"intent\":\"need_context\"} when older conversation would be needed to answer,\n\
{\"intent\":\"need_more_info\",\"args\":{\"question\":\"<short question>\"}} when the request is unclear,\n\
{\"intent\":\"out_of_scope\",\"args\":{\"reason\":\"<short reason>\"}} for requests the assistant cannot help with,\n\
{\"intent\":\"fail\"} otherwise.";

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

pub struct ClaudeBridge {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    retry: RetryPolicy,
}

impl std::fmt::Debug for ClaudeBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeBridge")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

impl ClaudeBridge {
    pub fn new(settings: &BridgeSettings) -> Result<Self, BridgeError> {
        let Some(api_key) = settings.api_key.clone() else {
            return Err(BridgeError::Unavailable(
                "no Anthropic API key configured".to_string(),
            ));
        };
        let base = settings.base_url.trim_end_matches('/');
        let client = http_client(base.starts_with("https://"))?;

        Ok(Self {
            client,
            endpoint: format!("{base}/v1/messages"),
            api_key,
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            retry: RetryPolicy::default(),
        })
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn request_body(&self, request: &BridgeRequest) -> serde_json::Value {
        let system = match request.task {
            BridgeTask::Select => SELECT_PROMPT,
            BridgeTask::Classify => CLASSIFY_PROMPT,
        };
        let payload = serde_json::to_string(request).unwrap_or_else(|_| {
            json!({ "user_message": request.user_message }).to_string()
        });

        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": 0,
            "system": system,
            "messages": [{ "role": "user", "content": payload }]
        })
    }

    async fn send(&self, request: &BridgeRequest) -> Result<BridgeReply, BridgeError> {
        let body = self.request_body(request);
        let build = || {
            self.client
                .post(&self.endpoint)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&body)
        };

        let response = match send_with_retry(build, &self.retry).await {
            SendOutcome::Success(response) => response,
            SendOutcome::HttpError(response) => {
                let status = response.status().as_u16();
                let body = read_capped_error_body(response).await;
                return Err(BridgeError::Http { status, body });
            }
            SendOutcome::Transport { attempts, source } => {
                return Err(BridgeError::Transport(format!(
                    "request failed after {attempts} attempt(s): {source}"
                )));
            }
        };

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| BridgeError::Transport(format!("unreadable response body: {e}")))?;

        let text: String = parsed
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect();

        let reply = schema::parse_reply(request.task, &text);
        tracing::debug!(turn = %request.turn, intent = reply.intent(), "Bridge reply parsed");
        check_bounded(request, reply)
    }
}

impl LlmBridge for ClaudeBridge {
    fn name(&self) -> &'static str {
        "claude"
    }

    fn call<'a>(&'a self, request: &'a BridgeRequest) -> BridgeFut<'a> {
        Box::pin(self.send(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use waypoint_types::{Action, Candidate, ChatContext, TurnId, UiContext};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(base_url: String) -> BridgeSettings {
        BridgeSettings {
            api_key: Some("test-key".to_string()),
            base_url,
            timeout: Duration::from_secs(2),
            ..BridgeSettings::default()
        }
    }

    fn text_response(text: &str) -> serde_json::Value {
        json!({
            "id": "msg_test",
            "type": "message",
            "role": "assistant",
            "content": [{ "type": "text", "text": text }],
            "stop_reason": "end_turn"
        })
    }

    fn select_request() -> BridgeRequest {
        let candidates = vec![
            Candidate::new(
                "opt-1",
                "Recent Entries",
                Action::open_panel("panel-recent", "Recent"),
            ),
            Candidate::new(
                "opt-2",
                "Quick Notes",
                Action::open_panel("panel-notes", "Quick Notes"),
            ),
        ];
        BridgeRequest::select(TurnId::new(3), "the notes one", ChatContext::default(), &candidates)
    }

    #[test]
    fn missing_api_key_is_unavailable() {
        let settings = BridgeSettings::default();
        assert!(matches!(
            ClaudeBridge::new(&BridgeSettings {
                api_key: None,
                ..settings
            }),
            Err(BridgeError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn select_reply_is_validated() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_response(
                r#"{"intent":"select","args":{"choice_id":"opt-2"}}"#,
            )))
            .mount(&server)
            .await;

        let bridge = ClaudeBridge::new(&settings(server.uri())).unwrap();
        let reply = bridge.call(&select_request()).await.unwrap();
        assert_eq!(
            reply,
            BridgeReply::Select {
                choice_id: "opt-2".to_string()
            }
        );
    }

    #[tokio::test]
    async fn hallucinated_id_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_response(
                r#"{"intent":"select","args":{"choice_id":"opt-9"}}"#,
            )))
            .mount(&server)
            .await;

        let bridge = ClaudeBridge::new(&settings(server.uri())).unwrap();
        let err = bridge.call(&select_request()).await.unwrap_err();
        assert!(matches!(err, BridgeError::Hallucination { .. }));
    }

    #[tokio::test]
    async fn prose_reply_becomes_fail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(text_response("I think they meant the notes.")),
            )
            .mount(&server)
            .await;

        let bridge = ClaudeBridge::new(&settings(server.uri())).unwrap();
        let reply = bridge.call(&select_request()).await.unwrap();
        assert!(matches!(reply, BridgeReply::Fail { .. }));
    }

    #[tokio::test]
    async fn http_error_surfaces_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let bridge = ClaudeBridge::new(&settings(server.uri()))
            .unwrap()
            .with_retry(RetryPolicy::none());
        let err = bridge.call(&select_request()).await.unwrap_err();
        assert_eq!(
            err,
            BridgeError::Http {
                status: 401,
                body: "bad key".to_string()
            }
        );
    }

    #[tokio::test]
    async fn classify_request_carries_ui_context() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_response(
                r#"{"intent":"general_answer","args":{"topic":"knowledge","answer":"Paris"}}"#,
            )))
            .mount(&server)
            .await;

        let bridge = ClaudeBridge::new(&settings(server.uri())).unwrap();
        let request = BridgeRequest::classify(
            TurnId::new(1),
            "capital of france?",
            ChatContext::default(),
            UiContext::default(),
        );
        let reply = bridge.call(&request).await.unwrap();
        assert!(matches!(reply, BridgeReply::GeneralAnswer { .. }));

        let received = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
        let payload = body["messages"][0]["content"].as_str().unwrap();
        assert!(payload.contains("\"ui_context\""));
        assert!(body["system"].as_str().unwrap().contains("general_answer"));
    }
}
