//! Constrained LLM bridge.
//!
//! The engine treats the model as a black-box classifier behind [`LlmBridge`].
//! Every call carries a bounded request ([`BridgeRequest`]) and yields a
//! schema-validated, tagged [`BridgeReply`]. The model never produces text
//! that is executed directly: a `select` names an id from the bounded
//! candidate set, and everything else is either reply text or a signal to the
//! router.
//!
//! # Implementations
//!
//! | Bridge | Use |
//! |--------|-----|
//! | [`claude::ClaudeBridge`] | Anthropic Messages API with retry |
//! | [`offline::OfflineBridge`] | No model configured; answers only the clock |
//! | [`scripted::ScriptedBridge`] | Deterministic replies for tests |
//!
//! # Error Handling
//!
//! Transport failures, HTTP errors and timeouts surface as [`BridgeError`].
//! Malformed model output is *not* an error: [`schema::parse_reply`] turns it
//! into [`BridgeReply::Fail`], which callers handle the same way.

pub mod claude;
pub mod offline;
pub mod retry;
pub mod schema;
pub mod scripted;

use std::future::Future;
use std::pin::Pin;
use std::sync::OnceLock;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use waypoint_types::{Candidate, ChatContext, GeneralTopic, TurnId, UiContext};

pub use waypoint_types;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;
const MAX_ERROR_BODY_BYTES: usize = 16 * 1024;

/// What the bridge is being asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeTask {
    /// Pick one of the bounded candidates, or decline.
    Select,
    /// Classify a general question that no app tier could answer.
    Classify,
}

impl BridgeTask {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Classify => "classify",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeCandidate {
    pub id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sublabel: Option<String>,
}

impl From<&Candidate> for BridgeCandidate {
    fn from(candidate: &Candidate) -> Self {
        Self {
            id: candidate.id.as_str().to_string(),
            label: candidate.label.clone(),
            sublabel: candidate.sublabel.clone(),
        }
    }
}

/// One bridge call. `turn` tags the request so a reply can be matched back
/// to the turn that issued it.
#[derive(Debug, Clone, Serialize)]
pub struct BridgeRequest {
    #[serde(skip)]
    pub turn: TurnId,
    pub task: BridgeTask,
    pub user_message: String,
    pub chat_context: ChatContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ui_context: Option<UiContext>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bounded_candidates: Vec<BridgeCandidate>,
    /// True on the single retry after the model asked for more context.
    pub extended_context: bool,
}

impl BridgeRequest {
    #[must_use]
    pub fn select(
        turn: TurnId,
        user_message: impl Into<String>,
        chat_context: ChatContext,
        candidates: &[Candidate],
    ) -> Self {
        Self {
            turn,
            task: BridgeTask::Select,
            user_message: user_message.into(),
            chat_context,
            ui_context: None,
            bounded_candidates: candidates.iter().map(BridgeCandidate::from).collect(),
            extended_context: false,
        }
    }

    #[must_use]
    pub fn classify(
        turn: TurnId,
        user_message: impl Into<String>,
        chat_context: ChatContext,
        ui_context: UiContext,
    ) -> Self {
        Self {
            turn,
            task: BridgeTask::Classify,
            user_message: user_message.into(),
            chat_context,
            ui_context: Some(ui_context),
            bounded_candidates: Vec::new(),
            extended_context: false,
        }
    }

    #[must_use]
    pub fn with_extended_context(mut self, extended: bool) -> Self {
        self.extended_context = extended;
        self
    }

    #[must_use]
    pub fn has_candidate(&self, id: &str) -> bool {
        self.bounded_candidates.iter().any(|c| c.id == id)
    }
}

/// A validated bridge reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeReply {
    Select { choice_id: String },
    NeedMoreInfo { question: Option<String> },
    Fail { reason: String },
    GeneralAnswer { topic: GeneralTopic, answer: String },
    OutOfScope { reason: Option<String> },
    NeedContext,
    AnswerFromContext { answer: String },
}

impl BridgeReply {
    #[must_use]
    pub const fn intent(&self) -> &'static str {
        match self {
            Self::Select { .. } => "select",
            Self::NeedMoreInfo { .. } => "need_more_info",
            Self::Fail { .. } => "fail",
            Self::GeneralAnswer { .. } => "general_answer",
            Self::OutOfScope { .. } => "out_of_scope",
            Self::NeedContext => "need_context",
            Self::AnswerFromContext { .. } => "answer_from_context",
        }
    }

    pub(crate) fn fail(reason: impl Into<String>) -> Self {
        Self::Fail {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BridgeError {
    #[error("bridge timed out after {}ms", elapsed.as_millis())]
    Timeout { elapsed: Duration },
    #[error("bridge transport error: {0}")]
    Transport(String),
    #[error("bridge API error {status}: {body}")]
    Http { status: u16, body: String },
    #[error("bridge returned id {choice_id:?} outside the bounded candidate set")]
    Hallucination { choice_id: String },
    #[error("bridge unavailable: {0}")]
    Unavailable(String),
}

pub type BridgeFut<'a> =
    Pin<Box<dyn Future<Output = Result<BridgeReply, BridgeError>> + Send + 'a>>;

/// Injectable classifier capability.
///
/// Implementations must not retry forever; the router additionally races
/// every call against its own timeout.
pub trait LlmBridge: Send + Sync {
    fn name(&self) -> &'static str;

    fn call<'a>(&'a self, request: &'a BridgeRequest) -> BridgeFut<'a>;
}

/// Reject a `select` whose id is not in the request's bounded set.
pub fn check_bounded(
    request: &BridgeRequest,
    reply: BridgeReply,
) -> Result<BridgeReply, BridgeError> {
    if let BridgeReply::Select { choice_id } = &reply
        && !request.has_candidate(choice_id)
    {
        tracing::warn!(
            turn = %request.turn,
            choice_id = %choice_id,
            "Bridge chose an id outside the bounded set"
        );
        return Err(BridgeError::Hallucination {
            choice_id: choice_id.clone(),
        });
    }
    Ok(reply)
}

/// Shared client for bridges that talk HTTP.
pub fn http_client(https_only: bool) -> Result<reqwest::Client, BridgeError> {
    static HTTPS: OnceLock<reqwest::Client> = OnceLock::new();

    if https_only {
        if let Some(client) = HTTPS.get() {
            return Ok(client.clone());
        }
        let client = client_builder(true)
            .build()
            .map_err(|e| BridgeError::Unavailable(format!("failed to build HTTP client: {e}")))?;
        return Ok(HTTPS.get_or_init(|| client).clone());
    }

    client_builder(false)
        .build()
        .map_err(|e| BridgeError::Unavailable(format!("failed to build HTTP client: {e}")))
}

fn client_builder(https_only: bool) -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::none())
        .https_only(https_only)
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
}

pub async fn read_capped_error_body(response: reqwest::Response) -> String {
    use futures_util::StreamExt;
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}
