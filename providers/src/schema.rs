//! JSON contract for bridge replies.
//!
//! Every reply is an object `{"intent": <tag>, "args": {...}}`. Which tags are
//! legal depends on the [`BridgeTask`]: a select call may only answer
//! `select`, `need_more_info` or `fail`. Anything that does not validate
//! against the task's schema becomes [`BridgeReply::Fail`].

use std::sync::OnceLock;

use serde_json::{Value, json};

use crate::{BridgeReply, BridgeTask};
use waypoint_types::GeneralTopic;

fn select_schema() -> &'static Value {
    static SCHEMA: OnceLock<Value> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        json!({
            "type": "object",
            "required": ["intent"],
            "properties": {
                "intent": { "enum": ["select", "need_more_info", "fail"] },
                "args": { "type": "object" }
            },
            "allOf": [
                {
                    "if": { "properties": { "intent": { "const": "select" } } },
                    "then": {
                        "required": ["args"],
                        "properties": {
                            "args": {
                                "type": "object",
                                "required": ["choice_id"],
                                "properties": {
                                    "choice_id": { "type": "string", "minLength": 1 }
                                }
                            }
                        }
                    }
                }
            ]
        })
    })
}

fn classify_schema() -> &'static Value {
    static SCHEMA: OnceLock<Value> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        json!({
            "type": "object",
            "required": ["intent"],
            "properties": {
                "intent": {
                    "enum": [
                        "general_answer",
                        "answer_from_context",
                        "out_of_scope",
                        "need_context",
                        "need_more_info",
                        "fail"
                    ]
                },
                "args": { "type": "object" }
            },
            "allOf": [
                {
                    "if": { "properties": { "intent": { "const": "general_answer" } } },
                    "then": {
                        "required": ["args"],
                        "properties": {
                            "args": {
                                "type": "object",
                                "required": ["topic", "answer"],
                                "properties": {
                                    "topic": { "enum": ["time", "math", "knowledge"] },
                                    "answer": { "type": "string", "minLength": 1 }
                                }
                            }
                        }
                    }
                },
                {
                    "if": { "properties": { "intent": { "const": "answer_from_context" } } },
                    "then": {
                        "required": ["args"],
                        "properties": {
                            "args": {
                                "type": "object",
                                "required": ["answer"],
                                "properties": {
                                    "answer": { "type": "string", "minLength": 1 }
                                }
                            }
                        }
                    }
                }
            ]
        })
    })
}

#[must_use]
pub fn schema_for(task: BridgeTask) -> &'static Value {
    match task {
        BridgeTask::Select => select_schema(),
        BridgeTask::Classify => classify_schema(),
    }
}

/// Parse raw model output into a reply for `task`.
///
/// Tolerates surrounding prose or code fences by reading the outermost JSON
/// object in the text.
#[must_use]
pub fn parse_reply(task: BridgeTask, raw: &str) -> BridgeReply {
    let Some(object) = extract_object(raw) else {
        tracing::debug!(task = task.as_str(), "Bridge reply contained no JSON object");
        return BridgeReply::fail("reply was not a JSON object");
    };

    let value: Value = match serde_json::from_str(object) {
        Ok(value) => value,
        Err(err) => {
            tracing::debug!(task = task.as_str(), error = %err, "Bridge reply was not valid JSON");
            return BridgeReply::fail(format!("invalid JSON: {err}"));
        }
    };

    if let Err(message) = validate(task, &value) {
        tracing::debug!(
            task = task.as_str(),
            error = %message,
            "Bridge reply failed schema validation"
        );
        return BridgeReply::fail(message);
    }

    from_validated(&value)
}

fn validate(task: BridgeTask, value: &Value) -> Result<(), String> {
    let validator = jsonschema::validator_for(schema_for(task))
        .map_err(|e| format!("invalid reply schema: {e}"))?;
    validator.validate(value).map_err(|err| err.to_string())
}

fn extract_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

fn arg_str<'a>(args: Option<&'a Value>, key: &str) -> Option<&'a str> {
    args.and_then(|a| a.get(key)).and_then(Value::as_str)
}

fn from_validated(value: &Value) -> BridgeReply {
    let args = value.get("args");
    let intent = value.get("intent").and_then(Value::as_str).unwrap_or("fail");

    match intent {
        "select" => match arg_str(args, "choice_id") {
            Some(id) => BridgeReply::Select {
                choice_id: id.to_string(),
            },
            None => BridgeReply::fail("select without choice_id"),
        },
        "need_more_info" => BridgeReply::NeedMoreInfo {
            question: arg_str(args, "question")
                .filter(|q| !q.trim().is_empty())
                .map(str::to_string),
        },
        "general_answer" => {
            let topic = match arg_str(args, "topic") {
                Some("time") => GeneralTopic::Time,
                Some("math") => GeneralTopic::Math,
                _ => GeneralTopic::Knowledge,
            };
            BridgeReply::GeneralAnswer {
                topic,
                answer: arg_str(args, "answer").unwrap_or_default().to_string(),
            }
        }
        "answer_from_context" => BridgeReply::AnswerFromContext {
            answer: arg_str(args, "answer").unwrap_or_default().to_string(),
        },
        "out_of_scope" => BridgeReply::OutOfScope {
            reason: arg_str(args, "reason").map(str::to_string),
        },
        "need_context" => BridgeReply::NeedContext,
        _ => BridgeReply::Fail {
            reason: arg_str(args, "reason")
                .unwrap_or("model declined")
                .to_string(),
        },
    }
}
