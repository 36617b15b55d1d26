//! Historical chat context with per-field decay.
//!
//! Each field is found by its own reverse scan over the window, so options
//! shown three messages ago survive a newer assistant message that carries no
//! options. Plain text fields never decay; structured fields are marked stale
//! once older than their window.

use std::time::{Duration, SystemTime};

use waypoint_config::DecayWindows;
use waypoint_types::{ChatContext, ChatMessage, ContextField, Role};

fn age_of(message: &ChatMessage, now: SystemTime) -> Duration {
    now.duration_since(message.timestamp).unwrap_or(Duration::ZERO)
}

/// Newest message (scanning backwards) for which `pick` yields a value.
fn latest_field<T, F>(
    messages: &[ChatMessage],
    now: SystemTime,
    window: Duration,
    pick: F,
) -> Option<ContextField<T>>
where
    F: Fn(&ChatMessage) -> Option<T>,
{
    messages.iter().rev().find_map(|message| {
        pick(message).map(|value| {
            let age = age_of(message, now);
            ContextField {
                value,
                source: message.id,
                age,
                stale: age > window,
            }
        })
    })
}

fn latest_text(messages: &[ChatMessage], role: Role) -> Option<String> {
    messages
        .iter()
        .rev()
        .find(|m| m.role == role && !m.text.trim().is_empty())
        .map(|m| m.text.clone())
}

/// Build the chat context from `messages` (oldest first).
#[must_use]
pub fn build_chat_context(
    messages: &[ChatMessage],
    now: SystemTime,
    windows: &DecayWindows,
) -> ChatContext {
    ChatContext {
        last_assistant_message: latest_text(messages, Role::Assistant),
        last_user_message: latest_text(messages, Role::User),
        last_options: latest_field(messages, now, windows.options, |m| {
            m.options.clone().filter(|o| !o.is_empty())
        }),
        last_list_preview: latest_field(messages, now, windows.list_preview, |m| {
            m.list_preview.clone()
        }),
        last_opened_panel: latest_field(messages, now, windows.opened_panel, |m| {
            m.opened_panel.clone()
        }),
        last_error_message: latest_field(messages, now, windows.error, |m| m.error.clone()),
    }
}
