//! The host-side action executor seam.
//!
//! The engine hands over exactly one closed [`Resolution`] per resolved turn
//! and records the action only when the executor reports success.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use serde::Serialize;

use waypoint_types::Resolution;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub success: bool,
    /// Text to show instead of the engine's reply, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub side_effects_applied: bool,
}

impl ExecutionReport {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
            side_effects_applied: true,
        }
    }

    #[must_use]
    pub fn ok_with(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok()
        }
    }

    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            side_effects_applied: false,
        }
    }
}

pub type ExecFut<'a> = Pin<Box<dyn Future<Output = ExecutionReport> + Send + 'a>>;

pub trait ActionExecutor: Send + Sync {
    fn execute<'a>(&'a self, resolution: &'a Resolution) -> ExecFut<'a>;
}

/// Accepts everything and remembers what it was given. Resolutions whose tag
/// is listed in `failing` are reported as failures.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    executed: Mutex<Vec<Resolution>>,
    failing: Vec<&'static str>,
}

impl RecordingExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failing(tags: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            executed: Mutex::new(Vec::new()),
            failing: tags.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn executed(&self) -> Vec<Resolution> {
        self.executed.lock().map(|v| v.clone()).unwrap_or_default()
    }

    fn record(&self, resolution: &Resolution) -> ExecutionReport {
        if self.failing.contains(&resolution.tag()) {
            tracing::debug!(tag = resolution.tag(), "Executor rejecting resolution");
            return ExecutionReport::failed(format!("Couldn't {}.", describe(resolution)));
        }
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(resolution.clone());
        }
        ExecutionReport::ok()
    }
}

fn describe(resolution: &Resolution) -> String {
    match resolution {
        Resolution::Navigate { target } => format!("go to {}", target.target_name),
        Resolution::OpenPanel { title, .. } => format!("open {title}"),
        Resolution::RetrieveFromApp {
            entity_type, name, ..
        } => format!("look up the {entity_type} \"{name}\""),
        other => format!("complete that ({})", other.tag()),
    }
}

impl ActionExecutor for RecordingExecutor {
    fn execute<'a>(&'a self, resolution: &'a Resolution) -> ExecFut<'a> {
        let report = self.record(resolution);
        Box::pin(async move { report })
    }
}
