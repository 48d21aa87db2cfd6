//! Recovery boundary and fallback renderer.
//!
//! A boundary is a two-state machine (`Normal` / `Failed`) wrapped around a unit of UI.
//! `render` produces the children while `Normal`; a failure (returned or panicked) moves
//! it to `Failed`, reports the record once, and from then on the fallback view is
//! rendered until `reset` is called. The boundary never propagates a failure.

use crate::domain::{ErrorKind, ErrorRecord, RawFailure, classify, fallback_copy, user_message};
use crate::shared::Environment;
use crate::usecases::error_reporter::{ErrorReporter, LogOptions};
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::backtrace::Backtrace;
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryState {
    Normal,
    Failed(ErrorRecord),
}

impl BoundaryState {
    pub fn is_failed(&self) -> bool {
        matches!(self, BoundaryState::Failed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    /// Reset the boundary and render again.
    Retry,
    /// Full reload; offered when no reset is wired.
    Reload,
    GoHome,
    ContactSupport,
}

/// Engineer-facing detail. Only rendered outside production.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
    pub kind: ErrorKind,
    pub message: String,
    pub http_status: Option<u16>,
    pub context: BTreeMap<String, Value>,
    pub causes: Vec<String>,
    /// Stack at the point the fallback was rendered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backtrace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FallbackView {
    pub kind: ErrorKind,
    pub title: String,
    pub help: String,
    pub message: String,
    pub actions: Vec<RecoveryAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Diagnostics>,
}

pub struct FallbackRenderer;

impl FallbackRenderer {
    pub fn render(
        record: &ErrorRecord,
        reset_wired: bool,
        environment: Environment,
    ) -> FallbackView {
        let copy = fallback_copy(record.kind);

        let mut actions = vec![
            if reset_wired {
                RecoveryAction::Retry
            } else {
                RecoveryAction::Reload
            },
            RecoveryAction::GoHome,
        ];
        if needs_support(record.kind) {
            actions.push(RecoveryAction::ContactSupport);
        }

        let diagnostics = (!environment.is_production()).then(|| Diagnostics {
            kind: record.kind,
            message: record.message.clone(),
            http_status: record.http_status,
            context: record.context.clone(),
            causes: record.cause_chain(),
            backtrace: Some(Backtrace::force_capture().to_string()),
        });

        FallbackView {
            kind: record.kind,
            title: copy.title.to_string(),
            help: copy.help.to_string(),
            message: user_message(record),
            actions,
            diagnostics,
        }
    }
}

/// Kinds the user cannot resolve alone.
fn needs_support(kind: ErrorKind) -> bool {
    !matches!(
        kind,
        ErrorKind::Network
            | ErrorKind::Timeout
            | ErrorKind::Validation
            | ErrorKind::Auth
            | ErrorKind::Unauthorized
            | ErrorKind::SessionExpired
    )
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rendered<V> {
    Children(V),
    /// Output of the caller-supplied fallback.
    Custom(V),
    Fallback(FallbackView),
}

impl<V> Rendered<V> {
    pub fn is_children(&self) -> bool {
        matches!(self, Rendered::Children(_))
    }
}

type ErrorCallback = Box<dyn Fn(&ErrorRecord) + Send + Sync>;
type CustomFallback<V> = Box<dyn Fn(&ErrorRecord) -> V + Send + Sync>;

pub struct RecoveryBoundary<V> {
    name: String,
    reporter: Arc<ErrorReporter>,
    state: BoundaryState,
    on_error: Option<ErrorCallback>,
    fallback: Option<CustomFallback<V>>,
}

impl<V> RecoveryBoundary<V> {
    pub fn new(name: impl Into<String>, reporter: Arc<ErrorReporter>) -> Self {
        Self {
            name: name.into(),
            reporter,
            state: BoundaryState::Normal,
            on_error: None,
            fallback: None,
        }
    }

    pub fn on_error(mut self, f: impl Fn(&ErrorRecord) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn with_fallback(
        mut self,
        f: impl Fn(&ErrorRecord) -> V + Send + Sync + 'static,
    ) -> Self {
        self.fallback = Some(Box::new(f));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &BoundaryState {
        &self.state
    }

    pub fn error(&self) -> Option<&ErrorRecord> {
        match &self.state {
            BoundaryState::Failed(record) => Some(record),
            BoundaryState::Normal => None,
        }
    }

    /// Render the children, or the fallback while failed.
    pub fn render<E, F>(&mut self, children: F) -> Rendered<V>
    where
        F: FnOnce() -> Result<V, E>,
        E: Into<RawFailure>,
    {
        if let BoundaryState::Failed(record) = &self.state {
            return self.fallback_for(record);
        }

        match catch_unwind(AssertUnwindSafe(children)) {
            Ok(Ok(view)) => Rendered::Children(view),
            Ok(Err(e)) => self.fail(classify(e)),
            Err(payload) => self.fail(
                ErrorRecord::unknown(panic_message(payload.as_ref())).with_context("panic", true),
            ),
        }
    }

    /// Feed a failure observed outside `render` (e.g. an async handler).
    pub fn report_failure(&mut self, failure: impl Into<RawFailure>) -> Rendered<V> {
        if let BoundaryState::Failed(record) = &self.state {
            debug!(boundary = %self.name, "boundary already failed; failure ignored");
            return self.fallback_for(record);
        }
        self.fail(classify(failure))
    }

    /// Back to `Normal`. Does not retry anything; the next `render` does.
    pub fn reset(&mut self) {
        if self.state.is_failed() {
            info!(boundary = %self.name, "boundary reset");
        }
        self.state = BoundaryState::Normal;
    }

    fn fail(&mut self, record: ErrorRecord) -> Rendered<V> {
        self.reporter.error(
            record.clone(),
            LogOptions::new()
                .tag("boundary")
                .extra("boundary", self.name.as_str()),
        );
        if let Some(cb) = &self.on_error {
            cb(&record);
        }
        let rendered = self.fallback_for(&record);
        self.state = BoundaryState::Failed(record);
        rendered
    }

    fn fallback_for(&self, record: &ErrorRecord) -> Rendered<V> {
        match &self.fallback {
            Some(custom) => Rendered::Custom(custom(record)),
            None => Rendered::Fallback(FallbackRenderer::render(
                record,
                true,
                self.reporter.environment(),
            )),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "render panicked".to_string()
    }
}
