use crate::exitcode;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateAction {
    Skipped,
    Recreated,
    Failed,
}

/// Why a service was (or would have been) recreated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecreateReason {
    ImageChanged,
    Forced,
    NotRunning,
}

/// Step of the per-service workflow that talked to the external tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStep {
    Pull,
    Build,
    Inspect,
    Recreate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepError {
    pub step: UpdateStep,
    pub message: String,
}

/// Outcome of one service's update attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateResult {
    pub service: String,
    pub image_changed: bool,
    pub action: UpdateAction,
    pub reason: Option<RecreateReason>,
    pub error: Option<StepError>,
}

impl UpdateResult {
    pub fn skipped(service: &str) -> Self {
        Self {
            service: service.to_string(),
            image_changed: false,
            action: UpdateAction::Skipped,
            reason: None,
            error: None,
        }
    }

    pub fn recreated(service: &str, image_changed: bool, reason: RecreateReason) -> Self {
        Self {
            service: service.to_string(),
            image_changed,
            action: UpdateAction::Recreated,
            reason: Some(reason),
            error: None,
        }
    }

    pub fn failed(service: &str, step: UpdateStep, message: impl Into<String>) -> Self {
        Self {
            service: service.to_string(),
            image_changed: false,
            action: UpdateAction::Failed,
            reason: None,
            error: Some(StepError {
                step,
                message: message.into(),
            }),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.action == UpdateAction::Failed
    }
}

impl fmt::Display for UpdateStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pull => write!(f, "pull"),
            Self::Build => write!(f, "build"),
            Self::Inspect => write!(f, "inspect"),
            Self::Recreate => write!(f, "recreate"),
        }
    }
}

impl fmt::Display for RecreateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImageChanged => write!(f, "image changed"),
            Self::Forced => write!(f, "forced"),
            Self::NotRunning => write!(f, "not running"),
        }
    }
}

impl fmt::Display for UpdateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.action, &self.reason, &self.error) {
            (UpdateAction::Failed, _, Some(err)) => {
                write!(f, "failed at {}: {}", err.step, err.message)
            }
            (UpdateAction::Failed, _, None) => write!(f, "failed"),
            (UpdateAction::Recreated, Some(reason), _) => write!(f, "recreated ({reason})"),
            (UpdateAction::Recreated, None, _) => write!(f, "recreated"),
            (UpdateAction::Skipped, _, _) => write!(f, "up to date, skipped"),
        }
    }
}

/// All results of a run, in processing order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub results: Vec<UpdateResult>,
}

impl RunSummary {
    pub fn new(results: Vec<UpdateResult>) -> Self {
        Self { results }
    }

    pub fn count(&self, action: UpdateAction) -> usize {
        self.results.iter().filter(|r| r.action == action).count()
    }

    pub fn has_failures(&self) -> bool {
        self.results.iter().any(UpdateResult::is_failure)
    }

    pub fn find(&self, service: &str) -> Option<&UpdateResult> {
        self.results.iter().find(|r| r.service == service)
    }

    /// Any failed service turns the whole run into a failure
    pub fn exit_code(&self) -> i32 {
        if self.has_failures() {
            exitcode::FAILURE
        } else {
            exitcode::OK
        }
    }

    pub fn render(&self) -> String {
        if self.results.is_empty() {
            return "No services processed".to_string();
        }

        let width = self
            .results
            .iter()
            .map(|r| r.service.len())
            .max()
            .unwrap_or(0);

        let mut out = String::from("Update summary\n");
        for result in &self.results {
            out.push_str(&format!("  {:<width$}  {}\n", result.service, result));
        }
        out.push_str(&format!(
            "{} service(s): {} recreated, {} skipped, {} failed",
            self.results.len(),
            self.count(UpdateAction::Recreated),
            self.count(UpdateAction::Skipped),
            self.count(UpdateAction::Failed),
        ));
        out
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
