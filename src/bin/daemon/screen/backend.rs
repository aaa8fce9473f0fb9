//! Display Backend Abstraction
//!
//! This module defines the contract every display backend (X11 RandR, sway,
//! ...) fulfils so that the layout engine never depends on a concrete one.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::layout::{CommitPlan, ControllerId, Snapshot};
use crate::utils::error::{ControllerFailure, MonitoggleError, Result};

/// Which backend the daemon should drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// sway when `SWAYSOCK` is set, X11 when `DISPLAY` is set
    #[default]
    Auto,
    X11,
    Sway,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Auto => write!(f, "auto"),
            BackendKind::X11 => write!(f, "x11"),
            BackendKind::Sway => write!(f, "sway"),
        }
    }
}

/// Outcome of applying a plan, one entry per controller attempted
#[derive(Debug, Default)]
pub struct ApplyReport {
    pub backend: &'static str,
    pub results: Vec<(ControllerId, std::result::Result<(), String>)>,
}

impl ApplyReport {
    pub fn new(backend: &'static str) -> Self {
        Self {
            backend,
            results: Vec::new(),
        }
    }

    pub fn record(&mut self, controller: ControllerId, result: std::result::Result<(), String>) {
        if let Err(message) = &result {
            warn!("{} backend failed on {}: {}", self.backend, controller, message);
        }
        self.results.push((controller, result));
    }

    pub fn is_success(&self) -> bool {
        self.results.iter().all(|(_, result)| result.is_ok())
    }

    /// Folds the per-controller results into one error if any of them failed
    pub fn into_result(self) -> Result<()> {
        let failures: Vec<ControllerFailure> = self
            .results
            .into_iter()
            .filter_map(|(controller, result)| {
                result.err().map(|message| ControllerFailure {
                    controller: controller.0,
                    message,
                })
            })
            .collect();

        if failures.is_empty() {
            return Ok(());
        }
        Err(MonitoggleError::BackendFailure {
            backend: self.backend.to_string(),
            message: format!("{} controller(s) could not be configured", failures.len()),
            failures,
        })
    }
}

/// Central trait for display backends
pub trait DisplayBackend: Send {
    /// Reads every output and controller at one point in time
    fn fetch(&mut self) -> Result<Snapshot>;

    /// Writes `plan` back, attempting every controller even after a failure.
    /// With `grab`, backends that can exclude other clients do so meanwhile.
    fn apply(&mut self, plan: &CommitPlan, grab: bool) -> ApplyReport;

    /// Gets the backend name
    fn backend_name(&self) -> &'static str;
}

/// Picks and connects the backend to use
pub struct BackendManager {
    preference: BackendKind,
}

impl BackendManager {
    pub fn new(preference: BackendKind) -> Self {
        Self { preference }
    }

    /// Candidate backends in order of preference
    pub fn candidates(&self) -> Vec<BackendKind> {
        match self.preference {
            BackendKind::Auto => detect_sessions(
                std::env::var_os("SWAYSOCK").is_some(),
                std::env::var_os("DISPLAY").is_some(),
            ),
            kind => vec![kind],
        }
    }

    /// Connects the first candidate that answers
    pub fn connect(&self) -> Result<Box<dyn DisplayBackend>> {
        let candidates = self.candidates();
        if candidates.is_empty() {
            return Err(MonitoggleError::backend(
                "auto",
                "neither SWAYSOCK nor DISPLAY is set, no display server to talk to",
            ));
        }

        let mut last_error = None;
        for kind in candidates {
            debug!("Trying {} backend", kind);
            let connected: Result<Box<dyn DisplayBackend>> = match kind {
                BackendKind::Sway => super::sway::SwayBackend::connect().map(|b| Box::new(b) as Box<dyn DisplayBackend>),
                BackendKind::X11 => super::xrandr::XrandrBackend::connect().map(|b| Box::new(b) as Box<dyn DisplayBackend>),
                BackendKind::Auto => continue,
            };
            match connected {
                Ok(backend) => {
                    info!("Using {} backend", backend.backend_name());
                    return Ok(backend);
                }
                Err(e) => {
                    warn!("{} backend unavailable: {}", kind, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| MonitoggleError::backend("auto", "no backend available")))
    }
}

/// Backend order for an automatic choice given which sessions are visible
fn detect_sessions(sway: bool, x11: bool) -> Vec<BackendKind> {
    let mut kinds = Vec::new();
    if sway {
        kinds.push(BackendKind::Sway);
    }
    if x11 {
        kinds.push(BackendKind::X11);
    }
    kinds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_preference_is_the_only_candidate() {
        assert_eq!(BackendManager::new(BackendKind::X11).candidates(), vec![BackendKind::X11]);
        assert_eq!(BackendManager::new(BackendKind::Sway).candidates(), vec![BackendKind::Sway]);
    }

    #[test]
    fn test_auto_prefers_sway_over_xwayland() {
        assert_eq!(detect_sessions(true, true), vec![BackendKind::Sway, BackendKind::X11]);
        assert_eq!(detect_sessions(false, true), vec![BackendKind::X11]);
        assert!(detect_sessions(false, false).is_empty());
    }

    #[test]
    fn test_backend_kind_deserialization() {
        #[derive(Deserialize)]
        struct Wrapper {
            backend: BackendKind,
        }
        let parsed: Wrapper = toml::from_str("backend = \"sway\"").unwrap();
        assert_eq!(parsed.backend, BackendKind::Sway);
        assert_eq!(BackendKind::default().to_string(), "auto");
    }

    #[test]
    fn test_report_aggregates_failures() {
        let mut report = ApplyReport::new("Test");
        report.record(ControllerId(1), Ok(()));
        report.record(ControllerId(2), Err("refused".to_string()));
        report.record(ControllerId(3), Err("busy".to_string()));
        assert!(!report.is_success());

        match report.into_result() {
            Err(MonitoggleError::BackendFailure { backend, failures, .. }) => {
                assert_eq!(backend, "Test");
                assert_eq!(failures.len(), 2);
                assert_eq!(failures[0].controller, 2);
                assert_eq!(failures[1].message, "busy");
            }
            other => panic!("Expected BackendFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_report_is_success() {
        assert!(ApplyReport::new("Test").into_result().is_ok());
    }
}
