//! Screen Module
//!
//! The output switcher is the only caller of the layout engine. It fetches a
//! fresh snapshot from the display backend for every request, anchors it to
//! the reference layout, plans, applies and confirms.

pub mod backend;
pub mod sway;
pub mod xrandr;

#[cfg(test)]
pub mod mock;

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::layout::engine::{plan_disable, plan_enable, plan_toggle};
use crate::layout::memory::LayoutMemory;
use crate::layout::{Connection, Output, Snapshot};
use crate::utils::error::{MonitoggleError, Result};
use backend::DisplayBackend;

/// State of one output as shown to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputStatus {
    pub name: String,
    /// Name plus reference geometry, e.g. `HDMI-1 (1920x1080+0+0)`
    pub display: String,
    pub connected: bool,
    pub enabled: bool,
    pub priority: u32,
    pub physical_width_mm: u32,
    pub physical_height_mm: u32,
}

impl OutputStatus {
    fn from_snapshot(snapshot: &Snapshot, output: &Output) -> Self {
        let display = match output.controller.and_then(|id| snapshot.controllers.get(&id)) {
            Some(controller) => format!("{} ({})", output.name, controller.describe()),
            None => output.name.clone(),
        };
        Self {
            name: output.name.clone(),
            display,
            connected: output.connection == Connection::Connected,
            enabled: output.enabled,
            priority: output.priority,
            physical_width_mm: output.physical_width_mm,
            physical_height_mm: output.physical_height_mm,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Request {
    Enable,
    Disable,
    Toggle,
}

/// Drives enable/disable requests from a client down to the backend
pub struct OutputSwitcher {
    backend: Box<dyn DisplayBackend>,
    memory: LayoutMemory,
    /// Enabled flag per connected output, as last confirmed
    states: BTreeMap<String, bool>,
    grab: bool,
}

impl OutputSwitcher {
    pub fn new(backend: Box<dyn DisplayBackend>, grab: bool) -> Self {
        Self {
            backend,
            memory: LayoutMemory::new(),
            states: BTreeMap::new(),
            grab,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    /// Enabled flag of `name` as last seen, without asking the backend
    pub fn is_enabled(&self, name: &str) -> Option<bool> {
        self.states.get(name).copied()
    }

    /// Fetches a fresh snapshot anchored to the reference layout
    fn snapshot(&mut self) -> Result<Snapshot> {
        let live = self.backend.fetch()?;
        let snapshot = self.memory.anchor(live);
        self.states = snapshot
            .connected_outputs()
            .map(|output| (output.name.clone(), output.enabled))
            .collect();
        Ok(snapshot)
    }

    /// Lists every output the backend reports
    pub fn list_outputs(&mut self) -> Result<Vec<OutputStatus>> {
        let snapshot = self.snapshot()?;
        Ok(snapshot
            .outputs
            .values()
            .map(|output| OutputStatus::from_snapshot(&snapshot, output))
            .collect())
    }

    /// Enables `name`, returning its enabled flag afterwards
    pub fn enable(&mut self, name: &str) -> Result<bool> {
        self.switch(name, Request::Enable)
    }

    /// Disables `name`, returning its enabled flag afterwards
    pub fn disable(&mut self, name: &str) -> Result<bool> {
        self.switch(name, Request::Disable)
    }

    /// Disables `name` if enabled, enables it otherwise
    pub fn toggle(&mut self, name: &str) -> Result<bool> {
        self.switch(name, Request::Toggle)
    }

    fn switch(&mut self, name: &str, request: Request) -> Result<bool> {
        let snapshot = self.snapshot()?;
        let output = snapshot
            .output_by_name(name)
            .ok_or_else(|| MonitoggleError::NotFound(format!("no connected output named '{}'", name)))?;
        let (id, previous) = (output.id, output.enabled);

        let plan = match request {
            Request::Enable => plan_enable(&snapshot, id)?,
            Request::Disable => plan_disable(&snapshot, id)?,
            Request::Toggle => plan_toggle(&snapshot, id)?,
        };
        drop(snapshot);

        if plan.is_identity() {
            debug!("{:?} {}: nothing to apply", request, name);
            return Ok(previous);
        }

        let requested = plan.outputs.get(&id).map_or(previous, |output| output.enabled);
        self.states.insert(name.to_string(), requested);

        if let Err(e) = self.backend.apply(&plan, self.grab).into_result() {
            error!("Failed to {:?} {}: {}", request, name, e);
            self.states.insert(name.to_string(), previous);
            return Err(e);
        }

        match self.snapshot() {
            Ok(_) => {
                let enabled = self.is_enabled(name).unwrap_or(requested);
                if enabled != requested {
                    warn!(
                        "{} backend reports {} {} after a successful apply",
                        self.backend_name(),
                        name,
                        if enabled { "enabled" } else { "disabled" }
                    );
                }
                info!("{} is now {}", name, if enabled { "enabled" } else { "disabled" });
                Ok(enabled)
            }
            Err(e) => {
                warn!("Could not confirm {:?} of {}: {}", request, name, e);
                Ok(self.is_enabled(name).unwrap_or(requested))
            }
        }
    }

    /// Enables every connected output that has a reference position.
    /// Every output is attempted; the first error is returned afterwards.
    pub fn restore_all(&mut self) -> Result<Vec<String>> {
        let snapshot = self.snapshot()?;
        let disabled: Vec<String> = snapshot
            .connected_outputs()
            .filter(|output| !output.enabled && self.memory.knows(output.id))
            .map(|output| output.name.clone())
            .collect();

        let mut restored = Vec::new();
        let mut first_error = None;
        for name in disabled {
            match self.enable(&name) {
                Ok(_) => restored.push(name),
                Err(e) => {
                    warn!("Could not restore {}: {}", name, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(restored),
        }
    }

    /// Takes the current layout as the new reference. All outputs with a
    /// reference position have to be enabled, otherwise theirs would be lost.
    pub fn reset_layout(&mut self) -> Result<Vec<String>> {
        let snapshot = self.snapshot()?;
        let disabled: Vec<&str> = snapshot
            .connected_outputs()
            .filter(|output| !output.enabled && self.memory.knows(output.id))
            .map(|output| output.name.as_str())
            .collect();
        if !disabled.is_empty() {
            return Err(MonitoggleError::InvalidState(format!(
                "outputs {} are disabled, restore them first",
                disabled.join(", ")
            )));
        }

        self.memory.forget();
        self.snapshot()?;
        Ok(self.memory.output_names())
    }
}
