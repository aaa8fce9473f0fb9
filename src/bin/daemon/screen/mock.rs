//! In-memory display server used by the tests.
//!
//! It behaves like a live backend: applying a plan moves controllers and
//! switches outputs, and disabled outputs lose their controller geometry.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::layout::geometry::{Point, Size};
use crate::layout::{CommitPlan, Connection, Controller, ControllerId, Output, OutputId, Snapshot, MODE_NONE};
use crate::screen::backend::{ApplyReport, DisplayBackend};
use crate::utils::error::{MonitoggleError, Result};

pub struct MockBackend {
    pub live: Snapshot,
    /// Size of every mode handle the mock knows
    pub modes: BTreeMap<u32, Size>,
    pub failing_controllers: BTreeSet<ControllerId>,
    pub fail_fetch: bool,
    /// Refuse every fetch once a plan was applied
    pub fail_fetch_after_apply: bool,
    pub applied: Vec<(CommitPlan, bool)>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            live: Snapshot::new(),
            modes: BTreeMap::new(),
            failing_controllers: BTreeSet::new(),
            fail_fetch: false,
            fail_fetch_after_apply: false,
            applied: Vec::new(),
        }
    }

    /// Adds a connected, enabled output on its own controller
    pub fn with_monitor(mut self, id: u32, name: &str, x: i32, y: i32, width: u32, height: u32, priority: u32) -> Self {
        let mode = 100 + id;
        self.modes.insert(mode, Size::new(width, height));
        self.live.add_output(Output {
            id: OutputId(id),
            name: name.to_string(),
            physical_width_mm: width / 4,
            physical_height_mm: height / 4,
            connection: Connection::Connected,
            enabled: true,
            controller: Some(ControllerId(id + 10)),
            priority,
        });
        self.live.add_controller(Controller {
            id: ControllerId(id + 10),
            origin: Point::new(x, y),
            size: Size::new(width, height),
            mode,
            rotation: 1,
            driven_outputs: BTreeSet::from([OutputId(id)]),
        });
        self
    }

    pub fn origin(&self, name: &str) -> Option<Point> {
        let output = self.live.outputs.values().find(|output| output.name == name)?;
        let controller = output.controller?;
        Some(self.live.controllers[&controller].origin)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.live
            .outputs
            .values()
            .any(|output| output.name == name && output.enabled)
    }

    pub fn priority(&self, name: &str) -> Option<u32> {
        self.live
            .outputs
            .values()
            .find(|output| output.name == name)
            .map(|output| output.priority)
    }
}

impl DisplayBackend for MockBackend {
    fn fetch(&mut self) -> Result<Snapshot> {
        if self.fail_fetch {
            return Err(MonitoggleError::backend("Mock", "fetch refused"));
        }
        Ok(self.live.clone())
    }

    fn apply(&mut self, plan: &CommitPlan, grab: bool) -> ApplyReport {
        self.applied.push((plan.clone(), grab));
        let mut report = ApplyReport::new("Mock");

        for (id, controller_plan) in &plan.controllers {
            if self.failing_controllers.contains(id) {
                report.record(*id, Err("controller refused the configuration".to_string()));
                continue;
            }
            let Some(controller) = self.live.controllers.get_mut(id) else {
                report.record(*id, Err("unknown controller".to_string()));
                continue;
            };

            for output in &controller.driven_outputs {
                if let Some(output) = self.live.outputs.get_mut(output) {
                    output.enabled = false;
                    output.controller = None;
                }
            }

            if controller_plan.enabled {
                controller.origin = controller_plan.origin;
                controller.mode = controller_plan.mode;
                controller.rotation = controller_plan.rotation;
                controller.size = self.modes.get(&controller_plan.mode).copied().unwrap_or_default();
                controller.driven_outputs = controller_plan.outputs.iter().copied().collect();
                for output in &controller_plan.outputs {
                    if let Some(output) = self.live.outputs.get_mut(output) {
                        output.enabled = true;
                        output.controller = Some(*id);
                    }
                }
            } else {
                controller.origin = Point::default();
                controller.mode = MODE_NONE;
                controller.size = Size::default();
                controller.driven_outputs.clear();
            }
            report.record(*id, Ok(()));
        }

        for (id, output_plan) in &plan.outputs {
            if let (Some(output), Some(priority)) = (self.live.outputs.get_mut(id), output_plan.priority) {
                output.priority = priority;
            }
        }

        self.fail_fetch |= self.fail_fetch_after_apply;
        report
    }

    fn backend_name(&self) -> &'static str {
        "Mock"
    }
}

/// Handle that keeps the mock inspectable after a switcher took ownership
#[derive(Clone)]
pub struct SharedMock(Arc<Mutex<MockBackend>>);

impl SharedMock {
    pub fn new(mock: MockBackend) -> Self {
        Self(Arc::new(Mutex::new(mock)))
    }

    pub fn lock(&self) -> MutexGuard<'_, MockBackend> {
        self.0.lock().unwrap()
    }
}

impl DisplayBackend for SharedMock {
    fn fetch(&mut self) -> Result<Snapshot> {
        self.lock().fetch()
    }

    fn apply(&mut self, plan: &CommitPlan, grab: bool) -> ApplyReport {
        self.lock().apply(plan, grab)
    }

    fn backend_name(&self) -> &'static str {
        "Mock"
    }
}
