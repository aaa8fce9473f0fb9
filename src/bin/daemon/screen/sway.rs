//! sway backend
//!
//! sway has no controllers of its own, so every output is modelled as
//! driving a synthetic controller whose id is derived from the output name.
//! Positions are written with `output` commands, priorities are not.

use std::collections::{BTreeMap, BTreeSet};

use swayipc::Connection as SwayConnection;
use tracing::{debug, info};

use crate::layout::geometry::{Point, Rect, Size};
use crate::layout::{CommitPlan, Connection, Controller, ControllerId, Output, OutputId, Snapshot, MODE_NONE};
use crate::screen::backend::{ApplyReport, DisplayBackend};
use crate::utils::error::{MonitoggleError, Result};

const BACKEND: &str = "Sway";

/// Mode handle of an active sway output; modes are never rewritten
const SWAY_MODE: u32 = 1;
const NORMAL_ROTATION: u16 = 1;

/// Stable id for an output name (32-bit FNV-1a)
fn name_id(name: &str) -> u32 {
    name.bytes()
        .fold(0x811c_9dc5_u32, |hash, byte| (hash ^ u32::from(byte)).wrapping_mul(0x0100_0193))
}

fn sway_error(e: impl std::fmt::Display) -> MonitoggleError {
    MonitoggleError::backend(BACKEND, e.to_string())
}

/// Builds one `output` command per controller in the plan
fn build_commands(plan: &CommitPlan, names: &BTreeMap<u32, String>) -> Vec<(ControllerId, std::result::Result<String, String>)> {
    plan.controllers
        .iter()
        .map(|(id, controller)| {
            let command = if controller.enabled {
                controller
                    .outputs
                    .iter()
                    .map(|output| {
                        names
                            .get(&output.0)
                            .map(|name| format!("output {} enable pos {} {}", name, controller.origin.x, controller.origin.y))
                            .ok_or_else(|| format!("unknown output {}", output))
                    })
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map(|commands| commands.join("; "))
            } else {
                names
                    .get(&id.0)
                    .map(|name| format!("output {} disable", name))
                    .ok_or_else(|| format!("unknown controller {}", id))
            };
            (*id, command)
        })
        .collect()
}

/// Models sway outputs given as `(name, active, rect)`. Each output drives
/// its own controller; priorities follow name order starting at 1.
fn build_snapshot<'a>(outputs: impl IntoIterator<Item = (&'a str, bool, Rect)>) -> Snapshot {
    let mut outputs: Vec<_> = outputs.into_iter().collect();
    outputs.sort_by(|a, b| a.0.cmp(b.0));

    let mut snapshot = Snapshot::new();
    for (index, (name, active, rect)) in outputs.into_iter().enumerate() {
        let id = name_id(name);
        if active {
            snapshot.add_controller(Controller {
                id: ControllerId(id),
                origin: rect.origin,
                size: rect.size,
                mode: SWAY_MODE,
                rotation: NORMAL_ROTATION,
                driven_outputs: BTreeSet::from([OutputId(id)]),
            });
        } else {
            snapshot.add_controller(Controller {
                id: ControllerId(id),
                origin: Point::default(),
                size: Size::default(),
                mode: MODE_NONE,
                rotation: NORMAL_ROTATION,
                driven_outputs: BTreeSet::new(),
            });
        }

        // sway only reports outputs that are plugged in
        snapshot.add_output(Output {
            id: OutputId(id),
            name: name.to_string(),
            physical_width_mm: 0,
            physical_height_mm: 0,
            connection: Connection::Connected,
            enabled: active,
            controller: active.then_some(ControllerId(id)),
            priority: u32::try_from(index).unwrap_or(u32::MAX - 1) + 1,
        });
    }
    snapshot
}

/// Backend implementation for sway
pub struct SwayBackend {
    /// Output name per synthetic id, as of the last fetch
    names: BTreeMap<u32, String>,
}

impl SwayBackend {
    /// Checks that sway answers on `SWAYSOCK`
    pub fn connect() -> Result<Self> {
        let mut connection = Self::get_connection()?;
        let version = connection.get_version().map_err(sway_error)?;
        info!("Connected to {}", version.human_readable);
        Ok(Self { names: BTreeMap::new() })
    }

    /// Helper method to get sway connection
    fn get_connection() -> Result<SwayConnection> {
        SwayConnection::new()
            .map_err(|e| MonitoggleError::backend(BACKEND, format!("Failed to connect to sway: {}", e)))
    }
}

impl DisplayBackend for SwayBackend {
    fn fetch(&mut self) -> Result<Snapshot> {
        let mut connection = Self::get_connection()?;
        let outputs = connection.get_outputs().map_err(sway_error)?;

        let snapshot = build_snapshot(outputs.iter().map(|output| {
            let size = Size::new(
                u32::try_from(output.rect.width).unwrap_or(0),
                u32::try_from(output.rect.height).unwrap_or(0),
            );
            let rect = Rect::new(Point::new(output.rect.x, output.rect.y), size);
            (output.name.as_str(), output.active, rect)
        }));
        self.names = snapshot
            .outputs
            .values()
            .map(|output| (output.id.0, output.name.clone()))
            .collect();

        debug!("Fetched {} sway outputs", snapshot.outputs.len());
        Ok(snapshot)
    }

    fn apply(&mut self, plan: &CommitPlan, _grab: bool) -> ApplyReport {
        let mut report = ApplyReport::new(BACKEND);
        if plan.controllers.is_empty() {
            return report;
        }

        let mut batch = Vec::new();
        for (id, command) in build_commands(plan, &self.names) {
            match command {
                Ok(command) => batch.push((id, command)),
                Err(message) => report.record(id, Err(message)),
            }
        }
        if batch.is_empty() {
            return report;
        }

        let joined = batch.iter().map(|(_, command)| command.as_str()).collect::<Vec<_>>().join("; ");
        debug!("Running sway command: {}", joined);

        let replies = match Self::get_connection().and_then(|mut connection| connection.run_command(&joined).map_err(sway_error)) {
            Ok(replies) => replies,
            Err(e) => {
                for (id, _) in &batch {
                    report.record(*id, Err(e.to_string()));
                }
                return report;
            }
        };

        // sway answers once per `;`-separated command, in order
        let mut replies = replies.into_iter();
        for (id, command) in &batch {
            let commands = command.split("; ").count();
            let outcome = replies
                .by_ref()
                .take(commands)
                .collect::<std::result::Result<Vec<()>, _>>()
                .map_err(|e| e.to_string())
                .and_then(|done| {
                    if done.len() == commands {
                        Ok(())
                    } else {
                        Err("sway did not answer every command".to_string())
                    }
                });
            report.record(*id, outcome);
        }
        report
    }

    fn backend_name(&self) -> &'static str {
        BACKEND
    }
}
