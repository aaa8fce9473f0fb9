//! X11 RandR backend
//!
//! Talks the RandR protocol directly: outputs and CRTCs are read at one
//! configuration timestamp and written back one `SetCrtcConfig` per CRTC,
//! optionally inside a server grab.

use tracing::{debug, info, warn};
use x11rb::connection::Connection as _;
use x11rb::protocol::randr::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{ConnectionExt as _, Window};
use x11rb::rust_connection::RustConnection;

use crate::layout::geometry::{Point, Size};
use crate::layout::{CommitPlan, Connection, Controller, ControllerId, ControllerPlan, Output, OutputId, Snapshot, MODE_NONE};
use crate::screen::backend::{ApplyReport, DisplayBackend};
use crate::utils::error::{MonitoggleError, Result};

const BACKEND: &str = "X11";

/// Priority of the primary output; the others follow in resource order
const PRIMARY_PRIORITY: u32 = 1;

fn x_error(e: impl std::fmt::Display) -> MonitoggleError {
    MonitoggleError::backend(BACKEND, e.to_string())
}

fn map_connection(connection: randr::Connection) -> Connection {
    if connection == randr::Connection::CONNECTED {
        Connection::Connected
    } else if connection == randr::Connection::DISCONNECTED {
        Connection::Disconnected
    } else {
        Connection::Unknown
    }
}

/// An output is enabled when it is connected and its CRTC has a mode
fn output_enabled(connection: Connection, controller: Option<ControllerId>, snapshot: &Snapshot) -> bool {
    connection == Connection::Connected
        && controller
            .and_then(|id| snapshot.controllers.get(&id))
            .is_some_and(|crtc| crtc.mode != MODE_NONE)
}

/// Priorities of `outputs` in resource order: the primary output gets
/// `PRIMARY_PRIORITY`, the others count up from the next value.
fn assign_priorities(outputs: &[randr::Output], primary: randr::Output) -> Vec<u32> {
    let mut next_priority = PRIMARY_PRIORITY;
    outputs
        .iter()
        .map(|&output| {
            if output == primary {
                PRIMARY_PRIORITY
            } else {
                next_priority += 1;
                next_priority
            }
        })
        .collect()
}

/// Enabled output of `plan` with the lowest priority
fn primary_candidate(plan: &CommitPlan) -> Option<OutputId> {
    plan.outputs
        .iter()
        .filter(|(_, output)| output.enabled)
        .min_by_key(|(_, output)| output.priority.unwrap_or(u32::MAX))
        .map(|(id, _)| *id)
}

/// Holds the X server grabbed until dropped
struct ServerGrab<'a> {
    conn: &'a RustConnection,
}

impl<'a> ServerGrab<'a> {
    fn acquire(conn: &'a RustConnection) -> Result<Self> {
        conn.grab_server().map_err(x_error)?.check().map_err(x_error)?;
        debug!("X server grabbed");
        Ok(Self { conn })
    }
}

impl Drop for ServerGrab<'_> {
    fn drop(&mut self) {
        let released = self
            .conn
            .ungrab_server()
            .map_err(x_error)
            .and_then(|cookie| cookie.check().map_err(x_error));
        match released {
            Ok(()) => debug!("X server released"),
            Err(e) => warn!("Failed to release X server grab: {}", e),
        }
    }
}

/// Backend implementation for X11 through RandR 1.3+
pub struct XrandrBackend {
    conn: RustConnection,
    root: Window,
}

impl XrandrBackend {
    /// Connects to the X server named by `DISPLAY`
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None)
            .map_err(|e| MonitoggleError::backend(BACKEND, format!("Failed to connect to X server: {}", e)))?;
        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|screen| screen.root)
            .ok_or_else(|| MonitoggleError::backend(BACKEND, format!("screen {} does not exist", screen_num)))?;

        let version = conn
            .randr_query_version(1, 3)
            .map_err(x_error)?
            .reply()
            .map_err(x_error)?;
        if (version.major_version, version.minor_version) < (1, 3) {
            return Err(MonitoggleError::backend(
                BACKEND,
                format!(
                    "RandR {}.{} is too old, 1.3 is required",
                    version.major_version, version.minor_version
                ),
            ));
        }
        info!(
            "Connected to X server, screen {}, RandR {}.{}",
            screen_num, version.major_version, version.minor_version
        );

        Ok(Self { conn, root })
    }

    fn config_timestamp(&self) -> Result<u32> {
        Ok(self
            .conn
            .randr_get_screen_resources_current(self.root)
            .map_err(x_error)?
            .reply()
            .map_err(x_error)?
            .config_timestamp)
    }

    fn set_crtc(&self, id: ControllerId, plan: &ControllerPlan, config_timestamp: u32) -> std::result::Result<(), String> {
        let (x, y, mode) = if plan.enabled {
            let x = i16::try_from(plan.origin.x).map_err(|_| format!("x = {} is out of range", plan.origin.x))?;
            let y = i16::try_from(plan.origin.y).map_err(|_| format!("y = {} is out of range", plan.origin.y))?;
            (x, y, plan.mode)
        } else {
            (0, 0, x11rb::NONE)
        };
        let outputs: Vec<randr::Output> = plan.outputs.iter().map(|output| output.0).collect();

        debug!(
            "SetCrtcConfig {} at {}+{} mode {} outputs {:?}",
            id, x, y, mode, outputs
        );
        let reply = self
            .conn
            .randr_set_crtc_config(
                id.0,
                x11rb::CURRENT_TIME,
                config_timestamp,
                x,
                y,
                mode,
                randr::Rotation::from(plan.rotation),
                &outputs,
            )
            .map_err(|e| e.to_string())?
            .reply()
            .map_err(|e| e.to_string())?;

        if reply.status == randr::SetConfig::SUCCESS {
            Ok(())
        } else {
            Err(format!("SetCrtcConfig returned {:?}", reply.status))
        }
    }

    /// Makes the enabled output with the lowest priority the primary one
    fn update_primary(&self, plan: &CommitPlan) -> Result<()> {
        let Some(first) = primary_candidate(plan) else {
            return Ok(());
        };

        let current = self
            .conn
            .randr_get_output_primary(self.root)
            .map_err(x_error)?
            .reply()
            .map_err(x_error)?
            .output;
        if current != first.0 {
            self.conn
                .randr_set_output_primary(self.root, first.0)
                .map_err(x_error)?
                .check()
                .map_err(x_error)?;
            info!("Primary output set to {}", first);
        }
        Ok(())
    }
}

impl DisplayBackend for XrandrBackend {
    fn fetch(&mut self) -> Result<Snapshot> {
        let resources = self
            .conn
            .randr_get_screen_resources_current(self.root)
            .map_err(x_error)?
            .reply()
            .map_err(x_error)?;
        let primary = self
            .conn
            .randr_get_output_primary(self.root)
            .map_err(x_error)?
            .reply()
            .map_err(x_error)?
            .output;

        let mut snapshot = Snapshot::new();

        for &crtc in &resources.crtcs {
            let info = self
                .conn
                .randr_get_crtc_info(crtc, resources.config_timestamp)
                .map_err(x_error)?
                .reply()
                .map_err(x_error)?;
            snapshot.add_controller(Controller {
                id: ControllerId(crtc),
                origin: Point::new(info.x.into(), info.y.into()),
                size: Size::new(info.width.into(), info.height.into()),
                mode: info.mode,
                rotation: u16::from(info.rotation),
                driven_outputs: info.outputs.iter().map(|&output| OutputId(output)).collect(),
            });
        }

        let priorities = assign_priorities(&resources.outputs, primary);
        for (&output, priority) in resources.outputs.iter().zip(priorities) {
            let info = self
                .conn
                .randr_get_output_info(output, resources.config_timestamp)
                .map_err(x_error)?
                .reply()
                .map_err(x_error)?;

            let connection = map_connection(info.connection);
            let controller = (info.crtc != x11rb::NONE).then_some(ControllerId(info.crtc));
            let enabled = output_enabled(connection, controller, &snapshot);

            snapshot.add_output(Output {
                id: OutputId(output),
                name: String::from_utf8_lossy(&info.name).into_owned(),
                physical_width_mm: info.mm_width,
                physical_height_mm: info.mm_height,
                connection,
                enabled,
                controller,
                priority,
            });
        }

        debug!(
            "Fetched {} outputs and {} CRTCs at config time {}",
            snapshot.outputs.len(),
            snapshot.controllers.len(),
            resources.config_timestamp
        );
        Ok(snapshot)
    }

    fn apply(&mut self, plan: &CommitPlan, grab: bool) -> ApplyReport {
        let mut report = ApplyReport::new(BACKEND);
        if plan.controllers.is_empty() {
            return report;
        }

        let config_timestamp = match self.config_timestamp() {
            Ok(timestamp) => timestamp,
            Err(e) => {
                for id in plan.controllers.keys() {
                    report.record(*id, Err(e.to_string()));
                }
                return report;
            }
        };

        {
            let _grab = if grab {
                match ServerGrab::acquire(&self.conn) {
                    Ok(guard) => Some(guard),
                    Err(e) => {
                        warn!("Applying without server grab: {}", e);
                        None
                    }
                }
            } else {
                None
            };

            for (id, controller_plan) in &plan.controllers {
                report.record(*id, self.set_crtc(*id, controller_plan, config_timestamp));
            }
        }

        if report.is_success() {
            if let Err(e) = self.update_primary(plan) {
                warn!("Could not update primary output: {}", e);
            }
        }
        report
    }

    fn backend_name(&self) -> &'static str {
        BACKEND
    }
}
