//! Tracing extensions for warp operations.
//!
//! Solving and mesh warping emit spans and timing events through `tracing`.
//! Nothing is printed unless the host application installs a subscriber:
//!
//! ```
//! use tracing_subscriber::{fmt, prelude::*, EnvFilter};
//!
//! tracing_subscriber::registry()
//!     .with(fmt::layer())
//!     .with(EnvFilter::from_default_env())
//!     .try_init()
//!     .ok();
//!
//! // RUST_LOG=tps_warp=debug for solver details
//! ```
//!
//! # Targets
//!
//! - `tps_warp::timing`: operation durations
//! - `tps_warp::solver`: system sizes and fallbacks
//! - `tps_warp::mesh_state`: mesh dimensions
//! - `tps_warp::io`: file loads and saves

use std::time::Instant;
use tracing::span::EnteredSpan;
use tracing::{debug, info, warn};

/// Drop guard around a solve or warp.
///
/// Enters an `info` span tagged with the problem size for its lifetime and
/// logs the elapsed time when dropped.
///
/// ```
/// use tps_warp::tracing_ext::OperationTimer;
///
/// let timer = OperationTimer::with_context("warp_points", 12, 4096);
/// assert!(timer.elapsed_ms() >= 0.0);
/// ```
pub struct OperationTimer {
    name: &'static str,
    start: Instant,
    _span: EnteredSpan,
}

impl OperationTimer {
    /// Start timing `name` over `landmark_count` landmarks and `point_count` points.
    pub fn with_context(name: &'static str, landmark_count: usize, point_count: usize) -> Self {
        let span = tracing::info_span!(
            "warp_operation",
            operation = name,
            landmarks = landmark_count,
            points = point_count
        );
        debug!(
            target: "tps_warp::timing",
            operation = name,
            landmarks = landmark_count,
            points = point_count,
            "Starting operation"
        );
        Self {
            name,
            start: Instant::now(),
            _span: span.entered(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        let elapsed_ms = self.elapsed_ms();
        info!(
            target: "tps_warp::timing",
            operation = self.name,
            elapsed_ms = format!("{:.2}", elapsed_ms),
            "Operation completed"
        );
    }
}

/// Log vertex/face counts and extent at debug level.
pub fn log_mesh_stats(mesh: &crate::Mesh, context: &str) {
    let extent = mesh.bounds().map(|(min, max)| max - min).unwrap_or_default();

    debug!(
        target: "tps_warp::mesh_state",
        context,
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        extent = format!("{:.3} x {:.3} x {:.3}", extent.x, extent.y, extent.z),
        "Mesh state"
    );
}

/// Log the outcome of a mesh or landmark file load/save.
pub fn log_io_operation(operation: &str, path: &std::path::Path, format: Option<&str>, success: bool) {
    let path = path.display();
    let format = format.unwrap_or("auto");

    if success {
        info!(target: "tps_warp::io", operation, %path, format, "I/O operation completed");
    } else {
        warn!(target: "tps_warp::io", operation, %path, format, "I/O operation failed");
    }
}
