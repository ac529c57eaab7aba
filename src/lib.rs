//! dockertools: host-side Docker maintenance.
//!
//! - `snapshot`: back up volumes through an ephemeral helper container.
//! - `detector`: decide whether base images moved past a published package.
//! - `inventory`: volume to container mappings.
//! - `docker`: image helpers plus `update-images` / `remove-none-images`.
//! - `tags`: registry tag listing.
//!
//! All runtime access goes through [`runner::CommandRunner`].

pub mod color;
pub mod config;
pub mod detector;
pub mod docker;
pub mod errors;
pub mod inventory;
pub mod runner;
pub mod snapshot;
pub mod tags;
pub mod telemetry;
pub mod timestamp;
pub mod util;

pub use color::{
    color_enabled_stderr, log_error_stderr, log_info_stderr, log_warn_stderr, paint,
    set_color_mode, ColorMode,
};
pub use config::{package_tag_from_env, Config};
pub use detector::{
    check_images, extract_from_images, probe_timestamp, run_update_check, set_output_line,
    CheckOutcome, ImageCheck, Progress, UpdateCheckConfig, UpdateReport,
};
pub use docker::{
    container_runtime_path, image_exists, remove_none_images, update_images, MaintenanceReport,
};
pub use errors::{
    display_for_snapshot_error, exit_code_for_anyhow, exit_code_for_io_error,
    exit_code_for_snapshot_error, SnapshotError,
};
pub use inventory::{volume_mappings, VolumeMapping, UNMAPPED};
pub use runner::{CommandOutput, CommandRunner, Invocation, ScriptedRunner, SystemRunner};
pub use snapshot::{
    ensure_helper_image, resolve_volumes, snapshot_volumes, SnapshotArgs, SnapshotEvent,
    SnapshotJob, SnapshotOptions, SnapshotPlan, SnapshotSummary, VolumeSelection,
};
pub use tags::list_tags;
pub use telemetry::telemetry_init;
pub use timestamp::{normalize_timestamp, NormalizedTimestamp};
