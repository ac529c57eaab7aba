#![allow(clippy::module_name_repetitions)]
//! Docker runtime discovery and image helpers.

pub mod images;
pub mod runtime;

pub use images::{
    image_exists, inspect_image_format, pull_image, remove_none_images, update_images,
    MaintenanceReport,
};
pub use runtime::container_runtime_path;
