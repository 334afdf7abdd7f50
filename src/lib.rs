//! Core library surface for the education portal administration TUI.
//!
//! The binary only wires these pieces together; the store, the material
//! library and the app state are usable on their own, which is how the tests
//! drive them.
pub mod config;
pub mod db;
pub mod logging;
pub mod materials;
pub mod models;
pub mod ui;

/// Persistence entry points used by `main.rs`.
pub use db::{open_store, PortalStore, PostgresStore, SqliteStore};

pub use materials::{
    attach_material, delete_material, open_material, MaterialError, MaterialLibrary,
};

pub use models::{Course, CourseMaterial, CourseStudent, Lookup, Student, Teacher};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
