//! Ratatui front-end. `App` owns the grids and the modal state; `run_app`
//! drives it from crossterm events.

mod app;
mod forms;
mod helpers;
mod screens;
mod terminal;

pub use app::App;
pub use terminal::run_app;
