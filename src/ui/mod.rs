//! Terminal front end: the event loop and the line renderer.

mod render;
mod terminal;

pub use render::{cleanup_progress, frame};
pub use terminal::run;
