//! Utility modules shared by the tasks and the dev server.

pub mod exec;
pub mod fs;
pub mod glob;
pub mod html;
pub mod mime;
