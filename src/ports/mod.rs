//! Ports - Traits at the seams between the core and its collaborators.

pub mod detector;
pub mod repository;
pub mod video;
