pub mod actor;
pub mod gate;
