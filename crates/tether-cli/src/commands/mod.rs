pub mod batch;
pub mod common;
pub mod deprovision;
pub mod provision;
pub mod status;
