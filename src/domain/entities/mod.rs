pub mod cluster;
pub mod extraction;
pub mod opportunity;
pub mod signal;
