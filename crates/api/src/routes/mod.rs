//! HTTP Routes

pub mod actions;
pub mod alerts;
pub mod push;
