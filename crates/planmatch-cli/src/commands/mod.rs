//! CLI command handlers

pub mod band;
pub mod prices;
pub mod recommend;
