// apps/sio_cli/src/commands/mod.rs

pub mod demo;
pub mod export;
pub mod inspect;
