// Application layer: wires configuration, storage and core logic into the CLI and HTTP entry points.

#[cfg(feature = "cli")]
pub mod commands;
pub mod context;
pub mod server;
