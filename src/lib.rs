// Library target for benchmarks and integration tests. The binary entry point
// is main.rs; this file re-declares the module tree so harnesses can import
// types via `kochr::audio::*` / `kochr::engine::*` / `kochr::session::*`.

pub mod audio;
pub mod config;
pub mod engine;
pub mod session;
pub mod store;

// Private: only reachable from the binary
#[allow(dead_code)]
mod app;
#[allow(dead_code)]
mod event;
#[allow(dead_code)]
mod logging;
#[allow(dead_code)]
mod ui;
