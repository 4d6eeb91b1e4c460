// Library root
// -----------
// This crate exposes the analytics catalog client used by the `analytics`
// binary. `main.rs` only parses arguments, sets up logging and hands off
// to `commands`.
//
// Module responsibilities:
// - `api`: blocking HTTP transport bound to the catalog base URL.
// - `session`: service ids and bearer token, persisted between runs.
// - `host`: the cf CLI the tool runs beside (login state, bound services).
// - `auth`: credential prompting and the OAuth2 token exchange seams.
// - `resolver`: analytic and artifact name to id lookup.
// - `poller`: validation and deployment status polling.
// - `taxonomy`: taxonomy nodes, path parsing and rendering.
// - `catalog`: the catalog verbs built on the modules above.
// - `curl`: authenticated passthrough requests.
// - `cli`, `commands`, `ui`: argument parsing, dispatch and terminal output.
pub mod api;
pub mod auth;
pub mod catalog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod curl;
pub mod error;
pub mod host;
pub mod poller;
pub mod resolver;
pub mod session;
pub mod taxonomy;
pub mod ui;

pub use error::{CatalogError, Result};
