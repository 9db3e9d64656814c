//! Codesplain backend: turns a submitted code snippet into a beginner-oriented
//! explanation package (explanation, flow diagram, execution trace, quiz set),
//! with layered fallbacks around the model call and the row store so the
//! explain endpoint always answers with usable content.

pub mod auth;
pub mod config;
pub mod domain;
pub mod heuristic;
pub mod logic;
pub mod model;
pub mod persist;
pub mod protocol;
pub mod routes;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod util;
