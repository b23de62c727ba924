//! Ruutupaperi highscore service
//!
//! A small axum service that validates final scores against their line
//! lists and keeps the best ones in SQLite, plus the client the game uses
//! to reach it.
//!
//! Endpoints:
//! - `GET  /api/highscores` stored records, best first
//! - `POST /api/highscores` submit `{score, lines: [{key}]}`
//! - `GET  /health`

pub mod client;
pub mod config;
pub mod error;
pub mod server;
pub mod store;

pub use client::{HighscoreClient, Highscores, LocalHighscores, Source};
pub use config::Config;
pub use error::{ApiError, ErrorModel, PersistenceError};
pub use server::{app, HealthModel, SubmitResponse};
pub use store::HighscoreStore;
