//! # Vialog
//!
//! A video annotation server: projects group videos, members leave
//! time-coded, threaded annotations, owners invite collaborators by email,
//! and annotations export as `;`-separated text. Usable both as a standalone
//! binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! vialog = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use chrono::Duration;
//! use vialog::auth::{PasswordHasher, TokenService};
//! use vialog::media::VideoStorage;
//! use vialog::notify::Notifier;
//! use vialog::server::{AppState, create_router};
//! use vialog::store::{SqliteStore, Store};
//!
//! let data_dir = PathBuf::from("./data");
//! let store = SqliteStore::new(data_dir.join("vialog.db")).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState {
//!     store: Arc::new(store),
//!     storage: VideoStorage::new(&data_dir),
//!     data_dir,
//!     public_base_url: "http://localhost:8080".to_string(),
//!     tokens: TokenService::new("session-secret", "invite-secret", Duration::days(7)).unwrap(),
//!     passwords: PasswordHasher::new(),
//!     notifier: Notifier::disabled(),
//! });
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): builds the `vialog` binary. Disable with `default-features = false`.

pub mod auth;
pub mod config;
pub mod error;
pub mod media;
pub mod notify;
pub mod server;
pub mod service;
pub mod store;
pub mod types;
