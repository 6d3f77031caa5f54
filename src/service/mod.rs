//! Domain operations shared by the HTTP handlers and the CLI.
//!
//! Everything here works against `&dyn Store` and returns
//! [`crate::error::Result`]; mapping to HTTP statuses happens in
//! `server::response`.

pub mod access;
pub mod annotations;
pub mod credentials;
pub mod invitations;
pub mod projects;
pub mod validation;
pub mod videos;
