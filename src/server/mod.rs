mod admin;
pub mod dto;
pub mod response;
mod router;
mod uploads;
mod user;

pub use admin::admin_router;
pub use router::{AppState, create_router};
pub use user::{MAX_UPLOAD_SIZE, user_router};
