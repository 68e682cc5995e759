pub mod auth;
pub mod request_id;

pub use auth::auth;
pub use request_id::{request_id, RequestId};
