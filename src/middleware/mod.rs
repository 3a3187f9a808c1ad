pub mod json;
pub mod response;
pub mod session;

pub use json::ApiJson;
pub use response::{ApiResponse, ApiResult};
pub use session::{require_session, SessionUser};
