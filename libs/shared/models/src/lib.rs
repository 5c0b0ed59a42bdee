pub mod error;
pub mod response;

pub use error::{panic_response, AppError};
pub use response::ApiStatus;
