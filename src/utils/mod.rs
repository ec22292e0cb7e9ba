//! Utility module - shared error types, result alias and logging

pub mod error;
pub mod logger;
pub mod result;
pub mod types;

pub use error::{AppError, AppResponse, ok, ok_with_message};
pub use result::AppResult;
pub use types::{PageQuery, Paginated, Pagination};
