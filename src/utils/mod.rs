pub mod credit_ledger;
pub mod csv_export;
pub mod extractor;
pub mod jwt;
pub mod parameter_error_handler;
pub mod password;
pub mod retry;
pub mod sql;
pub mod validate;

pub use extractor::{SafeAnnouncementIdI64, SafeCourseIdI64, SafeSubmissionIdI64, SafeTicketIdI64};
pub use parameter_error_handler::{json_error_handler, query_error_handler};
pub use retry::{RetryConfig, Retryable, retry_with_backoff, with_timeout};
pub use sql::escape_like_pattern;
