//! Request middleware.

pub mod error_handling;
pub mod request_logging;

pub use error_handling::{ErrorHandlingLayer, ErrorResponder, ErrorResponse, HandlerError};
pub use request_logging::{RequestLoggingLayer, REQUEST_ID_HEADER, TRACE_CONTEXT_HEADER};
