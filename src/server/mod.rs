//! Request and response types exchanged with the dispatcher.
//!
//! The crate does not listen on a socket. An embedding server converts its
//! own request type into a [`Request`], calls
//! [`Dispatcher::handle`](crate::dispatcher::Dispatcher::handle) and writes
//! the returned [`Response`] back.

pub mod request;
pub mod response;

pub use request::{
    carries_body, normalize_path, parse_body, parse_query_params, Request, RequestContext,
};
pub use response::{HeaderVec, Response, MAX_INLINE_HEADERS};
