//! # Dispatcher Module
//!
//! The dispatcher owns the route table and the attached controllers and
//! turns a [`Request`](crate::server::Request) into a
//! [`Response`](crate::server::Response).
//!
//! ## Request Flow
//!
//! 1. **Routing** - path, response format and body are derived from the
//!    request and the route table is searched. An unmatched `OPTIONS`
//!    request is answered by the [`cors`] preflight responder; any other
//!    miss is a 404.
//! 2. **Authorizing** - skipped for methods annotated with `noAuth`.
//!    Otherwise the server-wide hook decides, or the controller's own
//!    [`Controller::authorize`](crate::controller::Controller::authorize)
//!    when no hook is set.
//! 3. **Invoking** - the handler runs with its positional arguments;
//!    language parameters receive the negotiated
//!    [`Language`](crate::language::Language).
//! 4. **Responding** - a non-empty result is serialized in the negotiated
//!    format and `Content-Language` is added.
//!
//! ## Error Handling
//!
//! Every failure ends as an error response. A handler registered with
//! [`Dispatcher::add_error_handler`] for the status takes over; otherwise the
//! body is `{"error":{"code":404,"message":"Not Found"}}`. In debug mode the
//! message also carries the error detail.
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use restserver::cache::MemoryStore;
//! use restserver::config::{Mode, ServerConfig};
//! use restserver::controller::{Controller, ControllerBuilder};
//! use restserver::dispatcher::Dispatcher;
//! use restserver::meta::MethodMeta;
//! use restserver::server::Request;
//! use serde_json::json;
//!
//! #[derive(Default)]
//! struct Users;
//! impl Controller for Users {}
//!
//! let mut dispatcher = Dispatcher::with_store(
//!     ServerConfig::new(Mode::Debug),
//!     Box::new(MemoryStore::new()),
//! );
//! dispatcher
//!     .add_controller(
//!         ControllerBuilder::new("Users", Users::default).method(
//!             MethodMeta::new("show").url(Method::GET, "/$id").param("id"),
//!             |_users: &mut Users, inv| Ok(json!({ "id": inv.args.str(0) })),
//!         ),
//!         "users",
//!     )
//!     .unwrap();
//!
//! let response = dispatcher.handle(&Request::new(Method::GET, "/users/42"));
//! assert_eq!(response.status, 200);
//! assert_eq!(response.body, r#"{"id":"42"}"#);
//! ```

mod core;
pub mod cors;

pub use core::{Dispatcher, ErrorHandler};
