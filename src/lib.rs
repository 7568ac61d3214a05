//! # restserver
//!
//! **restserver** is a small REST dispatcher. Controllers describe their routes with
//! annotations (`url: GET /users/$id`, `noAuth`, ...), the dispatcher compiles them into a
//! route table, matches requests, negotiates the response format and language, calls the
//! handler with positionally bound arguments and serializes its result as JSON, JSONP or XML.
//!
//! ## Architecture
//!
//! - **[`meta`]** - Controller, method, parameter and annotation metadata
//! - **[`router`]** - Route compilation, matching and argument binding
//! - **[`dispatcher`]** - Request state machine, error responses and CORS preflight
//! - **[`controller`]** - The [`Controller`](controller::Controller) trait and handler binding
//! - **[`negotiation`]** - `Accept` / `Accept-Language` priority lists
//! - **[`format`]** - Response formats and their MIME types
//! - **[`language`]** - Response language negotiation
//! - **[`serializer`]** - JSON, JSONP and XML rendering
//! - **[`server`]** - Request and response types exchanged with an embedding HTTP server
//! - **[`cache`]** - Route table stores (file and memory)
//! - **[`config`]** - Server configuration from code, environment or file
//! - **[`manifest`]** - Controller metadata loaded from YAML, JSON or TOML
//! - **[`logging`]** - `tracing` subscriber setup
//! - **[`cli`]** - The `restserver` command-line tool
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Server as Embedding server
//!     participant Dispatcher
//!     participant Router as RouteTable
//!     participant Controller
//!     participant Serializer
//!
//!     Server->>Dispatcher: handle(Request)
//!     Dispatcher->>Dispatcher: path, format, body
//!     Dispatcher->>Router: route(method, path, body)
//!     alt no route
//!         Router-->>Dispatcher: None
//!         Dispatcher-->>Server: 404, or CORS preflight for OPTIONS
//!     else matched
//!         Router-->>Dispatcher: RouteMatch (args)
//!         Dispatcher->>Controller: init, authorize
//!         Dispatcher->>Controller: handler(args, language)
//!         Controller-->>Dispatcher: Value or RestError
//!         Dispatcher->>Serializer: send(value, format)
//!         Dispatcher-->>Server: Response
//!     end
//! ```
//!
//! ## Quick Start
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
//! struct Greeter;
//! impl Controller for Greeter {}
//!
//! let greeter = ControllerBuilder::new("Greeter", Greeter::default).method(
//!     MethodMeta::new("hello")
//!         .url(Method::GET, "/hello")
//!         .url(Method::GET, "/hello/$name")
//!         .param_with_default("name", json!("world")),
//!     |_greeter: &mut Greeter, inv| Ok(json!({ "greeting": format!("hello {}", inv.args.str(0).unwrap_or("")) })),
//! );
//!
//! let mut dispatcher = Dispatcher::with_store(ServerConfig::new(Mode::Debug), Box::new(MemoryStore::new()));
//! dispatcher.add_controller(greeter, "").unwrap();
//!
//! let response = dispatcher.handle(&Request::new(Method::GET, "/hello.xml"));
//! assert_eq!(response.get_header("Content-Type"), Some("application/xml"));
//! assert!(response.body.ends_with("<result><greeting>hello world</greeting></result>"));
//! ```
//!
//! ## Modes
//!
//! In [`Mode::Production`](config::Mode::Production) the compiled route table is read
//! from a [`RouteStore`](cache::RouteStore) on start and written back with
//! [`Dispatcher::persist`](dispatcher::Dispatcher::persist); error responses carry only the
//! status reason. [`Mode::Debug`](config::Mode::Debug) always rebuilds routes and adds error
//! details to responses.

pub mod cache;
pub mod cli;
pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod format;
pub mod language;
pub mod logging;
pub mod manifest;
pub mod meta;
pub mod negotiation;
pub mod router;
pub mod serializer;
pub mod server;

pub use config::{Mode, ServerConfig};
pub use controller::{Controller, ControllerBuilder, HandlerResult, Invocation};
pub use dispatcher::Dispatcher;
pub use error::{ConfigError, RestError};
pub use format::Format;
pub use language::Language;
pub use meta::{ControllerMeta, MethodMeta};
pub use server::{Request, Response};
