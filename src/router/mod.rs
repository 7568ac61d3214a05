//! # Router Module
//!
//! The router turns controller metadata into a route table and matches
//! incoming requests against it.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Building route patterns from the server root, a controller's base path
//!   and each `url` declaration
//! - Compiling parameterized patterns (`$name`, `$name...`) into regexes
//! - Matching requests and binding captures, the request body and parameter
//!   defaults to handler argument positions
//! - Reporting which methods exist for a path (used by CORS preflight)
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use restserver::meta::{ControllerMeta, MethodMeta};
//! use restserver::router::RouteTable;
//!
//! let meta = ControllerMeta::new("Users")
//!     .method(MethodMeta::new("get").url(Method::GET, "/$id").param("id"));
//!
//! let mut table = RouteTable::new();
//! table.register("api", "users", &meta).unwrap();
//!
//! let m = table.route(&Method::GET, "api/users/42", None).unwrap();
//! assert_eq!(m.get_path_param("id"), Some("42"));
//! assert_eq!(m.args.str(0), Some("42"));
//! ```

mod args;
mod core;
mod pattern;
mod route;

pub use args::{Arg, Args, MAX_INLINE_ARGS};
pub use core::{
    normalize_base_path, normalize_root, ParamVec, RouteMatch, RouteTable, MAX_INLINE_PARAMS,
    ROUTE_CACHE_KEY,
};
pub use pattern::{is_parameterized, pattern_to_regex, placeholders, Placeholder};
pub use route::{HandlerRef, Route, ROUTABLE_METHODS};
