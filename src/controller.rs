//! Controllers and handler binding.
//!
//! A controller is any type implementing [`Controller`]. Its routes are
//! described by [`ControllerMeta`] and each routed method is bound to a
//! handler function through a [`ControllerBuilder`]:
//!
//! ```rust
//! use http::Method;
//! use restserver::controller::{Controller, ControllerBuilder};
//! use restserver::meta::MethodMeta;
//! use serde_json::json;
//!
//! #[derive(Default)]
//! struct Users;
//! impl Controller for Users {}
//!
//! let users = ControllerBuilder::new("Users", Users::default).method(
//!     MethodMeta::new("show").url(Method::GET, "/$id").param("id"),
//!     |_users: &mut Users, inv| Ok(json!({ "id": inv.args.str(0) })),
//! );
//! assert_eq!(users.name(), "Users");
//! ```

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error};

use crate::error::{ConfigError, RestError};
use crate::language::Language;
use crate::meta::{Annotations, ControllerMeta, MethodMeta};
use crate::router::{Args, Route};
use crate::server::response::replace_header;
use crate::server::{HeaderVec, RequestContext};

/// What a handler returns
pub type HandlerResult = Result<Value, RestError>;

/// Hook deciding whether a request may proceed
pub type AuthHook = dyn Fn(&RequestContext<'_>) -> bool + Send + Sync;

/// Behaviour shared by all controllers
pub trait Controller: Send + 'static {
    /// Runs before authorization on every request the controller serves
    fn init(&mut self) {}

    /// Per-controller authorization, used when no server-wide hook is set
    fn authorize(&self, _request: &RequestContext<'_>) -> bool {
        true
    }
}

/// Everything a handler gets besides its controller
pub struct Invocation<'r, 'a> {
    /// Positional arguments in declaration order
    pub args: Args,
    request: &'r RequestContext<'a>,
    route: &'r Route,
    language: &'r Language,
    realm: &'r str,
    headers: HeaderVec,
}

impl<'r, 'a> Invocation<'r, 'a> {
    pub(crate) fn new(
        args: Args,
        request: &'r RequestContext<'a>,
        route: &'r Route,
        language: &'r Language,
        realm: &'r str,
    ) -> Self {
        Self {
            args,
            request,
            route,
            language,
            realm,
            headers: HeaderVec::new(),
        }
    }

    #[must_use]
    pub fn request(&self) -> &'r RequestContext<'a> {
        self.request
    }

    /// The negotiated response language
    #[must_use]
    pub fn language(&self) -> &'r Language {
        self.language
    }

    /// Annotations of the matched route
    #[must_use]
    pub fn annotations(&self) -> &'r Annotations {
        &self.route.annotations
    }

    /// Set a response header
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        replace_header(&mut self.headers, name, value.into());
    }

    /// Denial error for the handler to return; with `ask` the client is
    /// challenged for Basic credentials
    pub fn unauthorized(&mut self, ask: bool) -> RestError {
        if ask {
            self.set_header(
                "WWW-Authenticate",
                format!("Basic realm=\"{}\"", self.realm),
            );
        }
        RestError::unauthorized()
    }

    pub(crate) fn into_headers(self) -> HeaderVec {
        self.headers
    }
}

/// Handler bound to a controller method
pub type Handler<C> = Arc<dyn Fn(&mut C, &mut Invocation<'_, '_>) -> HandlerResult + Send + Sync>;

enum Source<C> {
    Factory(Box<dyn Fn() -> C + Send + Sync>),
    Instance(C),
}

/// Binds a controller's metadata to its handlers
pub struct ControllerBuilder<C: Controller> {
    meta: ControllerMeta,
    source: Source<C>,
    handlers: HashMap<String, Handler<C>>,
}

impl<C: Controller> ControllerBuilder<C> {
    /// A fresh controller is created by `factory` for every request
    pub fn new(name: impl Into<String>, factory: impl Fn() -> C + Send + Sync + 'static) -> Self {
        Self::from_meta(ControllerMeta::new(name), factory)
    }

    /// Every request is served by the same controller instance
    pub fn instance(name: impl Into<String>, controller: C) -> Self {
        Self {
            meta: ControllerMeta::new(name),
            source: Source::Instance(controller),
            handlers: HashMap::new(),
        }
    }

    /// Start from metadata loaded elsewhere (e.g. a manifest) and bind its
    /// methods with [`bind`](Self::bind)
    pub fn from_meta(meta: ControllerMeta, factory: impl Fn() -> C + Send + Sync + 'static) -> Self {
        Self {
            meta,
            source: Source::Factory(Box::new(factory)),
            handlers: HashMap::new(),
        }
    }

    /// Declare a method and bind its handler
    #[must_use]
    pub fn method<F>(mut self, meta: MethodMeta, handler: F) -> Self
    where
        F: Fn(&mut C, &mut Invocation<'_, '_>) -> HandlerResult + Send + Sync + 'static,
    {
        let name = meta.name.clone();
        match self.meta.methods.iter_mut().find(|m| m.name == name) {
            Some(existing) => *existing = meta,
            None => self.meta.methods.push(meta),
        }
        self.handlers.insert(name, Arc::new(handler));
        self
    }

    /// Bind a handler to a method already present in the metadata
    #[must_use]
    pub fn bind<F>(mut self, method: &str, handler: F) -> Self
    where
        F: Fn(&mut C, &mut Invocation<'_, '_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.handlers.insert(method.to_string(), Arc::new(handler));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.meta.name
    }

    #[must_use]
    pub fn meta(&self) -> &ControllerMeta {
        &self.meta
    }

    /// Check that metadata and handlers agree and erase the controller type.
    pub(crate) fn into_host(self) -> Result<(ControllerMeta, Box<dyn ControllerHost>), ConfigError> {
        for name in self.handlers.keys() {
            if self.meta.find_method(name).is_none() {
                return Err(ConfigError::UnknownHandler {
                    controller: self.meta.name.clone(),
                    method: name.clone(),
                });
            }
        }
        for method in &self.meta.methods {
            if !method.annotations.urls().is_empty() && !self.handlers.contains_key(&method.name) {
                return Err(ConfigError::MissingHandler {
                    controller: self.meta.name.clone(),
                    method: method.name.clone(),
                });
            }
        }

        let host = Host {
            name: self.meta.name.clone(),
            source: self.source,
            handlers: self.handlers,
        };
        Ok((self.meta, Box::new(host)))
    }
}

/// How the host authorizes a call
pub(crate) enum Authorization<'h> {
    Skip,
    ServerWide(&'h AuthHook),
    Controller,
}

/// Failure of a hosted call
#[derive(Debug)]
pub(crate) enum InvokeError {
    Unauthorized,
    Failed(RestError),
}

/// Type-erased controller owned by the dispatcher
pub(crate) trait ControllerHost: Send {
    fn invoke(
        &mut self,
        method: &str,
        auth: Authorization<'_>,
        invocation: &mut Invocation<'_, '_>,
    ) -> Result<Value, InvokeError>;
}

struct Host<C: Controller> {
    name: String,
    source: Source<C>,
    handlers: HashMap<String, Handler<C>>,
}

impl<C: Controller> ControllerHost for Host<C> {
    fn invoke(
        &mut self,
        method: &str,
        auth: Authorization<'_>,
        invocation: &mut Invocation<'_, '_>,
    ) -> Result<Value, InvokeError> {
        let handler = self.handlers.get(method).ok_or_else(|| {
            error!(controller = %self.name, method = %method, "Handler not found");
            InvokeError::Failed(RestError::not_found())
        })?;

        let mut fresh: C;
        let controller: &mut C = match &mut self.source {
            Source::Factory(factory) => {
                fresh = factory();
                &mut fresh
            }
            Source::Instance(instance) => instance,
        };

        controller.init();

        let allowed = match auth {
            Authorization::Skip => true,
            Authorization::ServerWide(hook) => hook(invocation.request()),
            Authorization::Controller => controller.authorize(invocation.request()),
        };
        if !allowed {
            return Err(InvokeError::Unauthorized);
        }

        debug!(controller = %self.name, method = %method, "Invoking handler");
        match catch_unwind(AssertUnwindSafe(|| handler(controller, invocation))) {
            Ok(result) => result.map_err(InvokeError::Failed),
            Err(panic) => {
                error!(
                    controller = %self.name,
                    method = %method,
                    panic = ?panic,
                    "Handler panicked"
                );
                Err(InvokeError::Failed(RestError::new(500, "Handler panicked")))
            }
        }
    }
}
