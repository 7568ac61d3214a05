use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::cache::{FileStore, RouteStore};
use crate::config::{Mode, ServerConfig};
use crate::controller::{
    AuthHook, Authorization, Controller, ControllerBuilder, ControllerHost, InvokeError, Invocation,
};
use crate::error::{ConfigError, RestError};
use crate::format::Format;
use crate::language::Language;
use crate::meta::NO_AUTH_ANNOTATION;
use crate::router::{Arg, RouteTable};
use crate::serializer::{self, is_empty_result};
use crate::server::{Request, RequestContext, Response};

use super::cors;

/// Custom rendering of an error status
pub type ErrorHandler = Box<dyn Fn(&mut Response, &RestError) + Send + Sync>;

/// Routes requests to controller handlers and turns their results into
/// responses.
///
/// A dispatcher is built once at startup: controllers are added, then
/// [`handle`](Self::handle) is called for every request.
///
/// # Route cache
///
/// In [`Mode::Production`] the first [`add_controller`](Self::add_controller)
/// reads the route table from the store. When one is found, controllers are
/// only attached and their metadata is not compiled again. After all
/// controllers are added, [`persist`](Self::persist) writes a freshly built
/// table back. In [`Mode::Debug`] a stored table is discarded and routes are
/// always rebuilt.
pub struct Dispatcher {
    config: ServerConfig,
    store: Box<dyn RouteStore>,
    table: RouteTable,
    /// `None` until the store has been consulted
    cached: Option<bool>,
    controllers: HashMap<String, Box<dyn ControllerHost>>,
    error_handlers: HashMap<u16, ErrorHandler>,
    auth_hook: Option<Box<AuthHook>>,
}

impl Dispatcher {
    /// Dispatcher with a [`FileStore`] in `config.cache_dir`
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let store = FileStore::new(config.cache_dir.clone());
        Self::with_store(config, Box::new(store))
    }

    #[must_use]
    pub fn with_store(config: ServerConfig, store: Box<dyn RouteStore>) -> Self {
        info!(
            mode = ?config.mode,
            root = %config.root,
            default_format = %config.default_format,
            "Dispatcher created"
        );
        Self {
            config,
            store,
            table: RouteTable::build(),
            cached: None,
            controllers: HashMap::new(),
            error_handlers: HashMap::new(),
            auth_hook: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    /// Switch the mode; only affects cache handling that has not happened yet
    pub fn set_mode(&mut self, mode: Mode) {
        self.config.mode = mode;
    }

    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.table
    }

    /// Whether the current table came from the store
    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.cached == Some(true)
    }

    /// Attach a controller and register its routes under `base_path`.
    ///
    /// # Errors
    ///
    /// Handlers and metadata disagree, a controller with the same name is
    /// already attached, or a route declaration is invalid.
    pub fn add_controller<C: Controller>(
        &mut self,
        controller: ControllerBuilder<C>,
        base_path: &str,
    ) -> Result<(), ConfigError> {
        let (meta, host) = controller.into_host()?;
        if self.controllers.contains_key(&meta.name) {
            return Err(ConfigError::DuplicateController {
                controller: meta.name,
            });
        }

        self.load_cache();
        if !self.is_cached() {
            self.table.register(&self.config.root, base_path, &meta)?;
        }

        info!(
            controller = %meta.name,
            base_path = %base_path,
            from_cache = self.is_cached(),
            "Controller added"
        );
        self.controllers.insert(meta.name, host);
        Ok(())
    }

    fn load_cache(&mut self) {
        if self.cached.is_some() {
            return;
        }
        self.cached = Some(false);

        match self.config.mode {
            Mode::Production => match RouteTable::load_from_cache(self.store.as_ref()) {
                Ok(Some(table)) => {
                    self.table = table;
                    self.cached = Some(true);
                }
                Ok(None) => debug!("No cached route table"),
                Err(e) => warn!(error = %e, "Cached route table unusable, rebuilding"),
            },
            Mode::Debug => {
                if let Err(e) = RouteTable::discard_cache(self.store.as_ref()) {
                    warn!(error = %e, "Failed to discard cached route table");
                }
            }
        }
    }

    /// Forget the current table and the attached controllers. Controllers
    /// added afterwards rebuild the table from their metadata and are never
    /// served from the store.
    pub fn refresh_cache(&mut self) {
        let detached = self.controllers.len();
        self.table = RouteTable::build();
        self.controllers.clear();
        self.cached = Some(false);
        info!(controllers_detached = detached, "Route table reset");
    }

    /// Write the table to the store. Only a freshly built table is written
    /// and only in production mode; returns whether it was written.
    ///
    /// # Errors
    ///
    /// Serialization or store failures.
    pub fn persist(&self) -> anyhow::Result<bool> {
        if self.config.mode != Mode::Production || self.is_cached() {
            return Ok(false);
        }
        self.table.persist(self.store.as_ref())?;
        Ok(true)
    }

    /// Render errors with status `code` through `handler`. The first handler
    /// registered for a code is kept.
    pub fn add_error_handler<F>(&mut self, code: u16, handler: F)
    where
        F: Fn(&mut Response, &RestError) + Send + Sync + 'static,
    {
        self.error_handlers.entry(code).or_insert(Box::new(handler));
    }

    /// Replace controller authorization with a server-wide check
    pub fn set_authorization_hook<F>(&mut self, hook: F)
    where
        F: Fn(&RequestContext<'_>) -> bool + Send + Sync + 'static,
    {
        self.auth_hook = Some(Box::new(hook));
    }

    pub fn set_supported_languages(&mut self, languages: Vec<String>) {
        self.config.supported_languages = languages;
    }

    pub fn set_default_language(&mut self, language: &str) {
        self.config.default_language = language.to_string();
    }

    /// Set the fallback format by MIME type; unknown types are rejected.
    pub fn set_default_format(&mut self, mime: &str) -> bool {
        match Format::from_mime(mime) {
            Some(format) => {
                self.config.default_format = format;
                true
            }
            None => {
                warn!(mime = %mime, "Unsupported default format");
                false
            }
        }
    }

    /// URL prefix for controllers added afterwards; empty keeps the current one
    pub fn set_root(&mut self, root: &str) {
        if !root.is_empty() {
            self.config.root = root.to_string();
        }
    }

    pub fn set_cors_allowed_origin(&mut self, origins: Vec<String>) {
        self.config.cors.allowed_origins = origins;
    }

    pub fn set_cors_allowed_headers(&mut self, headers: Vec<String>) {
        self.config.cors.allowed_headers = headers;
    }

    pub fn add_cors_allowed_header(&mut self, header: &str) {
        self.config.cors.allowed_headers.push(header.to_string());
    }

    #[must_use]
    pub fn cors_allowed_headers(&self) -> &[String] {
        &self.config.cors.allowed_headers
    }

    pub fn set_cors_max_age(&mut self, seconds: u32) {
        self.config.cors.max_age = seconds;
    }

    /// Handle one request
    pub fn handle(&mut self, request: &Request) -> Response {
        let ctx = RequestContext::new(request, self.config.default_format);
        let mut response = Response::for_protocol(&request.protocol);

        self.dispatch(&ctx, &mut response);

        if let Some(origin) = cors::allow_origin(&self.config.cors) {
            response.set_header("Access-Control-Allow-Origin", origin);
        }

        info!(
            method = %request.method,
            uri = %request.uri,
            status = response.status,
            format = %ctx.format(),
            "Request handled"
        );
        response
    }

    fn dispatch(&mut self, ctx: &RequestContext<'_>, response: &mut Response) {
        let body = match ctx.body() {
            Ok(body) => body,
            Err(e) => {
                warn!(uri = %ctx.uri(), error = %e, "Request body rejected");
                self.handle_error(ctx, response, &e);
                return;
            }
        };

        let Some(matched) = self.table.route(ctx.method(), ctx.path(), body) else {
            if *ctx.method() == Method::OPTIONS {
                cors::preflight(&self.table, &self.config.cors, ctx.path(), response);
            } else {
                self.handle_error(ctx, response, &RestError::not_found());
            }
            return;
        };
        ctx.set_path_params(matched.path_params.iter().cloned());

        let route = Arc::clone(&matched.route);
        let language = Language::new(
            self.config.supported_languages.clone(),
            self.config.default_language.as_str(),
            ctx.header("accept-language").unwrap_or(""),
        );

        let mut args = matched.args;
        for &position in route.language_positions() {
            args.set(position, Arg::Language(language.clone()));
        }

        let auth = if route.annotations.is_set(NO_AUTH_ANNOTATION) {
            Authorization::Skip
        } else if let Some(hook) = &self.auth_hook {
            Authorization::ServerWide(hook.as_ref())
        } else {
            Authorization::Controller
        };

        let mut invocation = Invocation::new(args, ctx, &route, &language, &self.config.realm);
        let outcome = match self.controllers.get_mut(&route.handler.controller) {
            Some(host) => host.invoke(&route.handler.method, auth, &mut invocation),
            None => {
                error!(handler = %route.handler, "Route points at a controller that was not added");
                Err(InvokeError::Failed(RestError::new(
                    500,
                    format!("Controller {} is not registered", route.handler.controller),
                )))
            }
        };

        for (name, value) in invocation.into_headers() {
            response.set_header(&name, value);
        }

        match outcome {
            Ok(result) => {
                if !response.has_header("Content-Language") {
                    response.set_header("Content-Language", language.preferred());
                }
                if is_empty_result(&result) {
                    debug!(handler = %route.handler, "Empty result, no body sent");
                    return;
                }
                let callback = ctx.query_param("callback");
                if let Err(e) = serializer::send(response, &result, ctx.format(), callback.as_deref()) {
                    self.handle_error(ctx, response, &e);
                }
            }
            Err(InvokeError::Unauthorized) => {
                info!(handler = %route.handler, "Authorization denied");
                if self.config.auth_challenge {
                    response.set_header(
                        "WWW-Authenticate",
                        format!("Basic realm=\"{}\"", self.config.realm),
                    );
                }
                self.handle_error(ctx, response, &RestError::unauthorized());
            }
            Err(InvokeError::Failed(e)) => {
                warn!(handler = %route.handler, status = e.status(), error = %e, "Handler failed");
                self.handle_error(ctx, response, &e);
            }
        }
    }

    fn handle_error(&self, ctx: &RequestContext<'_>, response: &mut Response, err: &RestError) {
        response.set_status(err.status());

        if let Some(handler) = self.error_handlers.get(&err.status()) {
            handler(response, err);
            return;
        }

        let body = json!({
            "error": {
                "code": err.status(),
                "message": err.client_message(self.config.mode.is_debug()),
            }
        });
        let callback = ctx.query_param("callback");
        if let Err(render_err) = serializer::send(response, &body, ctx.format(), callback.as_deref()) {
            debug!(error = %render_err, "Error body falls back to JSON");
            if let Err(e) = serializer::send(response, &body, Format::Json, None) {
                error!(error = %e, "Failed to render error body");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::meta::MethodMeta;

    #[derive(Default)]
    struct Greeter;
    impl Controller for Greeter {}

    fn greeter() -> ControllerBuilder<Greeter> {
        ControllerBuilder::new("Greeter", Greeter::default).method(
            MethodMeta::new("hello")
                .url(Method::GET, "/hello/$name")
                .param("name"),
            |_, inv| Ok(json!({ "hello": inv.args.str(0) })),
        )
    }

    fn debug_dispatcher() -> Dispatcher {
        Dispatcher::with_store(ServerConfig::new(Mode::Debug), Box::new(MemoryStore::new()))
    }

    #[test]
    fn test_duplicate_controller_rejected() {
        let mut dispatcher = debug_dispatcher();
        dispatcher.add_controller(greeter(), "").unwrap();
        let err = dispatcher.add_controller(greeter(), "other").unwrap_err();
        assert_eq!(
            err,
            ConfigError::DuplicateController {
                controller: "Greeter".into()
            }
        );
    }

    #[test]
    fn test_invalid_declaration_registers_nothing() {
        let mut dispatcher = debug_dispatcher();
        let broken = greeter().method(
            MethodMeta::new("broken").annotation("url", "not a declaration"),
            |_, _| Ok(json!(null)),
        );
        let err = dispatcher.add_controller(broken, "").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrlDeclaration { .. }));
        assert!(dispatcher.routes().is_empty());

        let response = dispatcher.handle(&Request::new(Method::GET, "/hello/bob"));
        assert_eq!(response.status, 404);

        dispatcher.add_controller(greeter(), "").unwrap();
        let response = dispatcher.handle(&Request::new(Method::GET, "/hello/bob"));
        assert_eq!(response.status, 200);
    }

    #[test]
    fn test_set_default_format() {
        let mut dispatcher = debug_dispatcher();
        assert!(dispatcher.set_default_format("application/xml"));
        assert_eq!(dispatcher.config().default_format, Format::Xml);
        assert!(!dispatcher.set_default_format("image/png"));
        assert_eq!(dispatcher.config().default_format, Format::Xml);
    }

    #[test]
    fn test_set_root_ignores_empty() {
        let mut dispatcher = debug_dispatcher();
        dispatcher.set_root("api");
        dispatcher.set_root("");
        assert_eq!(dispatcher.config().root, "api");

        dispatcher.add_controller(greeter(), "").unwrap();
        let response = dispatcher.handle(&Request::new(Method::GET, "/api/hello/bob"));
        assert_eq!(response.body, r#"{"hello":"bob"}"#);
    }

    #[test]
    fn test_first_error_handler_wins() {
        let mut dispatcher = debug_dispatcher();
        dispatcher.add_error_handler(404, |res, _| res.body = "first".into());
        dispatcher.add_error_handler(404, |res, _| res.body = "second".into());
        let response = dispatcher.handle(&Request::new(Method::GET, "/missing"));
        assert_eq!(response.status, 404);
        assert_eq!(response.body, "first");
    }

    #[test]
    fn test_persist_only_in_production() {
        let store = MemoryStore::new();
        let mut dispatcher =
            Dispatcher::with_store(ServerConfig::new(Mode::Debug), Box::new(store.clone()));
        dispatcher.add_controller(greeter(), "").unwrap();
        assert!(!dispatcher.persist().unwrap());
        assert!(!store.contains(crate::router::ROUTE_CACHE_KEY));

        let mut dispatcher =
            Dispatcher::with_store(ServerConfig::new(Mode::Production), Box::new(store.clone()));
        dispatcher.add_controller(greeter(), "").unwrap();
        assert!(dispatcher.persist().unwrap());
        assert!(store.contains(crate::router::ROUTE_CACHE_KEY));
    }
}
