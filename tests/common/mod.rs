#![allow(dead_code)]

pub mod fixtures {
    use http::Method;
    use restserver::cache::MemoryStore;
    use restserver::config::{Mode, ServerConfig};
    use restserver::controller::{Controller, ControllerBuilder};
    use restserver::dispatcher::Dispatcher;
    use restserver::error::RestError;
    use restserver::meta::MethodMeta;
    use restserver::server::{Request, RequestContext, Response};
    use serde_json::{json, Value};

    pub const CONTROLLER: &str = "TestApiController";

    /// Controller exercising the dispatcher features
    #[derive(Debug)]
    pub struct TestApiController {
        pub initialized: bool,
        pub allow: bool,
    }

    impl Default for TestApiController {
        fn default() -> Self {
            Self {
                initialized: false,
                allow: true,
            }
        }
    }

    impl Controller for TestApiController {
        fn init(&mut self) {
            self.initialized = true;
        }

        fn authorize(&self, request: &RequestContext<'_>) -> bool {
            self.allow && request.header("x-deny").is_none()
        }
    }

    /// Routes of [`TestApiController`]
    pub fn test_api() -> ControllerBuilder<TestApiController> {
        test_api_with(TestApiController::default)
    }

    pub fn test_api_with(
        factory: impl Fn() -> TestApiController + Send + Sync + 'static,
    ) -> ControllerBuilder<TestApiController> {
        ControllerBuilder::new(CONTROLLER, factory)
            .method(
                MethodMeta::new("unorderd")
                    .url(Method::GET, "/unorderd")
                    .url(Method::GET, "/unorderd/$param1")
                    .url(Method::GET, "/unorderd/$param2/test/$param1")
                    .url(Method::GET, "/unorderd/param1/$param1/param2/$param2")
                    .param_with_default("param1", json!("default_value_1"))
                    .param_with_default("param2", json!("default_value_2")),
                |_, inv| {
                    Ok(json!({
                        "param1": inv.args.value(0),
                        "param2": inv.args.value(1),
                    }))
                },
            )
            .method(
                MethodMeta::new("methodWithoutDefaultParamets")
                    .url(Method::GET, "/without_default_parameter/$param1")
                    .param("param1"),
                |_, inv| Ok(json!({ "param1": inv.args.value(0) })),
            )
            .method(
                MethodMeta::new("methodWithVariousDocBlockKeys")
                    .url(Method::GET, "/method_with_various_doc_block_keys")
                    .annotation("param1", "value1")
                    .flag("flag"),
                |_, inv| {
                    Ok(json!({
                        "param1": inv.annotations().text("param1"),
                        "flag": inv.annotations().is_set("flag"),
                    }))
                },
            )
            .method(
                MethodMeta::new("methodWithLanguageObjectAndData")
                    .url(Method::GET, "/method_with_language_object_and_data")
                    .param("data")
                    .language_param("language"),
                |_, inv| Ok(json!(inv.args.language(1).map(|l| l.preferred()))),
            )
            .method(
                MethodMeta::new("methodWithSeveralVerbsToTestPreflight")
                    .url(Method::GET, "/method_with_several_verbs_to_test_preflight")
                    .url(Method::POST, "/method_with_several_verbs_to_test_preflight")
                    .url(Method::DELETE, "/method_with_several_verbs_to_test_preflight"),
                |_, _| Ok(Value::Null),
            )
            .method(
                MethodMeta::new("methodWithSeveralVerbsToTestPreflightAndUrlParam")
                    .url(
                        Method::DELETE,
                        "/method_with_several_verbs_to_test_preflight_and_url_param/$param1",
                    )
                    .param("param1"),
                |_, _| Ok(Value::Null),
            )
            .method(
                MethodMeta::new("publicMethod")
                    .url(Method::GET, "/public")
                    .flag("noAuth"),
                |_, _| Ok(json!("public")),
            )
            .method(
                MethodMeta::new("initialized").url(Method::GET, "/initialized"),
                |controller, _| Ok(json!(controller.initialized)),
            )
            .method(
                MethodMeta::new("create")
                    .url(Method::POST, "/items")
                    .url(Method::PUT, "/items/$id")
                    .param("id")
                    .param("data"),
                |_, inv| {
                    Ok(json!({
                        "id": inv.args.value(0),
                        "data": inv.args.value(1),
                    }))
                },
            )
            .method(MethodMeta::new("conflict").url(Method::GET, "/conflict"), |_, _| {
                Err(RestError::new(409, "Item already exists"))
            })
            .method(MethodMeta::new("explode").url(Method::GET, "/explode"), |_, _| {
                panic!("handler exploded")
            })
            .method(
                MethodMeta::new("localized").url(Method::GET, "/localized"),
                |_, inv| {
                    inv.set_header("Content-Language", "fr");
                    Ok(json!("bonjour"))
                },
            )
            .method(
                MethodMeta::new("challenge").url(Method::GET, "/challenge"),
                |_, inv| Err(inv.unauthorized(true)),
            )
            .method(MethodMeta::new("nothing").url(Method::GET, "/nothing"), |_, _| {
                Ok(json!({}))
            })
            .method(
                MethodMeta::new("described").url(Method::GET, "/described"),
                |_, _| Ok(json!({"key1": "value1", "list": ["one", "two"]})),
            )
    }

    /// Debug-mode dispatcher with an in-memory route cache
    pub fn debug_dispatcher() -> Dispatcher {
        Dispatcher::with_store(ServerConfig::new(Mode::Debug), Box::new(MemoryStore::new()))
    }

    /// Debug-mode dispatcher with [`TestApiController`] under `test`
    pub fn test_dispatcher() -> Dispatcher {
        let mut dispatcher = debug_dispatcher();
        dispatcher
            .add_controller(test_api(), "test")
            .expect("fixture controller registers");
        dispatcher
    }

    pub fn get(uri: &str) -> Request {
        Request::new(Method::GET, uri).with_header("Accept", "application/json")
    }

    pub fn json_body(response: &Response) -> Value {
        serde_json::from_str(&response.body).expect("response body is JSON")
    }
}
