//! Tests for request dispatch
//!
//! # Test Coverage
//!
//! - Argument binding: defaults, unordered placeholders, request body
//! - Authorization: controller check, server-wide hook, `noAuth`
//! - Language negotiation and `Content-Language`
//! - Format negotiation, JSONP callbacks and XML output
//! - Error responses in debug and production mode, custom error handlers
//!
//! All requests go through [`Dispatcher::handle`] against the
//! `TestApiController` fixture mounted under `test`.

mod common;

use common::fixtures::{
    debug_dispatcher, get, json_body, test_api, test_api_with, test_dispatcher, TestApiController,
};
use http::Method;
use restserver::cache::MemoryStore;
use restserver::config::{Mode, ServerConfig};
use restserver::dispatcher::Dispatcher;
use restserver::server::Request;
use serde_json::json;

#[test]
fn test_url_default_parameters() {
    let mut dispatcher = test_dispatcher();
    let response = dispatcher.handle(&get("/test/unorderd"));

    assert_eq!(response.status, 200);
    assert_eq!(
        json_body(&response),
        json!({"param1": "default_value_1", "param2": "default_value_2"})
    );
}

#[test]
fn test_url_parameters() {
    let mut dispatcher = test_dispatcher();
    let response = dispatcher.handle(&get("/test/unorderd/param1/value_1/param2/value_2"));
    assert_eq!(
        json_body(&response),
        json!({"param1": "value_1", "param2": "value_2"})
    );
}

#[test]
fn test_unordered_placeholders_bind_by_name() {
    let mut dispatcher = test_dispatcher();
    let response = dispatcher.handle(&get("/test/unorderd/second/test/first"));
    assert_eq!(json_body(&response), json!({"param1": "first", "param2": "second"}));

    let response = dispatcher.handle(&get("/test/unorderd/only"));
    assert_eq!(
        json_body(&response),
        json!({"param1": "only", "param2": "default_value_2"})
    );
}

#[test]
fn test_method_without_default_parameters() {
    let mut dispatcher = test_dispatcher();
    let response = dispatcher.handle(&get("/test/without_default_parameter/value_1"));
    assert_eq!(json_body(&response), json!({"param1": "value_1"}));
}

#[test]
fn test_path_captures_are_percent_decoded() {
    let mut dispatcher = test_dispatcher();
    let response = dispatcher.handle(&get("/test/without_default_parameter/hello%20world"));
    assert_eq!(json_body(&response), json!({"param1": "hello world"}));
}

#[test]
fn test_query_string_and_trailing_slash_are_ignored() {
    let mut dispatcher = test_dispatcher();
    let response = dispatcher.handle(&get("/test/unorderd/?param1=ignored"));
    assert_eq!(json_body(&response)["param1"], "default_value_1");
}

#[test]
fn test_annotations_reach_the_handler() {
    let mut dispatcher = test_dispatcher();
    let response = dispatcher.handle(&get("/test/method_with_various_doc_block_keys"));
    assert_eq!(json_body(&response), json!({"param1": "value1", "flag": true}));
}

#[test]
fn test_method_with_language_object_and_data() {
    let mut dispatcher = test_dispatcher();
    dispatcher.set_supported_languages(vec!["en".into(), "de".into()]);
    dispatcher.set_default_language("en");

    let request = get("/test/method_with_language_object_and_data").with_header("Accept-Language", "de");
    let response = dispatcher.handle(&request);

    assert_eq!(response.body, r#""de""#);
    assert_eq!(response.get_header("Content-Language"), Some("de"));
}

#[test]
fn test_content_language_falls_back_to_default() {
    let mut dispatcher = test_dispatcher();
    dispatcher.set_supported_languages(vec!["en".into(), "de".into()]);

    let request = get("/test/unorderd").with_header("Accept-Language", "fr-FR,fr;q=0.9");
    let response = dispatcher.handle(&request);
    assert_eq!(response.get_header("Content-Language"), Some("en"));
}

#[test]
fn test_handler_content_language_is_kept() {
    let mut dispatcher = test_dispatcher();
    let response = dispatcher.handle(&get("/test/localized"));
    assert_eq!(response.get_header("Content-Language"), Some("fr"));
}

#[test]
fn test_controller_init_runs_before_handler() {
    let mut dispatcher = test_dispatcher();
    let response = dispatcher.handle(&get("/test/initialized"));
    assert_eq!(response.body, "true");
}

#[test]
fn test_json_body_binds_data_parameter() {
    let mut dispatcher = test_dispatcher();
    let request = Request::new(Method::POST, "/test/items")
        .with_header("Content-Type", "application/json; charset=utf-8")
        .with_body(r#"{"name":"widget"}"#);
    let response = dispatcher.handle(&request);

    assert_eq!(response.status, 200);
    assert_eq!(json_body(&response), json!({"id": null, "data": {"name": "widget"}}));
}

#[test]
fn test_form_body_binds_data_parameter() {
    let mut dispatcher = test_dispatcher();
    let request = Request::new(Method::PUT, "/test/items/7")
        .with_header("Content-Type", "application/x-www-form-urlencoded")
        .with_body("name=big+widget&color=red");
    let response = dispatcher.handle(&request);

    assert_eq!(
        json_body(&response),
        json!({"id": "7", "data": {"name": "big widget", "color": "red"}})
    );
}

#[test]
fn test_unsupported_content_type() {
    let mut dispatcher = test_dispatcher();
    let request = Request::new(Method::POST, "/test/items")
        .with_header("Content-Type", "not/supported")
        .with_body("x");
    let response = dispatcher.handle(&request);

    assert_eq!(response.status, 500);
    assert_eq!(
        json_body(&response),
        json!({"error": {
            "code": 500,
            "message": "Internal Server Error: Content-Type \"not/supported\" not supported"
        }})
    );
}

#[test]
fn test_not_found() {
    let mut dispatcher = test_dispatcher();
    let response = dispatcher.handle(&get("/test/does/not/exist"));

    assert_eq!(response.status, 404);
    assert_eq!(response.status_line("HTTP/2"), "HTTP/2 404 Not Found");
    assert_eq!(
        json_body(&response),
        json!({"error": {"code": 404, "message": "Not Found"}})
    );
}

#[test]
fn test_wrong_method_is_not_found() {
    let mut dispatcher = test_dispatcher();
    let response = dispatcher.handle(&Request::new(Method::DELETE, "/test/unorderd"));
    assert_eq!(response.status, 404);
}

#[test]
fn test_handler_error_detail_only_in_debug() {
    let mut dispatcher = test_dispatcher();
    let response = dispatcher.handle(&get("/test/conflict"));
    assert_eq!(response.status, 409);
    assert_eq!(
        json_body(&response)["error"]["message"],
        "Conflict: Item already exists"
    );

    let mut dispatcher =
        Dispatcher::with_store(ServerConfig::new(Mode::Production), Box::new(MemoryStore::new()));
    dispatcher.add_controller(test_api(), "test").unwrap();
    let response = dispatcher.handle(&get("/test/conflict"));
    assert_eq!(response.status, 409);
    assert_eq!(
        json_body(&response),
        json!({"error": {"code": 409, "message": "Conflict"}})
    );
}

#[test]
fn test_handler_panic_becomes_500() {
    let mut dispatcher = test_dispatcher();
    let response = dispatcher.handle(&get("/test/explode"));
    assert_eq!(response.status, 500);
    assert_eq!(json_body(&response)["error"]["code"], 500);

    // the dispatcher keeps serving
    let response = dispatcher.handle(&get("/test/unorderd"));
    assert_eq!(response.status, 200);
}

#[test]
fn test_controller_authorization_denies() {
    let mut dispatcher = test_dispatcher();
    let response = dispatcher.handle(&get("/test/unorderd").with_header("X-Deny", "1"));

    assert_eq!(response.status, 401);
    assert!(!response.has_header("WWW-Authenticate"));
    assert_eq!(
        json_body(&response)["error"]["message"],
        "Unauthorized: You are not authorized to access this resource."
    );
}

#[test]
fn test_controller_factory_controls_authorization() {
    let mut dispatcher = debug_dispatcher();
    dispatcher
        .add_controller(
            test_api_with(|| TestApiController {
                initialized: false,
                allow: false,
            }),
            "test",
        )
        .unwrap();

    assert_eq!(dispatcher.handle(&get("/test/unorderd")).status, 401);
    assert_eq!(dispatcher.handle(&get("/test/public")).status, 200);
}

#[test]
fn test_auth_challenge_header() {
    let mut config = ServerConfig::new(Mode::Debug);
    config.auth_challenge = true;
    config.realm = "Test Realm".into();
    let mut dispatcher = Dispatcher::with_store(config, Box::new(MemoryStore::new()));
    dispatcher.add_controller(test_api(), "test").unwrap();

    let response = dispatcher.handle(&get("/test/unorderd").with_header("X-Deny", "1"));
    assert_eq!(response.status, 401);
    assert_eq!(
        response.get_header("WWW-Authenticate"),
        Some(r#"Basic realm="Test Realm""#)
    );
}

#[test]
fn test_handler_can_challenge() {
    let mut dispatcher = test_dispatcher();
    let response = dispatcher.handle(&get("/test/challenge"));
    assert_eq!(response.status, 401);
    assert_eq!(
        response.get_header("WWW-Authenticate"),
        Some(r#"Basic realm="Rest Server""#)
    );
}

#[test]
fn test_no_auth_skips_authorization() {
    let mut dispatcher = test_dispatcher();
    let response = dispatcher.handle(&get("/test/public").with_header("X-Deny", "1"));
    assert_eq!(response.status, 200);
    assert_eq!(response.body, r#""public""#);
}

#[test]
fn test_server_wide_hook_replaces_controller_check() {
    let mut dispatcher = test_dispatcher();
    dispatcher.set_authorization_hook(|request| request.header("authorization") == Some("Bearer ok"));

    let denied = dispatcher.handle(&get("/test/unorderd"));
    assert_eq!(denied.status, 401);

    // the controller would deny X-Deny, the hook alone decides
    let allowed = dispatcher.handle(
        &get("/test/unorderd")
            .with_header("Authorization", "Bearer ok")
            .with_header("X-Deny", "1"),
    );
    assert_eq!(allowed.status, 200);

    assert_eq!(dispatcher.handle(&get("/test/public")).status, 200);
}

#[test]
fn test_hook_sees_path_params() {
    let mut dispatcher = test_dispatcher();
    dispatcher.set_authorization_hook(|request| request.path_param("param1") != Some("secret"));

    assert_eq!(dispatcher.handle(&get("/test/without_default_parameter/open")).status, 200);
    assert_eq!(dispatcher.handle(&get("/test/without_default_parameter/secret")).status, 401);
}

#[test]
fn test_empty_result_sends_no_body() {
    let mut dispatcher = test_dispatcher();
    let response = dispatcher.handle(&get("/test/nothing"));

    assert_eq!(response.status, 200);
    assert!(response.body.is_empty());
    assert!(!response.has_header("Content-Type"));
}

#[test]
fn test_standard_headers() {
    let mut dispatcher = test_dispatcher();
    let response = dispatcher.handle(&get("/test/described"));

    assert_eq!(response.get_header("Cache-Control"), Some("no-cache, must-revalidate"));
    assert_eq!(response.get_header("Expires"), Some("0"));
    assert_eq!(response.get_header("Content-Type"), Some("application/json"));
}

#[test]
fn test_url_suffix_selects_xml() {
    let mut dispatcher = test_dispatcher();
    let response = dispatcher.handle(&get("/test/described.xml"));

    assert_eq!(response.get_header("Content-Type"), Some("application/xml"));
    assert_eq!(
        response.body,
        "<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n<result><key1>value1</key1>\
         <list><item index=\"0\">one</item><item index=\"1\">two</item></list></result>"
    );
}

#[test]
fn test_accept_header_selects_format() {
    let mut dispatcher = test_dispatcher();
    let request = Request::new(Method::GET, "/test/described")
        .with_header("Accept", "text/html;q=0.5,application/xml");
    let response = dispatcher.handle(&request);
    assert_eq!(response.get_header("Content-Type"), Some("application/xml"));
}

#[test]
fn test_default_format_applies_without_accept() {
    let mut dispatcher = test_dispatcher();
    assert!(dispatcher.set_default_format("application/xml"));
    let response = dispatcher.handle(&Request::new(Method::GET, "/test/described"));
    assert_eq!(response.get_header("Content-Type"), Some("application/xml"));
}

#[test]
fn test_jsonp_with_callback() {
    let mut dispatcher = test_dispatcher();
    let request = Request::new(Method::GET, "/test/described?callback=handle_it")
        .with_header("Accept", "application/json-p");
    let response = dispatcher.handle(&request);

    assert_eq!(response.get_header("Content-Type"), Some("application/json-p"));
    assert_eq!(
        response.body,
        r#"handle_it({"key1":"value1","list":["one","two"]})"#
    );
}

#[test]
fn test_jsonp_without_callback_is_400_as_json() {
    let mut dispatcher = test_dispatcher();
    let request =
        Request::new(Method::GET, "/test/described").with_header("Accept", "application/json-p");
    let response = dispatcher.handle(&request);

    assert_eq!(response.status, 400);
    assert_eq!(response.get_header("Content-Type"), Some("application/json"));
    assert_eq!(
        json_body(&response),
        json!({"error": {"code": 400, "message": "Bad Request: No callback given."}})
    );
}

#[test]
fn test_error_handler_takes_over() {
    let mut dispatcher = test_dispatcher();
    dispatcher.add_error_handler(404, |response, err| {
        response.set_header("Content-Type", "text/plain");
        response.body = format!("nothing here ({})", err.status());
    });

    let response = dispatcher.handle(&get("/test/nope"));
    assert_eq!(response.status, 404);
    assert_eq!(response.body, "nothing here (404)");
    assert_eq!(response.get_header("Content-Type"), Some("text/plain"));

    // other codes keep the default body
    let response = dispatcher.handle(&get("/test/conflict"));
    assert_eq!(json_body(&response)["error"]["code"], 409);
}

#[test]
fn test_allow_origin_on_every_response() {
    let mut dispatcher = test_dispatcher();
    dispatcher.set_cors_allowed_origin(vec!["http://a.tld".into(), "http://b.tld".into()]);

    for uri in ["/test/unorderd", "/test/missing"] {
        let response = dispatcher.handle(&get(uri));
        assert_eq!(
            response.get_header("Access-Control-Allow-Origin"),
            Some("http://a.tld, http://b.tld")
        );
    }
}

#[test]
fn test_root_prefixes_routes() {
    let mut dispatcher = debug_dispatcher();
    dispatcher.set_root("/api/v1/");
    dispatcher.add_controller(test_api(), "/test").unwrap();

    assert_eq!(dispatcher.handle(&get("/api/v1/test/unorderd")).status, 200);
    assert_eq!(dispatcher.handle(&get("/test/unorderd")).status, 404);
}

#[test]
fn test_status_line_follows_request_protocol() {
    let mut dispatcher = test_dispatcher();
    let response = dispatcher.handle(&get("/test/missing").with_protocol("HTTP/1.0"));

    assert_eq!(response.status, 404);
    assert!(response.to_string().starts_with("HTTP/1.0 404 Not Found\r\n"));
}
