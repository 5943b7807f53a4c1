//! Dispatch scenarios against isolated applications.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use bytes::Bytes;
use http::{header, Request, StatusCode};
use rstest::rstest;
use serde_json::{json, Value};
use sprig::app::TEMPLATE_PATH_OPTION;
use sprig::logging::REQUEST_ID_HEADER;
use sprig::{Attr, Context, Entry, Error, HandlerResult, Holder, Keywords, Method, Options};
use tower::ServiceExt;
use uuid::Uuid;

fn call(entry: &Entry, method: &str, uri: &str) -> http::Response<Bytes> {
    entry.call(
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Bytes::new())
            .unwrap(),
    )
}

fn body_text(response: &http::Response<Bytes>) -> String {
    String::from_utf8(response.body().to_vec()).unwrap()
}

fn error_type(response: &http::Response<Bytes>) -> String {
    let body: Value = serde_json::from_slice(response.body()).unwrap();
    body["error"]["type"].as_str().unwrap().to_string()
}

fn person(ctx: &mut Context) -> HandlerResult<String> {
    Ok(format!("Hello {}", ctx.named("name").unwrap_or_default()))
}

#[test]
fn test_hello_named_placeholder() {
    let holder = Holder::new();
    let kw = Keywords::activate(&holder, Options::new(), "svc").unwrap();
    kw.get("/person/:name", person).unwrap();
    let entry = kw.run().unwrap();

    let response = call(&entry, "GET", "/person/Alice");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(&response), "Hello Alice");
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/html; charset=utf-8"
    );
}

#[test]
fn test_named_placeholder_is_percent_decoded() {
    let holder = Holder::new();
    let kw = Keywords::activate(&holder, Options::new(), "svc").unwrap();
    kw.get("/person/:name", person).unwrap();
    kw.get("/files/*path", |ctx: &mut Context| {
        Ok(ctx.named("path").unwrap_or_default().to_string())
    })
    .unwrap();
    let entry = kw.run().unwrap();

    assert_eq!(body_text(&call(&entry, "GET", "/person/Al%20ice")), "Hello Al ice");
    assert_eq!(
        body_text(&call(&entry, "GET", "/files/my%20docs/a%2Bb.txt")),
        "my docs/a+b.txt"
    );
}

#[test]
fn test_declarations_after_run_leave_routing_unchanged() {
    let holder = Holder::new();
    let kw = Keywords::activate(&holder, Options::new(), "svc").unwrap();
    kw.route("/login", "login").unwrap();
    kw.handler("login", |_: &mut Context| Ok("v1")).unwrap();
    kw.attr("greeting", Attr::value("hello".to_string())).unwrap();
    kw.get("/greeting", |ctx: &mut Context| -> HandlerResult<String> {
        Ok(ctx.app().attr::<String>("greeting")?.to_string())
    })
    .unwrap();
    let entry = kw.run().unwrap();

    assert!(matches!(
        kw.handler("login", |_: &mut Context| Ok("v2")),
        Err(Error::Frozen)
    ));
    assert!(matches!(
        kw.attr("greeting", Attr::value("bye".to_string())),
        Err(Error::Frozen)
    ));
    assert!(matches!(
        kw.app().unwrap().add_template("login", "hijacked"),
        Err(Error::Frozen)
    ));

    assert_eq!(body_text(&call(&entry, "GET", "/login")), "v1");
    assert_eq!(body_text(&call(&entry, "GET", "/greeting")), "hello");
}

#[test]
fn test_template_names_cannot_leave_template_dir() {
    let outside = tempfile::tempdir().unwrap();
    let secret = outside.path().join("secret.tt");
    std::fs::write(&secret, "top secret").unwrap();
    let views = tempfile::tempdir().unwrap();
    std::fs::write(views.path().join("page.tt"), "page {{ n }}").unwrap();

    let holder = Holder::new();
    let mut options = Options::new();
    options.insert(
        TEMPLATE_PATH_OPTION.into(),
        json!(views.path().to_str().unwrap()),
    );
    let kw = Keywords::activate(&holder, options, "svc").unwrap();
    kw.get("/view/*page", |ctx: &mut Context| -> HandlerResult<()> {
        let page = ctx.named("page").unwrap_or_default().to_string();
        ctx.template(&page, &json!({ "n": 1 }))?;
        Ok(())
    })
    .unwrap();
    let entry = kw.run().unwrap();

    assert_eq!(body_text(&call(&entry, "GET", "/view/page.tt")), "page 1");

    let encoded = secret.to_str().unwrap().replace('/', "%2F");
    for uri in [format!("/view/{}", encoded), "/view/..%2Fsecret.tt".to_string()] {
        let response = call(&entry, "GET", &uri);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
        assert_eq!(error_type(&response), "template");
        assert!(!body_text(&response).contains("top secret"));
    }
}

#[test]
fn test_lowercase_method_is_not_found() {
    let holder = Holder::new();
    let kw = Keywords::activate(&holder, Options::new(), "svc").unwrap();
    kw.get("/", |_: &mut Context| Ok("root")).unwrap();
    let entry = kw.run().unwrap();

    assert_eq!(call(&entry, "GET", "/").status(), StatusCode::OK);
    let response = call(&entry, "get", "/");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_type(&response), "not_found");
}

#[rstest]
#[case("GET", "/edit/7", StatusCode::OK, "view 7")]
#[case("POST", "/edit/7", StatusCode::OK, "save 7")]
#[case("PUT", "/edit/7", StatusCode::NOT_FOUND, "")]
#[case("GET", "/edit", StatusCode::NOT_FOUND, "")]
fn test_method_restricted_routes(
    #[case] method: &str,
    #[case] uri: &str,
    #[case] status: StatusCode,
    #[case] body: &str,
) {
    let holder = Holder::new();
    let kw = Keywords::activate(&holder, Options::new(), "svc").unwrap();
    kw.post(([Method::Post], "/edit/:id"), |ctx: &mut Context| {
        Ok(format!("save {}", ctx.named("id").unwrap_or_default()))
    })
    .unwrap();
    kw.get("/edit/:id", |ctx: &mut Context| {
        Ok(format!("view {}", ctx.named("id").unwrap_or_default()))
    })
    .unwrap();
    let entry = kw.run().unwrap();

    let response = call(&entry, method, uri);
    assert_eq!(response.status(), status);
    if status == StatusCode::OK {
        assert_eq!(body_text(&response), body);
    } else {
        assert_eq!(error_type(&response), "not_found");
    }
}

#[test]
fn test_first_registered_route_wins() {
    let holder = Holder::new();
    let kw = Keywords::activate(&holder, Options::new(), "svc").unwrap();
    kw.route("/items/:id", |_: &mut Context| Ok("generic")).unwrap();
    kw.route("/items/new", |_: &mut Context| Ok("specific")).unwrap();
    let entry = kw.run().unwrap();

    assert_eq!(body_text(&call(&entry, "GET", "/items/new")), "generic");
}

#[test]
fn test_named_destination_resolved_at_dispatch() {
    let holder = Holder::new();
    let kw = Keywords::activate(&holder, Options::new(), "svc").unwrap();
    kw.route("/login", "login").unwrap();
    kw.route("/missing", "nowhere").unwrap();
    // Registered after the route that names it.
    kw.handler("login", |_: &mut Context| Ok("please log in")).unwrap();
    let entry = kw.run().unwrap();

    let response = call(&entry, "GET", "/login");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(&response), "please log in");

    let response = call(&entry, "GET", "/missing");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_type(&response), "unresolved_destination");
}

#[test]
fn test_handler_error_becomes_500() {
    let holder = Holder::new();
    let kw = Keywords::activate(&holder, Options::new(), "svc").unwrap();
    kw.get("/boom", |_: &mut Context| -> HandlerResult<String> {
        Err("exploded".into())
    })
    .unwrap();
    kw.get("/attr", |ctx: &mut Context| -> HandlerResult<String> {
        let missing = ctx.app().attr::<u32>("missing")?;
        Ok(missing.to_string())
    })
    .unwrap();
    let entry = kw.run().unwrap();

    let response = call(&entry, "GET", "/boom");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_type(&response), "handler");

    let response = call(&entry, "GET", "/attr");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_type(&response), "attribute");
}

#[test]
fn test_json_reply_and_params() {
    let holder = Holder::new();
    let kw = Keywords::activate(&holder, Options::new(), "svc").unwrap();
    kw.route("/echo", |ctx: &mut Context| {
        Ok(json!({
            "q": ctx.param("q"),
            "missing": ctx.param("missing"),
            "count": ctx.params().len(),
        }))
    })
    .unwrap();
    let entry = kw.run().unwrap();

    let response = call(&entry, "GET", "/echo?q=rust&page=2");
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    let body: Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body, json!({"q": "rust", "missing": null, "count": 2}));
}

#[test]
fn test_stash_within_request() {
    let holder = Holder::new();
    let kw = Keywords::activate(&holder, Options::new(), "svc").unwrap();
    kw.get("/stash", |ctx: &mut Context| {
        assert!(ctx.stash_get("user").is_none());
        ctx.stash().insert("user".into(), json!("alice"));
        let user = ctx.stash_get("user").cloned().unwrap_or(Value::Null);
        Ok(json!({ "user": user, "all": ctx.stash().clone() }))
    })
    .unwrap();
    let entry = kw.run().unwrap();

    // A fresh stash per request.
    for _ in 0..2 {
        let body: Value = serde_json::from_slice(call(&entry, "GET", "/stash").body()).unwrap();
        assert_eq!(body, json!({"user": "alice", "all": {"user": "alice"}}));
    }
}

#[test]
fn test_lazy_attribute_shared_across_requests() {
    let holder = Holder::new();
    let kw = Keywords::activate(&holder, Options::new(), "svc").unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    kw.attr(
        "answer",
        Attr::lazy(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            42u64
        }),
    )
    .unwrap();
    kw.get("/answer", |ctx: &mut Context| -> HandlerResult<String> {
        Ok(ctx.app().attr::<u64>("answer")?.to_string())
    })
    .unwrap();
    let entry = kw.run().unwrap();

    assert_eq!(body_text(&call(&entry, "GET", "/answer")), "42");
    assert_eq!(body_text(&call(&entry, "GET", "/answer")), "42");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_template_and_response_handle() {
    let holder = Holder::new();
    let kw = Keywords::activate(&holder, Options::new(), "svc").unwrap();
    kw.app()
        .unwrap()
        .add_template("greet", "<p>Hi {{ name }}</p>")
        .unwrap();
    kw.get("/greet/:name", |ctx: &mut Context| -> HandlerResult<()> {
        let name = ctx.named("name").unwrap_or_default().to_string();
        ctx.template("greet", &json!({ "name": name }))?;
        ctx.res().set_code(StatusCode::ACCEPTED);
        Ok(())
    })
    .unwrap();
    kw.get("/old", |ctx: &mut Context| {
        ctx.res().redirect_to("/new");
        Ok(())
    })
    .unwrap();
    kw.get("/broken", |ctx: &mut Context| -> HandlerResult<()> {
        ctx.template("no-such-template", &json!({}))?;
        Ok(())
    })
    .unwrap();
    let entry = kw.run().unwrap();

    let response = call(&entry, "GET", "/greet/Bob");
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(body_text(&response), "<p>Hi Bob</p>");

    let response = call(&entry, "GET", "/old");
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[header::LOCATION], "/new");

    let response = call(&entry, "GET", "/broken");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_type(&response), "template");
}

#[test]
fn test_unknown_verb_is_not_found() {
    let holder = Holder::new();
    let kw = Keywords::activate(&holder, Options::new(), "svc").unwrap();
    kw.route("/", |_: &mut Context| Ok("root")).unwrap();
    let entry = kw.run().unwrap();

    assert_eq!(call(&entry, "DELETE", "/").status(), StatusCode::OK);
    assert_eq!(call(&entry, "TRACE", "/").status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_summary_lists_routes() {
    let holder = Holder::new();
    let kw = Keywords::activate(&holder, Options::new(), "svc").unwrap();
    kw.get("/a/:id", "show").unwrap();
    kw.route("/b", |_: &mut Context| Ok("b")).unwrap();
    let summary = serde_json::to_value(kw.run().unwrap().summary()).unwrap();
    assert_eq!(
        summary,
        json!([
            {"methods": "GET", "pattern": "/a/:id", "destination": "show"},
            {"methods": "ANY", "pattern": "/b", "destination": "<handler>"},
        ])
    );
}

#[test]
fn test_invalid_pattern_rejected_at_declaration() {
    let holder = Holder::new();
    let kw = Keywords::activate(&holder, Options::new(), "svc").unwrap();
    assert!(matches!(
        kw.get("/files/*rest/more", "files"),
        Err(Error::InvalidPattern { .. })
    ));
    assert!(kw.app().unwrap().routes().is_empty());
}

#[tokio::test]
async fn test_router_serves_entry() {
    let holder = Holder::new();
    let kw = Keywords::activate(&holder, Options::new(), "svc").unwrap();
    kw.get("/person/:name", person).unwrap();
    kw.post("/form", |ctx: &mut Context| {
        Ok(format!("title={}", ctx.param("title").unwrap_or_default()))
    })
    .unwrap();
    let router = kw.run().unwrap().router();

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/person/Alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body.as_ref(), b"Hello Alice");

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/form")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("title=Hello+World"))
                .unwrap(),
        )
        .await
        .unwrap();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body.as_ref(), b"title=Hello World");

    let response = router
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_router_tags_requests_with_an_id() {
    let holder = Holder::new();
    let kw = Keywords::activate(&holder, Options::new(), "svc").unwrap();
    kw.get("/id", |ctx: &mut Context| Ok(ctx.id().to_string())).unwrap();
    let router = kw.run().unwrap().router();

    let response = router
        .clone()
        .oneshot(Request::builder().uri("/id").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let header = response.headers()[REQUEST_ID_HEADER].to_str().unwrap().to_string();
    assert!(Uuid::parse_str(&header).is_ok());
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body.as_ref(), header.as_bytes());

    let supplied = Uuid::new_v4().to_string();
    let response = router
        .oneshot(
            Request::builder()
                .uri("/nope")
                .header(REQUEST_ID_HEADER, &supplied)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()[REQUEST_ID_HEADER], supplied.as_str());
}

#[tokio::test]
async fn test_panicking_attribute_initializer_fails_later_reads_cleanly() {
    let holder = Holder::new();
    let kw = Keywords::activate(&holder, Options::new(), "svc").unwrap();
    kw.attr("flaky", Attr::lazy(|_| -> u32 { panic!("initializer failed") }))
        .unwrap();
    kw.get("/flaky", |ctx: &mut Context| -> HandlerResult<String> {
        Ok(ctx.app().attr::<u32>("flaky")?.to_string())
    })
    .unwrap();
    let router = kw.run().unwrap().router();

    let get = || Request::builder().uri("/flaky").body(Body::empty()).unwrap();

    let response = router.clone().oneshot(get()).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    for _ in 0..2 {
        let response = router.clone().oneshot(get()).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"]["type"], "attribute");
    }
}
