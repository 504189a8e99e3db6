//! HTTP guard behaviour (requires the `server` feature)

#![cfg(feature = "server")]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::get,
    Extension, Router,
};
use docacl::middleware::{has_permissions, has_roles, RequestDocs};
use docacl::{Document, GuardOptions, Object, PermissionGuard, RoleGuard, Subject};
use serde_json::{json, Value};
use tower::ServiceExt;

fn fixture() -> RequestDocs {
    let mut user = Document::new("u1");
    user.set_field("roles", json!(["editor"]));
    let mut parent = Document::new("p1");
    let mut doc = Document::new("d1");
    doc.set_parent_access(&parent, ["destroy"].into());
    Subject::set_access(&user, &mut doc, ["show"].into());
    Subject::set_access(&user, &mut parent, ["destroy"].into());

    let mut docs = RequestDocs::new();
    docs.insert("user", Arc::new(user));
    docs.insert("doc", Arc::new(doc));
    docs.insert("parent", Arc::new(parent));
    docs
}

fn with_docs(router: Router, docs: Option<RequestDocs>) -> Router {
    match docs {
        Some(docs) => router.layer(Extension(docs)),
        None => router,
    }
}

fn app(guard: PermissionGuard, docs: Option<RequestDocs>) -> Router {
    let router = Router::new()
        .route("/doc", get(|| async { "ok" }).delete(|| async { "gone" }))
        .route_layer(from_fn_with_state(Arc::new(guard), has_permissions));
    with_docs(router, docs)
}

async fn call(app: Router, method: &str) -> (StatusCode, Vec<u8>) {
    let res = app.oneshot(Request::builder().method(method).uri("/doc").body(Body::empty()).unwrap()).await.unwrap();
    let status = res.status();
    (status, to_bytes(res.into_body(), usize::MAX).await.unwrap().to_vec())
}

fn options() -> Arc<GuardOptions> {
    Arc::new(GuardOptions::default())
}

#[tokio::test]
async fn test_allows_verb_derived_permission() {
    let (status, body) = call(app(PermissionGuard::from_verb("doc", options()), Some(fixture())), "GET").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn test_denies_with_unauthorized_payload() {
    let (status, body) = call(app(PermissionGuard::from_verb("doc", options()), Some(fixture())), "DELETE").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({ "error": "Unauthorized" }));
}

#[tokio::test]
async fn test_missing_context_is_unauthorized() {
    let (status, _) = call(app(PermissionGuard::new("doc", ["show"], options()), None), "GET").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(app(PermissionGuard::new("other", ["show"], options()), Some(fixture())), "GET").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_parent_path_enables_leak() {
    let opts = Arc::new(GuardOptions { parent_path: Some("parent".into()), ..Default::default() });
    let (status, _) = call(app(PermissionGuard::from_verb("doc", opts), Some(fixture())), "DELETE").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_role_guard() {
    let router = |roles: &[&str], docs: Option<RequestDocs>| {
        let router = Router::new()
            .route("/doc", get(|| async { "ok" }))
            .route_layer(from_fn_with_state(Arc::new(RoleGuard::new(roles, options())), has_roles));
        with_docs(router, docs)
    };
    assert_eq!(call(router(&["editor"], Some(fixture())), "GET").await.0, StatusCode::OK);
    assert_eq!(call(router(&["admin"], Some(fixture())), "GET").await.0, StatusCode::UNAUTHORIZED);
    assert_eq!(call(router(&["editor"], None), "GET").await.0, StatusCode::UNAUTHORIZED);
}
