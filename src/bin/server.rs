//! docacl REST API Server
//!
//! Run with: cargo run --features server --bin docacl-server
//!
//! The caller identifies itself with the `x-subject` header (a document id).
//! Parent documents are passed as query parameters named after the
//! configured guard parent entries (e.g. `?parent=<id>`).
//!
//! Endpoints:
//!   POST   /subjects            - Register a subject document (dev only)
//!   POST   /docs                - Create document, caller becomes owner
//!   GET    /docs/:id            - Show document (verb-derived: show)
//!   PUT    /docs/:id            - Update fields (verb-derived: update)
//!   DELETE /docs/:id            - Delete document (verb-derived: destroy)
//!   GET    /docs/:id/access     - Keys holding ?perms=a,b (requires show)
//!   PUT    /docs/:id/grant      - Set permissions for a key (requires grant)
//!   GET    /search?perms=a,b    - Documents the caller can use with perms
//!   GET    /status              - Store status (requires global role admin)

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{from_fn_with_state, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use docacl::keys::{classify_with, KeyKind};
use docacl::middleware::{has_permissions, has_roles, unauthorized, RequestDocs};
use docacl::{
    AccessQuery, Config, Document, DocumentStore, Entity, GuardOptions, LmdbStore, Object, ParentCapable,
    PermissionGuard, PermissionSet, RoleGuard, Subject,
};

const SUBJECT_HEADER: &str = "x-subject";
const DOC_ENTRY: &str = "doc";
const OWNER_ROLE: &str = "owner";
const OWNER_PERMS: [&str; 4] = ["show", "update", "destroy", "grant"];

// ============================================================================
// State
// ============================================================================

struct AppState {
    store: LmdbStore,
    guard: Arc<GuardOptions>,
}

type Shared = Arc<AppState>;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
struct RegisterReq {
    id: Option<String>,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Deserialize)]
struct GrantReq {
    key: String,
    perms: Vec<String>,
}

#[derive(Deserialize)]
struct PermsQuery {
    #[serde(default)]
    perms: String,
}

#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    fn err(msg: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(msg.into()) }
    }
}

#[derive(Serialize)]
struct KeyInfo {
    key: String,
    kind: &'static str,
    perms: PermissionSet,
}

#[derive(Serialize)]
struct StatusRes {
    documents: u64,
}

// ============================================================================
// Helpers
// ============================================================================

fn ok<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::ok(data))).into_response()
}

fn fail(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(ApiResponse::<()>::err(msg))).into_response()
}

fn internal(e: docacl::AclError) -> Response {
    error!(%e, "store failure");
    fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn parse_perms(s: &str) -> PermissionSet {
    s.split(',').map(str::trim).filter(|p| !p.is_empty()).collect()
}

fn kind_name(kind: KeyKind<'_>) -> &'static str {
    match kind {
        KeyKind::Subject(_) => "subject",
        KeyKind::Role(_) => "role",
        KeyKind::Parent(_) => "parent",
        KeyKind::Other(_) => "other",
    }
}

// ============================================================================
// Context loading
// ============================================================================

/// Resolve subject, target and parents into a `RequestDocs` extension
async fn load_docs(
    State(app): State<Shared>,
    params: Option<Path<HashMap<String, String>>>,
    Query(query): Query<HashMap<String, String>>,
    mut req: Request,
    next: Next,
) -> Response {
    let mut wanted: Vec<(String, String)> = Vec::new();
    if let Some(id) = req.headers().get(SUBJECT_HEADER).and_then(|v| v.to_str().ok()) {
        wanted.push((app.guard.user_path.clone(), id.to_string()));
    }
    if let Some(id) = params.as_ref().and_then(|Path(p)| p.get("id")) {
        wanted.push((DOC_ENTRY.to_string(), id.clone()));
    }
    for entry in app.guard.parent_entries() {
        if let Some(id) = query.get(entry) {
            wanted.push((entry.to_string(), id.clone()));
        }
    }

    let mut docs = RequestDocs::new();
    for (entry, id) in wanted {
        match app.store.load(&id) {
            Ok(Some(doc)) => docs.insert(entry, Arc::new(doc)),
            Ok(None) => {}
            Err(e) => return internal(e),
        }
    }
    req.extensions_mut().insert(docs);
    next.run(req).await
}

// ============================================================================
// Handlers
// ============================================================================

async fn register(State(app): State<Shared>, Json(req): Json<RegisterReq>) -> Response {
    let schema = app.store.schema().clone();
    let mut doc = match req.id {
        Some(id) => Document::with_schema(id, schema),
        None => match Document::generate(schema) {
            Ok(d) => d,
            Err(e) => return internal(e),
        },
    };
    for (k, v) in req.fields {
        doc.set_field(&k, v);
    }
    match app.store.put(&mut doc) {
        Ok(()) => ok(doc.to_json()),
        Err(e) => internal(e),
    }
}

async fn create(State(app): State<Shared>, Extension(docs): Extension<RequestDocs>, Json(fields): Json<Map<String, Value>>) -> Response {
    let Some(user) = docs.get(&app.guard.user_path) else {
        return unauthorized();
    };
    let mut doc = match Document::generate(app.store.schema().clone()) {
        Ok(d) => d,
        Err(e) => return internal(e),
    };
    for (k, v) in fields {
        doc.set_field(&k, v);
    }
    doc.set_role(OWNER_ROLE, OWNER_PERMS.into());
    user.set_roles(&mut doc, &[OWNER_ROLE]);
    match app.store.save(&mut doc).await {
        Ok(_) => ok(doc.to_json()),
        Err(e) => internal(e),
    }
}

async fn show(Extension(docs): Extension<RequestDocs>) -> Response {
    match docs.get(DOC_ENTRY) {
        Some(doc) => ok(doc.to_json()),
        None => fail(StatusCode::NOT_FOUND, "not found"),
    }
}

async fn update(State(app): State<Shared>, Extension(docs): Extension<RequestDocs>, Json(fields): Json<Map<String, Value>>) -> Response {
    let Some(doc) = docs.get(DOC_ENTRY) else {
        return fail(StatusCode::NOT_FOUND, "not found");
    };
    let mut doc = Document::clone(doc);
    for (k, v) in fields {
        doc.set_field(&k, v);
    }
    match app.store.save(&mut doc).await {
        Ok(_) => ok(doc.to_json()),
        Err(e) => internal(e),
    }
}

async fn destroy(State(app): State<Shared>, Extension(docs): Extension<RequestDocs>) -> Response {
    let Some(doc) = docs.get(DOC_ENTRY) else {
        return fail(StatusCode::NOT_FOUND, "not found");
    };
    match app.store.remove(doc.id()) {
        Ok(removed) => ok(removed),
        Err(e) => internal(e),
    }
}

async fn list_access(Extension(docs): Extension<RequestDocs>, Query(q): Query<PermsQuery>) -> Response {
    let Some(doc) = docs.get(DOC_ENTRY) else {
        return fail(StatusCode::NOT_FOUND, "not found");
    };
    let o = doc.object_options();
    let s = doc.subject_options();
    let infos: Vec<KeyInfo> = doc
        .keys_with_access(&parse_perms(&q.perms))
        .into_iter()
        .map(|key| {
            let kind = kind_name(classify_with(&key, &s.subject_prefix, &o.role_prefix, &o.parent_prefix));
            let perms = doc.access_list().and_then(|acl| acl.raw(&key)).cloned().unwrap_or_default();
            KeyInfo { key, kind, perms }
        })
        .collect();
    ok(infos)
}

async fn grant(State(app): State<Shared>, Extension(docs): Extension<RequestDocs>, Json(req): Json<GrantReq>) -> Response {
    let Some(doc) = docs.get(DOC_ENTRY) else {
        return fail(StatusCode::NOT_FOUND, "not found");
    };
    let mut doc = Document::clone(doc);
    Object::set_access(&mut doc, &req.key, req.perms.into());
    match app.store.save(&mut doc).await {
        Ok(_) => ok(Object::get_access(&doc, &req.key)),
        Err(e) => internal(e),
    }
}

async fn search(State(app): State<Shared>, Extension(docs): Extension<RequestDocs>, Query(q): Query<PermsQuery>) -> Response {
    let Some(user) = docs.get(&app.guard.user_path) else {
        return unauthorized();
    };
    let perms = parse_perms(&q.perms);
    let query = {
        let parents: Vec<&dyn ParentCapable> = app
            .guard
            .parent_entries()
            .into_iter()
            .filter_map(|entry| docs.get(entry))
            .map(|d| &**d as &dyn ParentCapable)
            .collect();
        AccessQuery::with_access(&app.store.schema().object, &**user, &perms, &parents)
    };
    match query.exec(&app.store).await {
        Ok(found) => ok(found.iter().map(Document::to_json).collect::<Vec<_>>()),
        Err(e) => internal(e),
    }
}

async fn status(State(app): State<Shared>) -> Response {
    match app.store.len() {
        Ok(documents) => ok(StatusRes { documents }),
        Err(e) => internal(e),
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let store = LmdbStore::open(&config.store_path, config.schema.clone().shared())?;
    let guard = Arc::new(config.guard.clone());
    let state = Arc::new(AppState { store, guard: guard.clone() });

    let requires = |perms: &[&str]| Arc::new(PermissionGuard::new(DOC_ENTRY, perms, guard.clone()));

    let docs = Router::new()
        .route("/docs/:id", get(show).put(update).delete(destroy))
        .route_layer(from_fn_with_state(Arc::new(PermissionGuard::from_verb(DOC_ENTRY, guard.clone())), has_permissions));
    let access = Router::new()
        .route("/docs/:id/access", get(list_access))
        .route_layer(from_fn_with_state(requires(&["show"]), has_permissions));
    let grants = Router::new()
        .route("/docs/:id/grant", put(grant))
        .route_layer(from_fn_with_state(requires(&["grant"]), has_permissions));
    let admin = Router::new()
        .route("/status", get(status))
        .route_layer(from_fn_with_state(Arc::new(RoleGuard::new(["admin"], guard.clone())), has_roles));

    let app = Router::new()
        .route("/subjects", post(register))
        .route("/docs", post(create))
        .route("/search", get(search))
        .merge(docs)
        .merge(access)
        .merge(grants)
        .merge(admin)
        .layer(from_fn_with_state(state.clone(), load_docs))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(config.bind.as_str()).await?;
    info!(bind = %config.bind, store = %config.store_path, "docacl server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
