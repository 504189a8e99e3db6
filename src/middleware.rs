//! axum middleware for permission and role guards.
//!
//! An earlier layer resolves the documents a request touches and stores them
//! in a [`RequestDocs`] extension, keyed by context entry name (`"user"`,
//! `"doc"`, parent entries...). Guards read from there.
//!
//! ```ignore
//! let guard = Arc::new(PermissionGuard::from_verb("doc", options));
//! Router::new()
//!     .route("/docs/:id", get(show))
//!     .route_layer(from_fn_with_state(guard, has_permissions));
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::document::Document;
use crate::guard::{Decision, PermissionGuard, RoleGuard};
use crate::object::{Object, ParentCapable};
use crate::subject::Subject;

/// Documents resolved for the current request
#[derive(Debug, Clone, Default)]
pub struct RequestDocs(HashMap<String, Arc<Document>>);

impl RequestDocs {
    pub fn new() -> Self {
        RequestDocs::default()
    }

    pub fn insert(&mut self, entry: impl Into<String>, doc: Arc<Document>) {
        self.0.insert(entry.into(), doc);
    }

    pub fn get(&self, entry: &str) -> Option<&Arc<Document>> {
        self.0.get(entry)
    }
}

/// 401 with `{ "error": "Unauthorized" }`
pub fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" }))).into_response()
}

/// Permission guard as `from_fn_with_state` middleware
pub async fn has_permissions(State(guard): State<Arc<PermissionGuard>>, req: Request, next: Next) -> Response {
    let decision = {
        let empty = RequestDocs::new();
        let docs = req.extensions().get::<RequestDocs>().unwrap_or(&empty);
        let options = guard.options();

        let subject = docs.get(&options.user_path).map(|d| &**d as &dyn Subject);
        let object = docs.get(guard.target()).map(|d| &**d as &dyn Object);
        let parents: Vec<&dyn ParentCapable> = options
            .parent_entries()
            .into_iter()
            .filter_map(|entry| docs.get(entry))
            .map(|d| &**d as &dyn ParentCapable)
            .collect();

        guard.check(subject, object, &parents, req.method().as_str())
    };

    match decision {
        Decision::Allow => next.run(req).await,
        Decision::Unauthorized => unauthorized(),
    }
}

/// Role guard as `from_fn_with_state` middleware
pub async fn has_roles(State(guard): State<Arc<RoleGuard>>, req: Request, next: Next) -> Response {
    let decision = {
        let subject = req
            .extensions()
            .get::<RequestDocs>()
            .and_then(|docs| docs.get(&guard.options().user_path))
            .map(|d| &**d as &dyn Subject);
        guard.check(subject)
    };

    match decision {
        Decision::Allow => next.run(req).await,
        Decision::Unauthorized => unauthorized(),
    }
}
