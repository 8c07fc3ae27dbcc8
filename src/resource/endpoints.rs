//! Route handlers for listing, creating, updating and deleting the rows of a
//! resource, and the router that wires them up for one resource.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json, Router,
    extract::{FromRef, Path, State, rejection::JsonRejection, rejection::PathRejection},
    http::{StatusCode, header::LOCATION},
    response::{AppendHeaders, IntoResponse},
    routing::{get, put},
};
use rusqlite::Connection;
use serde_json::{Value, json};

use crate::{
    AppState, Claims, Error,
    endpoints::{self, format_endpoint},
    resource::{
        ResourceRow, RowId,
        schema::Resource,
        store::{delete_row, insert_row, list_rows, update_row},
    },
};

/// The state needed to read and write resource rows.
#[derive(Debug, Clone)]
pub struct ResourceState {
    /// The database connection for managing resource rows.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ResourceState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Build the list, create, update and delete routes for `resource`.
///
/// The routes expect [Claims] in the request extensions, so they must be placed
/// behind the auth guard.
pub fn resource_routes(resource: &'static Resource) -> Router<AppState> {
    Router::new()
        .route(
            &endpoints::resource_collection(resource.name),
            get(move |state: State<ResourceState>| list_rows_endpoint(resource, state)).post(
                move |state: State<ResourceState>,
                      claims: Extension<Claims>,
                      body: Result<Json<ResourceRow>, JsonRejection>| {
                    create_row_endpoint(resource, state, claims, body)
                },
            ),
        )
        .route(
            &endpoints::resource_item(resource.name),
            put(
                move |state: State<ResourceState>,
                      claims: Extension<Claims>,
                      id: Result<Path<RowId>, PathRejection>,
                      body: Result<Json<ResourceRow>, JsonRejection>| {
                    update_row_endpoint(resource, state, claims, id, body)
                },
            )
            .delete(
                move |state: State<ResourceState>,
                      claims: Extension<Claims>,
                      id: Result<Path<RowId>, PathRejection>| {
                    delete_row_endpoint(resource, state, claims, id)
                },
            ),
        )
}

fn lock_connection(
    db_connection: &Mutex<Connection>,
) -> Result<std::sync::MutexGuard<'_, Connection>, Error> {
    db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })
}

async fn list_rows_endpoint(
    resource: &'static Resource,
    State(state): State<ResourceState>,
) -> Result<Json<Vec<ResourceRow>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    list_rows(resource, &connection).map(Json)
}

async fn create_row_endpoint(
    resource: &'static Resource,
    State(state): State<ResourceState>,
    Extension(claims): Extension<Claims>,
    body: Result<Json<ResourceRow>, JsonRejection>,
) -> Result<impl IntoResponse, Error> {
    let Json(body) = body?;
    let values = resource.parse_create(&body)?;

    let connection = lock_connection(&state.db_connection)?;
    let row = insert_row(resource, &values, &connection)?;
    let id = row.get("id").and_then(Value::as_i64);

    tracing::info!(
        "{} created {} row {}",
        claims.username,
        resource.name,
        id.unwrap_or_default()
    );

    let location = id.map(|id| {
        (
            LOCATION,
            format_endpoint(&endpoints::resource_item(resource.name), id),
        )
    });

    Ok((StatusCode::CREATED, AppendHeaders(location), Json(row)))
}

async fn update_row_endpoint(
    resource: &'static Resource,
    State(state): State<ResourceState>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<RowId>, PathRejection>,
    body: Result<Json<ResourceRow>, JsonRejection>,
) -> Result<Json<ResourceRow>, Error> {
    let Path(id) = id?;
    let Json(body) = body?;
    let values = resource.parse_update(&body)?;

    let connection = lock_connection(&state.db_connection)?;
    let row = update_row(resource, id, &values, &connection)?;

    tracing::info!("{} updated {} row {id}", claims.username, resource.name);

    Ok(Json(row))
}

async fn delete_row_endpoint(
    resource: &'static Resource,
    State(state): State<ResourceState>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<RowId>, PathRejection>,
) -> Result<Json<Value>, Error> {
    let Path(id) = id?;

    let connection = lock_connection(&state.db_connection)?;
    let rows_affected = delete_row(resource, id, &connection)?;

    if rows_affected == 0 {
        tracing::debug!("{} deleted missing {} row {id}", claims.username, resource.name);
    } else {
        tracing::info!("{} deleted {} row {id}", claims.username, resource.name);
    }

    Ok(Json(json!({"success": true})))
}
