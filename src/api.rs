//! REST API for the order packing service.
//!
//! Serves the catalog listings and the packing endpoints.
//! Uses Axum as the web framework and allows cross-origin requests.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
#[allow(unused_imports)]
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};
use utoipa::{OpenApi, ToSchema};

use crate::catalog::{BoxDimensions, Catalog, CatalogProduct};
use crate::config::ApiConfig;
use crate::model::{OrderItem, PackedBox, PackedItem, ValidationError};
use crate::order_sheet::parse_order_sheet;
use crate::packer::{PackingSummary, pack_orders, pack_orders_with_progress};

#[derive(Clone)]
struct ApiState {
    catalog: Arc<Catalog>,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/ on 2025-10-29.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>order-packer API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                window.ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                });
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Response of all packing endpoints.
///
/// # Fields
/// * `packed_boxes` - Boxes in emission order
#[derive(Serialize, ToSchema)]
pub struct ProcessOrdersResponse {
    pub packed_boxes: Vec<PackedBox>,
}

/// Box types keyed by id.
#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct BoxCatalogResponse(pub BTreeMap<i64, BoxDimensions>);

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn validation_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        details,
    )
}

fn order_sheet_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid order sheet",
        details,
    )
}

fn validate_order_items(items: Vec<OrderItem>) -> Result<Vec<OrderItem>, ValidationError> {
    for item in &items {
        item.validate()?;
    }
    Ok(items)
}

fn parse_order_request(
    payload: Result<Json<Vec<OrderItem>>, JsonRejection>,
) -> Result<Vec<OrderItem>, Response> {
    let Json(items) = match payload {
        Ok(payload) => payload,
        Err(err) => return Err(json_deserialize_error(err)),
    };

    validate_order_items(items).map_err(|err| validation_error(err.to_string()))
}

impl ProcessOrdersResponse {
    /// Packs validated order lines against the catalog snapshot.
    fn pack(catalog: &Catalog, items: &[OrderItem]) -> Self {
        let packed_boxes = pack_orders(items, catalog.product_info(), catalog.box_colors());
        let summary = PackingSummary::from_boxes(&packed_boxes);
        info!(
            boxes = summary.boxes,
            customers = summary.customers,
            items = summary.items,
            total_weight = summary.total_weight,
            oversized = summary.oversized_boxes,
            "📦 Orders packed"
        );
        Self { packed_boxes }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handle_products,
        handle_boxes,
        handle_process_orders,
        handle_process_orders_csv,
        handle_process_orders_stream
    ),
    components(
        schemas(
            OrderItem,
            ProcessOrdersResponse,
            PackedBox,
            PackedItem,
            CatalogProduct,
            BoxDimensions,
            BoxCatalogResponse,
            ErrorResponse
        )
    ),
    tags(
        (name = "catalog", description = "Products and box types known to the packer"),
        (name = "packing", description = "Endpoints for order packing")
    )
)]
struct ApiDoc;

fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        // Catalog
        .route("/products", get(handle_products))
        .route("/boxes", get(handle_boxes))
        // Packing
        .route("/process-orders", post(handle_process_orders))
        .route("/process-orders/csv", post(handle_process_orders_csv))
        .route("/process-orders/stream", post(handle_process_orders_stream))
        // API documentation
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(state)
}

/// Starts the API server with the given catalog snapshot.
///
/// Blocks until the server terminates. Bind and serve failures are returned.
pub async fn start_api_server(config: ApiConfig, catalog: Catalog) -> std::io::Result<()> {
    let state = ApiState {
        catalog: Arc::new(catalog),
    };
    let app = router(state);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let display_host = config.display_host();
    info!(
        "🚀 Server running on http://{}:{}",
        display_host,
        config.port()
    );
    if config.binds_to_all_interfaces() && config.uses_default_host() {
        info!("💡 Local access: http://localhost:{}", config.port());
    }
    info!(
        "📦 Endpoints: GET /products, GET /boxes, POST /process-orders, \
         POST /process-orders/csv, POST /process-orders/stream"
    );
    info!("📑 Documentation: GET /docs, GET /docs/openapi.json");

    axum::serve(listener, app).await
}

/// Handler for GET /products.
#[utoipa::path(
    get,
    path = "/products",
    responses((status = 200, description = "All catalog products", body = [CatalogProduct])),
    tag = "catalog"
)]
async fn handle_products(State(state): State<ApiState>) -> Response {
    Json(state.catalog.products().to_vec()).into_response()
}

/// Handler for GET /boxes.
#[utoipa::path(
    get,
    path = "/boxes",
    responses((status = 200, description = "Box types keyed by id", body = BoxCatalogResponse)),
    tag = "catalog"
)]
async fn handle_boxes(State(state): State<ApiState>) -> Response {
    Json(BoxCatalogResponse(state.catalog.box_dimensions())).into_response()
}

/// Handler for POST /process-orders.
///
/// Takes a list of order lines and packs them into numbered, stacked boxes.
#[utoipa::path(
    post,
    path = "/process-orders",
    request_body = Vec<OrderItem>,
    responses(
        (status = 200, description = "Successfully packed orders", body = ProcessOrdersResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Malformed JSON or invalid order line",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_process_orders(
    State(state): State<ApiState>,
    payload: Result<Json<Vec<OrderItem>>, JsonRejection>,
) -> Response {
    let items = match parse_order_request(payload) {
        Ok(items) => items,
        Err(response) => return response,
    };

    info!("📥 New order request: {} lines", items.len());
    let response = ProcessOrdersResponse::pack(&state.catalog, &items);
    (StatusCode::OK, Json(response)).into_response()
}

/// Handler for POST /process-orders/csv.
///
/// Accepts a wide-format order sheet (products as rows, customers as columns).
#[utoipa::path(
    post,
    path = "/process-orders/csv",
    request_body(content = String, description = "Order sheet", content_type = "text/csv"),
    responses(
        (status = 200, description = "Successfully packed orders", body = ProcessOrdersResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Unreadable order sheet or invalid order line",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_process_orders_csv(State(state): State<ApiState>, body: String) -> Response {
    let items = match parse_order_sheet(&body) {
        Ok(items) => items,
        Err(err) => return order_sheet_error(err.to_string()),
    };
    let items = match validate_order_items(items) {
        Ok(items) => items,
        Err(err) => return validation_error(err.to_string()),
    };

    info!("📥 New order sheet: {} lines", items.len());
    let response = ProcessOrdersResponse::pack(&state.catalog, &items);
    (StatusCode::OK, Json(response)).into_response()
}

/// Handler for POST /process-orders/stream (SSE).
///
/// Streams packing events as Server-Sent Events (text/event-stream).
#[utoipa::path(
    post,
    path = "/process-orders/stream",
    request_body = Vec<OrderItem>,
    responses(
        (
            status = 200,
            description = "Streams packing events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Malformed JSON or invalid order line",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_process_orders_stream(
    State(state): State<ApiState>,
    payload: Result<Json<Vec<OrderItem>>, JsonRejection>,
) -> Response {
    let items = match parse_order_request(payload) {
        Ok(items) => items,
        Err(response) => return response,
    };

    let (tx, rx) = mpsc::channel::<String>(32);
    let catalog = Arc::clone(&state.catalog);

    tokio::task::spawn_blocking(move || {
        let mut receiver_open = true;
        pack_orders_with_progress(
            &items,
            catalog.product_info(),
            catalog.box_colors(),
            |evt| {
                if !receiver_open {
                    return;
                }
                if let Ok(json) = serde_json::to_string(evt) {
                    if tx.blocking_send(json).is_err() {
                        debug!("event stream closed by client");
                        receiver_open = false;
                    }
                }
            },
        );
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

async fn serve_openapi_json() -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui() -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}
