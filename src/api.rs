use crate::AppState;
use crate::gallery::{
    Composer, Composition, CompositionContext, CompositionRequest, GalleryError, GalleryImages,
    ResolvedOptions,
};
use crate::library::{
    CollectionWithGalleries, GalleryRecord, Page, PageRequest, RepositoryError, SortDirection,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const POST_ID_PARAM: &str = "post_id";

/// Splits query pairs into the attribute set and the page context.
fn request_from_query(
    pairs: Vec<(String, String)>,
    preview: bool,
) -> (CompositionRequest, CompositionContext) {
    let mut context = CompositionContext {
        preview,
        ..CompositionContext::default()
    };
    let attributes = pairs.into_iter().filter(|(key, value)| {
        if key == POST_ID_PARAM {
            context.post_id = value.parse().ok();
            false
        } else {
            true
        }
    });
    let request = CompositionRequest::from_pairs(attributes);
    (request, context)
}

async fn run_composition(
    composer: Arc<Composer>,
    request: CompositionRequest,
    context: CompositionContext,
) -> Result<Result<Composition, GalleryError>, StatusCode> {
    tokio::task::spawn_blocking(move || composer.try_compose(&request, &context))
        .await
        .map_err(|e| {
            tracing::error!("Composition task failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

fn gallery_status(error: &GalleryError) -> StatusCode {
    match error {
        GalleryError::GalleryNotFound(_) | GalleryError::CollectionNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        GalleryError::TableMissing(_) => StatusCode::SERVICE_UNAVAILABLE,
        GalleryError::EncodingFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn repository_status(error: &RepositoryError) -> StatusCode {
    match error {
        RepositoryError::NotFound(_) => StatusCode::NOT_FOUND,
        RepositoryError::TableMissing(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    markup: Option<String>,
}

/// Page markup. Errors stay inline so the surrounding page still renders.
pub async fn gallery_handler(
    State(app_state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Html<String>, StatusCode> {
    let (request, context) = request_from_query(pairs, false);
    let composer = app_state.composer.clone();
    let markup = tokio::task::spawn_blocking(move || composer.compose(&request, &context))
        .await
        .map_err(|e| {
            tracing::error!("Composition task failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    Ok(Html(markup))
}

#[derive(Serialize)]
pub struct PreviewResponse {
    markup: String,
    options: Option<ResolvedOptions>,
    images: Option<GalleryImages>,
}

pub async fn gallery_preview_handler(
    State(app_state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, StatusCode> {
    let (request, context) = request_from_query(pairs, true);
    let response = match run_composition(app_state.composer.clone(), request, context).await? {
        Ok(Composition::Gallery {
            markup,
            options,
            images,
        }) => Json(PreviewResponse {
            markup,
            options: Some(*options),
            images: Some(images),
        })
        .into_response(),
        Ok(Composition::Delegated { markup }) => Json(PreviewResponse {
            markup,
            options: None,
            images: None,
        })
        .into_response(),
        Err(e) => {
            tracing::warn!("Preview failed: {}", e);
            let body = ErrorResponse {
                error: e.to_string(),
                markup: Some(e.to_inline_markup()),
            };
            (gallery_status(&e), Json(body)).into_response()
        }
    };
    Ok(response)
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    offset: usize,
    limit: Option<usize>,
    order: Option<String>,
    page: Option<usize>,
}

impl ListParams {
    fn page_request(&self) -> PageRequest {
        let order = self
            .order
            .as_deref()
            .map(|order| order.parse().unwrap_or_default())
            .unwrap_or(SortDirection::Desc);
        PageRequest::new(
            self.offset,
            self.limit.unwrap_or(10).clamp(1, 100),
            order,
            self.page.unwrap_or(1),
        )
    }
}

fn repository_error(e: RepositoryError) -> Response {
    tracing::warn!("Repository lookup failed: {}", e);
    let body = ErrorResponse {
        error: e.to_string(),
        markup: None,
    };
    (repository_status(&e), Json(body)).into_response()
}

pub async fn list_galleries_handler(
    State(app_state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<GalleryRecord>>, Response> {
    app_state
        .galleries
        .list_galleries(params.page_request())
        .map(Json)
        .map_err(repository_error)
}

pub async fn list_collections_handler(
    State(app_state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<CollectionWithGalleries>>, Response> {
    app_state
        .galleries
        .list_collections(params.page_request())
        .map(Json)
        .map_err(repository_error)
}

pub async fn collection_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CollectionWithGalleries>, Response> {
    app_state
        .galleries
        .collection_by_id(&id)
        .map(Json)
        .map_err(repository_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_id_goes_to_context() {
        let pairs = vec![
            ("ids".to_string(), "1,2".to_string()),
            ("post_id".to_string(), "100".to_string()),
        ];
        let (request, context) = request_from_query(pairs, true);
        assert_eq!(request.text("ids").as_deref(), Some("1,2"));
        assert!(!request.is_set("post_id"));
        assert_eq!(context.post_id, Some(100));
        assert!(context.preview);
    }

    #[test]
    fn test_list_params() {
        let params = ListParams {
            offset: 0,
            limit: Some(500),
            order: None,
            page: Some(2),
        };
        let page = params.page_request();
        assert_eq!(page.limit, 100);
        assert_eq!(page.offset, 100);
        assert_eq!(page.order, SortDirection::Desc);
    }

    #[test]
    fn test_error_statuses() {
        assert_eq!(
            gallery_status(&GalleryError::GalleryNotFound("x".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            gallery_status(&GalleryError::TableMissing("galleries".to_string())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            gallery_status(&GalleryError::EmptyGallery),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
