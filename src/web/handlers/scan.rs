// POST /scan — identify the uploaded image.
//
// Multipart body with an `image` file field and an optional `method` text
// field (`cloud_vision`, `serpapi` or `selenium`). `?method=` in the query
// string works too; the form field wins when both are given.
//
// POST /scan/legacy — Cloud Vision only, in the original response shape.

use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::web::{api_error, AppState};

#[derive(Deserialize, Default)]
pub struct ScanQuery {
    pub method: Option<String>,
}

/// The parts of a scan upload we care about.
#[derive(Default)]
struct ScanForm {
    image: Option<Vec<u8>>,
    method: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<ScanForm, Response> {
    let mut form = ScanForm::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(api_error(StatusCode::BAD_REQUEST, &e.body_text())),
        };

        match field.name() {
            Some("image") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| api_error(StatusCode::BAD_REQUEST, &e.body_text()))?;
                form.image = Some(bytes.to_vec());
            }
            Some("method") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| api_error(StatusCode::BAD_REQUEST, &e.body_text()))?;
                form.method = Some(text);
            }
            _ => {}
        }
    }

    Ok(form)
}

fn require_image(form: &ScanForm) -> Result<&[u8], Response> {
    match form.image.as_deref() {
        Some(image) if !image.is_empty() => Ok(image),
        _ => Err(api_error(StatusCode::BAD_REQUEST, "No image file provided")),
    }
}

/// POST /scan — run the selected backend and return the common result.
pub async fn scan_image(
    State(state): State<AppState>,
    Query(query): Query<ScanQuery>,
    multipart: Multipart,
) -> Response {
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };
    let image = match require_image(&form) {
        Ok(image) => image,
        Err(response) => return response,
    };

    let method = form.method.as_deref().or(query.method.as_deref());
    match state.scanner.dispatch(image, method, &state.credentials).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /scan/legacy — Cloud Vision in the single-backend response shape.
pub async fn scan_image_legacy(State(state): State<AppState>, multipart: Multipart) -> Response {
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };
    let image = match require_image(&form) {
        Ok(image) => image,
        Err(response) => return response,
    };

    match state.scanner.dispatch_legacy(image, &state.credentials).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => e.into_response(),
    }
}
