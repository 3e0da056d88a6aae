// src/handlers.rs
use crate::services::relay::{IMMUTABLE_CACHE_CONTROL, MODEL_CONTENT_TYPE};
use crate::{AppState, errors::TerrainError, models::*};
use actix_multipart::Multipart;
use actix_web::{HttpResponse, http::header, web};
use futures_util::TryStreamExt;
use serde::Deserialize;

pub async fn analyze_terrain(
    mut payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, TerrainError> {
    let max_bytes = data.orchestrator.codec().max_bytes();
    let mut image: Option<UploadedImage> = None;
    let mut description: Option<String> = None;

    while let Some(mut field) = payload.try_next().await.map_err(multipart_error)? {
        let name = field.name().to_string();

        match name.as_str() {
            "image" => {
                let content_type = field
                    .content_type()
                    .map(|ct| ct.essence_str().to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());

                // Stop reading as soon as the part exceeds the ceiling.
                let mut bytes = Vec::new();
                while let Some(chunk) = field.try_next().await.map_err(multipart_error)? {
                    data.orchestrator.codec().check_size(bytes.len() + chunk.len())?;
                    bytes.extend_from_slice(&chunk);
                }

                image = Some(UploadedImage::new(bytes, content_type));
            }
            "description" => {
                let mut bytes = Vec::new();
                while let Some(chunk) = field.try_next().await.map_err(multipart_error)? {
                    if bytes.len() + chunk.len() > max_bytes {
                        return Err(TerrainError::Validation(
                            "Description is too long".to_string(),
                        ));
                    }
                    bytes.extend_from_slice(&chunk);
                }
                description = Some(String::from_utf8(bytes).map_err(|_| {
                    TerrainError::Validation("Description must be valid UTF-8".to_string())
                })?);
            }
            _ => {
                // Drain unknown parts so the stream can advance.
                while field.try_next().await.map_err(multipart_error)?.is_some() {}
            }
        }
    }

    let image = image
        .filter(|img| img.size > 0)
        .ok_or_else(|| TerrainError::Validation("Image file is required".to_string()))?;
    let description = description
        .ok_or_else(|| TerrainError::Validation("Description is required".to_string()))?;

    let result = data.orchestrator.run(image, &description).await?;

    Ok(HttpResponse::Ok().json(&result))
}

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    pub url: Option<String>,
}

pub async fn proxy_model(
    query: web::Query<ProxyQuery>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, TerrainError> {
    let url = query
        .url
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| TerrainError::Validation("URL parameter is required".to_string()))?;

    let asset = data.relay.relay(url).await?;

    let mut response = HttpResponse::Ok();
    response
        .content_type(MODEL_CONTENT_TYPE)
        .insert_header((header::CACHE_CONTROL, IMMUTABLE_CACHE_CONTROL))
        .insert_header((header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"));
    if let Some(len) = asset.content_length {
        response.no_chunking(len);
    }

    Ok(response.streaming(asset.body))
}

pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "terrain-insight",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

fn multipart_error(e: actix_multipart::MultipartError) -> TerrainError {
    TerrainError::Validation(format!("Invalid multipart payload: {}", e))
}
