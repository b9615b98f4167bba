use axum::{
    body::Body,
    extract::{
        multipart::{Field, MultipartError},
        Multipart, Path, Query, State,
    },
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
    Json,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::core::error::AppError;
use crate::core::extractor::MaybeUser;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::files::dtos::{
    DeleteFileResponseDto, FilePublicInfoDto, FileResponseDto, MyFilesQueryDto,
    MyFilesResponseDto, UploadFileDto, UploadFileInput,
};
use crate::features::files::services::FileService;
use crate::shared::constants::FILE_PASSWORD_HEADER;
use crate::shared::types::{ApiResponse, Meta};
use crate::shared::validation::is_share_token_shaped;

/// Upload a file
///
/// Accepts multipart/form-data with:
/// - `file`: The file to upload (required)
/// - `isPublic`: "true" (default) or "false"
/// - `password`: Optional download password
/// - `availableFrom` / `availableTo`: Optional RFC 3339 window
/// - `sharedWith`: Emails, repeated or comma separated
#[utoipa::path(
    post,
    path = "/api/files/upload",
    tag = "files",
    request_body(
        content = UploadFileDto,
        content_type = "multipart/form-data",
        description = "File upload form with visibility, password, availability window and whitelist",
    ),
    responses(
        (status = 201, description = "File uploaded successfully", body = ApiResponse<FileResponseDto>),
        (status = 400, description = "Invalid form or validation error"),
        (status = 401, description = "Sign-in required for the requested options"),
        (status = 413, description = "File too large")
    ),
    security(
        (),
        ("bearer_auth" = [])
    )
)]
pub async fn upload_file(
    MaybeUser(user): MaybeUser,
    State(service): State<Arc<FileService>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<FileResponseDto>>), AppError> {
    let input = read_upload_form(multipart).await?;
    let file = service.upload_file(input, user.as_ref()).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(FileResponseDto::new(file, Utc::now())),
            Some("File uploaded successfully".to_string()),
            None,
        )),
    ))
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadFileInput, AppError> {
    let mut input = UploadFileInput::default();
    let mut has_file = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, "multipart data"))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                input.content_type = field.content_type().map(|s| s.to_string());
                input.file_name = field.file_name().unwrap_or("unnamed").to_string();
                input.data = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error(e, "file data"))?;
                has_file = true;
            }
            "isPublic" => {
                let text = read_text(field, &field_name).await?;
                input.is_public = parse_bool(&text)?;
            }
            "password" => {
                let text = read_raw(field, &field_name).await?;
                input.password = Some(text).filter(|p| !p.is_empty());
            }
            "availableFrom" => {
                let text = read_text(field, &field_name).await?;
                input.available_from = parse_timestamp(&text, "availableFrom")?;
            }
            "availableTo" => {
                let text = read_text(field, &field_name).await?;
                input.available_to = parse_timestamp(&text, "availableTo")?;
            }
            "sharedWith" | "sharedWith[]" => {
                let text = read_text(field, &field_name).await?;
                input.shared_with.extend(
                    text.split(',')
                        .map(str::trim)
                        .filter(|e| !e.is_empty())
                        .map(str::to_string),
                );
            }
            _ => {
                debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    if !has_file {
        return Err(AppError::BadRequest("File is required".to_string()));
    }
    Ok(input)
}

fn multipart_error(err: MultipartError, what: &str) -> AppError {
    debug!("Failed to read {}: {}", what, err);
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Request body exceeds the upload limit".to_string())
    } else {
        AppError::BadRequest(format!("Failed to read {}: {}", what, err))
    }
}

async fn read_raw(field: Field<'_>, name: &str) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| multipart_error(e, &format!("{} field", name)))
}

async fn read_text(field: Field<'_>, name: &str) -> Result<String, AppError> {
    read_raw(field, name).await.map(|t| t.trim().to_string())
}

fn parse_bool(text: &str) -> Result<Option<bool>, AppError> {
    match text.to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "true" | "1" | "on" => Ok(Some(true)),
        "false" | "0" | "off" => Ok(Some(false)),
        other => Err(AppError::Validation(format!(
            "isPublic must be true or false, got '{}'",
            other
        ))),
    }
}

fn parse_timestamp(text: &str, name: &str) -> Result<Option<DateTime<Utc>>, AppError> {
    if text.is_empty() {
        return Ok(None);
    }
    DateTime::parse_from_rfc3339(text)
        .map(|t| Some(t.with_timezone(&Utc)))
        .map_err(|_| AppError::Validation(format!("{} must be an RFC 3339 timestamp", name)))
}

/// Public information behind a share link
#[utoipa::path(
    get,
    path = "/api/files/{share_token}",
    params(
        ("share_token" = String, Path, description = "Share token from the link")
    ),
    responses(
        (status = 200, description = "File information", body = ApiResponse<FilePublicInfoDto>),
        (status = 404, description = "File not found"),
        (status = 410, description = "File expired")
    ),
    tag = "files"
)]
pub async fn get_file_info(
    State(service): State<Arc<FileService>>,
    Path(share_token): Path<String>,
) -> Result<Json<ApiResponse<FilePublicInfoDto>>, AppError> {
    if !is_share_token_shaped(&share_token) {
        return Err(AppError::NotFound("File not found".to_string()));
    }

    let file = service.get_file_info(&share_token).await?;
    Ok(Json(ApiResponse::success(
        Some(FilePublicInfoDto::new(file, Utc::now())),
        None,
        None,
    )))
}

/// Download a shared file
///
/// Password protected files take the password in the `X-File-Password` header.
#[utoipa::path(
    get,
    path = "/api/files/{share_token}/download",
    params(
        ("share_token" = String, Path, description = "Share token from the link"),
        ("X-File-Password" = Option<String>, Header, description = "Password for protected files")
    ),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 401, description = "Sign-in required (whitelisted file)"),
        (status = 403, description = "Not whitelisted, or password missing / incorrect"),
        (status = 404, description = "File not found"),
        (status = 410, description = "File expired"),
        (status = 423, description = "File not available yet")
    ),
    tag = "files",
    security(
        (),
        ("bearer_auth" = [])
    )
)]
pub async fn download_file(
    MaybeUser(user): MaybeUser,
    State(service): State<Arc<FileService>>,
    Path(share_token): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if !is_share_token_shaped(&share_token) {
        return Err(AppError::NotFound("File not found".to_string()));
    }

    let credential = headers
        .get(FILE_PASSWORD_HEADER)
        .and_then(|v| v.to_str().ok());

    let download = service
        .download_file(&share_token, user.as_ref(), credential)
        .await?;

    let content_type = HeaderValue::from_str(&download.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&content_disposition(&download.file_name))
        .map_err(|e| AppError::Internal(format!("Invalid content disposition: {}", e)))?;

    let mut response = Response::new(Body::from_stream(download.body));
    let response_headers = response.headers_mut();
    response_headers.insert(header::CONTENT_TYPE, content_type);
    response_headers.insert(header::CONTENT_LENGTH, HeaderValue::from(download.content_length));
    response_headers.insert(header::CONTENT_DISPOSITION, disposition);
    response_headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));

    Ok(response)
}

/// `attachment; filename="..."` with anything outside printable ASCII replaced
fn content_disposition(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();
    format!("attachment; filename=\"{}\"", safe)
}

/// List the caller's files
#[utoipa::path(
    get,
    path = "/api/files/my",
    params(MyFilesQueryDto),
    responses(
        (status = 200, description = "Files owned by the caller", body = ApiResponse<MyFilesResponseDto>),
        (status = 401, description = "Authentication required")
    ),
    tag = "files",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_my_files(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    Query(query): Query<MyFilesQueryDto>,
) -> Result<Json<ApiResponse<MyFilesResponseDto>>, AppError> {
    let result = service.list_my_files(&user, query).await?;
    let now = Utc::now();

    let response = MyFilesResponseDto {
        files: result
            .files
            .into_iter()
            .map(|f| FileResponseDto::new(f, now))
            .collect(),
        summary: result.summary,
    };

    Ok(Json(ApiResponse::success(
        Some(response),
        None,
        Some(Meta::paginated(result.total, &result.page)),
    )))
}

/// File details for the owner or an admin
#[utoipa::path(
    get,
    path = "/api/files/info/{id}",
    params(
        ("id" = Uuid, Path, description = "File id")
    ),
    responses(
        (status = 200, description = "File details", body = ApiResponse<FileResponseDto>),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "File not found")
    ),
    tag = "files",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_file_details(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<FileResponseDto>>, AppError> {
    let file = service.get_file_details(id, &user).await?;
    Ok(Json(ApiResponse::success(
        Some(FileResponseDto::new(file, Utc::now())),
        None,
        None,
    )))
}

/// Delete a file
///
/// Only the owner (or an admin) can delete it; anonymous uploads are never deletable.
#[utoipa::path(
    delete,
    path = "/api/files/info/{id}",
    params(
        ("id" = Uuid, Path, description = "File id")
    ),
    responses(
        (status = 200, description = "File deleted successfully", body = ApiResponse<DeleteFileResponseDto>),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Not authorized to delete this file"),
        (status = 404, description = "File not found")
    ),
    tag = "files",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_file(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DeleteFileResponseDto>>, AppError> {
    service.delete_file(id, &user).await?;

    Ok(Json(ApiResponse::success(
        Some(DeleteFileResponseDto { deleted: true }),
        Some("File deleted successfully".to_string()),
        None,
    )))
}
