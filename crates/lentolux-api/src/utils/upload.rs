//! Multipart parsing for content uploads

use axum::extract::Multipart;
use lentolux_core::models::ContentType;
use lentolux_core::AppError;

const MAX_TITLE_LEN: usize = 200;

/// Fields of a `POST /content/upload` form
#[derive(Debug)]
pub struct UploadForm {
    pub content_type: ContentType,
    pub title: String,
    pub description: Option<String>,
    pub file_data: Vec<u8>,
    pub original_filename: String,
    pub declared_mime: String,
}

/// Read the upload form. Exactly one field named "file" is accepted.
pub async fn extract_upload_form(
    mut multipart: Multipart,
    max_size: usize,
) -> Result<UploadForm, AppError> {
    let mut content_type: Option<String> = None;
    let mut title: Option<String> = None;
    let mut description: Option<String> = None;
    let mut file: Option<(Vec<u8>, String, String)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read multipart: {}", e)))?
    {
        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();

        match field_name.as_str() {
            "file" => {
                if file.is_some() {
                    return Err(AppError::InvalidInput(
                        "Multiple file fields are not allowed; send exactly one field named 'file'"
                            .to_string(),
                    ));
                }
                let filename = field
                    .file_name()
                    .map(|s: &str| s.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                let mime = field
                    .content_type()
                    .map(|s: &str| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let data = field.bytes().await.map_err(|e| {
                    AppError::InvalidInput(format!("Failed to read file data: {}", e))
                })?;
                validate_file_size(data.len(), max_size)?;
                file = Some((data.to_vec(), filename, mime));
            }
            "content_type" | "title" | "description" => {
                let value = field.text().await.map_err(|e| {
                    AppError::InvalidInput(format!("Failed to read field '{}': {}", field_name, e))
                })?;
                match field_name.as_str() {
                    "content_type" => content_type = Some(value),
                    "title" => title = Some(value),
                    _ => description = Some(value),
                }
            }
            other => {
                tracing::debug!(field = other, "Ignoring unknown multipart field");
            }
        }
    }

    let content_type = parse_content_type(content_type.as_deref())?;
    let title = validate_title(title.as_deref())?;
    let description = description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    let (file_data, original_filename, declared_mime) =
        file.ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))?;

    Ok(UploadForm {
        content_type,
        title,
        description,
        file_data,
        original_filename,
        declared_mime,
    })
}

pub fn parse_content_type(raw: Option<&str>) -> Result<ContentType, AppError> {
    raw.ok_or_else(|| AppError::InvalidInput("content_type is required".to_string()))?
        .parse()
        .map_err(AppError::InvalidInput)
}

pub fn validate_title(raw: Option<&str>) -> Result<String, AppError> {
    let title = raw.map(str::trim).unwrap_or_default();
    if title.is_empty() {
        return Err(AppError::InvalidInput("title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::InvalidInput(format!(
            "title must be at most {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(title.to_string())
}

/// Validate file size
pub fn validate_file_size(file_size: usize, max_size: usize) -> Result<(), AppError> {
    if file_size > max_size {
        return Err(AppError::PayloadTooLarge(format!(
            "File size exceeds maximum of {} MB",
            max_size / 1024 / 1024
        )));
    }
    Ok(())
}
