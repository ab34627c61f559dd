use crate::error::{Error, Result};
use std::path::Path;
use tokio::fs;

pub const MAX_CV_BYTES: usize = 5 * 1024 * 1024;

const ALLOWED_CV_EXTS: [&str; 6] = ["pdf", "doc", "docx", "jpg", "jpeg", "png"];

/// Checks the upload against the CV rules and returns the normalized
/// extension. Content sniffing only covers formats with a stable magic
/// prefix; doc/docx are accepted on extension alone.
pub fn validate_cv_upload(filename: &str, data: &[u8]) -> Result<String> {
    if data.is_empty() {
        return Err(Error::Validation("CV/Resume is required".into()));
    }

    if data.len() > MAX_CV_BYTES {
        return Err(Error::Validation(
            "CV file size must be less than 5MB".into(),
        ));
    }

    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if !ALLOWED_CV_EXTS.contains(&ext.as_str()) {
        return Err(Error::Validation(
            "Allowed file types: PDF, Word, JPEG, PNG".into(),
        ));
    }

    if ext == "pdf" && !data.starts_with(b"%PDF") {
        return Err(Error::Validation("Invalid PDF file content".into()));
    }
    if (ext == "jpg" || ext == "jpeg") && !data.starts_with(&[0xFF, 0xD8]) {
        return Err(Error::Validation("Invalid JPEG file content".into()));
    }
    if ext == "png" && !data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        return Err(Error::Validation("Invalid PNG file content".into()));
    }

    Ok(ext)
}

/// Validates and stores a CV upload under the configured uploads directory,
/// returning the stored path.
pub async fn save_cv_file(filename: &str, data: &bytes::Bytes) -> Result<String> {
    let ext = validate_cv_upload(filename, data)?;

    let upload_dir = format!("{}/cv", crate::config::get_config().uploads_dir);
    fs::create_dir_all(&upload_dir)
        .await
        .map_err(|e| Error::Internal(e.to_string()))?;

    let file_id = uuid::Uuid::new_v4();
    let file_path = format!("{}/{}.{}", upload_dir, file_id, ext);

    fs::write(&file_path, data).await.map_err(|e| {
        tracing::error!("Failed to write CV file: {}", e);
        Error::Internal(format!("Failed to save file: {}", e))
    })?;

    Ok(file_path)
}
