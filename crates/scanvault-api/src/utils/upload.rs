use axum::extract::Multipart;
use axum::http::StatusCode;
use bytes::Bytes;
use scanvault_core::AppError;

const MAX_FILENAME_LENGTH: usize = 255;

/// File part of an upload request.
#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub data: Bytes,
}

/// Read the single `file` field from a multipart body.
pub async fn extract_multipart_file(mut multipart: Multipart) -> Result<UploadedFile, AppError> {
    let mut uploaded: Option<UploadedFile> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge("Request body exceeds the upload limit".to_string())
        } else {
            AppError::InvalidInput(format!("Failed to read multipart: {}", e))
        }
    })? {
        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();
        if field_name != "file" {
            continue;
        }
        if uploaded.is_some() {
            return Err(AppError::InvalidInput(
                "Multiple file fields are not allowed; send exactly one field named 'file'"
                    .to_string(),
            ));
        }

        let file_name = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let data = field.bytes().await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                AppError::PayloadTooLarge("Request body exceeds the upload limit".to_string())
            } else {
                AppError::InvalidInput(format!("Failed to read file data: {}", e))
            }
        })?;

        uploaded = Some(UploadedFile { file_name, data });
    }

    uploaded.ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))
}

/// Strip directories and unusual characters from a client-supplied file name.
pub fn sanitize_filename(filename: &str) -> Result<String, AppError> {
    if filename.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(AppError::InvalidInput(
            "Filename contains invalid path traversal".to_string(),
        ));
    }

    let filename_only = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    let sanitized: String = filename_only
        .chars()
        .take(MAX_FILENAME_LENGTH)
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.trim_matches(['.', '_']).is_empty() {
        return Ok("file".to_string());
    }

    Ok(sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_filename_rejects_path_traversal() {
        assert!(sanitize_filename("..").is_err());
        assert!(sanitize_filename("foo/../bar.exe").is_err());
        assert!(sanitize_filename("..\\windows\\evil.dll").is_err());
    }

    #[test]
    fn sanitize_filename_strips_directories_and_symbols() {
        assert_eq!(sanitize_filename("invoice.pdf").unwrap(), "invoice.pdf");
        assert_eq!(sanitize_filename("/tmp/my report.pdf").unwrap(), "my_report.pdf");
        assert_eq!(sanitize_filename("C:\\Users\\a\\setup.exe").unwrap(), "setup.exe");
        assert_eq!(sanitize_filename("???").unwrap(), "file");
    }
}
