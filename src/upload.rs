use std::collections::HashMap;
use std::path::Path;

use actix_multipart::Multipart;
use futures_util::StreamExt;
use log::{debug, warn};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;

const MAX_TEXT_FIELD: usize = 64 * 1024;

/// An uploaded file persisted under the upload directory.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub file_name: String,
    pub url: String,
}

/// Text fields of a multipart form plus its (single) file.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub fields: HashMap<String, String>,
    pub file: Option<StoredFile>,
}

impl UploadForm {
    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
    }

    pub fn required(&self, key: &str, message: &str) -> Result<String, AppError> {
        self.text(key)
            .map(str::to_string)
            .ok_or_else(|| AppError::validation(message))
    }

    /// Removes the stored file after the form turned out to be unusable.
    pub async fn discard(&mut self, config: &Config) {
        if let Some(file) = self.file.take() {
            if let Err(e) = fs::remove_file(config.upload_dir.join(&file.file_name)).await {
                warn!("Could not remove rejected upload {}: {}", file.file_name, e);
            }
        }
    }
}

fn extension_of(original: &str) -> Option<String> {
    Path::new(original)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
}

pub fn stored_name(prefix: &str, original: &str) -> String {
    match extension_of(original) {
        Some(ext) => format!("{}-{}.{}", prefix, Uuid::new_v4().simple(), ext),
        None => format!("{}-{}", prefix, Uuid::new_v4().simple()),
    }
}

/// Reads a multipart form, streaming the field named `file_field` to disk.
/// A file field submitted without a filename counts as absent. Any error
/// after the file was created removes it again.
pub async fn read_form(
    mut payload: Multipart,
    file_field: &str,
    prefix: &str,
    config: &Config,
) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();
    match read_fields(&mut payload, &mut form, file_field, prefix, config).await {
        Ok(()) => Ok(form),
        Err(e) => {
            form.discard(config).await;
            Err(e)
        }
    }
}

async fn read_fields(
    payload: &mut Multipart,
    form: &mut UploadForm,
    file_field: &str,
    prefix: &str,
    config: &Config,
) -> Result<(), AppError> {
    while let Some(item) = payload.next().await {
        let mut field = item?;
        let name = field.name().unwrap_or_default().to_string();
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);

        match filename {
            Some(original) if name == file_field && form.file.is_none() && !original.is_empty() => {
                fs::create_dir_all(&config.upload_dir).await?;
                let file_name = stored_name(prefix, &original);
                let mut out = fs::File::create(config.upload_dir.join(&file_name)).await?;
                form.file = Some(StoredFile {
                    url: config.upload_url(&file_name),
                    file_name: file_name.clone(),
                });
                while let Some(chunk) = field.next().await {
                    out.write_all(&chunk?).await?;
                }
                out.flush().await?;
                debug!("Stored upload {} as {}", original, file_name);
            }
            Some(_) => {
                // Drain files nobody asked for.
                while let Some(chunk) = field.next().await {
                    chunk?;
                }
            }
            None => {
                let mut value = Vec::new();
                while let Some(chunk) = field.next().await {
                    let chunk = chunk?;
                    if value.len() + chunk.len() > MAX_TEXT_FIELD {
                        return Err(AppError::validation(format!("Field {} is too large", name)));
                    }
                    value.extend_from_slice(&chunk);
                }
                let value = String::from_utf8(value)
                    .map_err(|_| AppError::validation(format!("Field {} is not valid text", name)))?;
                form.fields.insert(name, value);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_safe_extensions_only() {
        assert_eq!(extension_of("photo.PNG"), Some("png".into()));
        assert_eq!(extension_of("archive.tar.gz"), Some("gz".into()));
        assert_eq!(extension_of("noext"), None);
        assert_eq!(extension_of("weird.p/ng"), None);
    }

    #[test]
    fn stored_names_are_prefixed_and_unique() {
        let a = stored_name("product", "a.jpg");
        let b = stored_name("product", "a.jpg");
        assert!(a.starts_with("product-") && a.ends_with(".jpg"));
        assert_ne!(a, b);
    }
}
