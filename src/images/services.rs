use anyhow::Context;
use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

pub const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "png", "jpeg"];

/// A file taken off a multipart request, not yet uploaded.
#[derive(Debug, Clone)]
pub struct UploadItem {
    pub filename: String,
    pub body: Bytes,
}

fn allowed_extension(filename: &str) -> Option<&'static str> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.iter().copied().find(|allowed| *allowed == ext)
}

fn mime_from_ext(ext: &str) -> &'static str {
    match ext {
        "png" => "image/png",
        _ => "image/jpeg",
    }
}

/// Keep the original file stem readable in the object key without letting it
/// introduce path segments.
fn sanitize_stem(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let stem = base.rsplit_once('.').map(|(s, _)| s).unwrap_or(base);
    let cleaned: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .take(64)
        .collect();
    if cleaned.is_empty() {
        "image".into()
    } else {
        cleaned
    }
}

/// Push the file to the image store and return its durable URL.
/// Runs before any database write so a failed upload leaves nothing behind.
pub async fn upload_image(st: &AppState, item: UploadItem) -> Result<String, AppError> {
    let ext = allowed_extension(&item.filename).ok_or_else(|| {
        warn!(filename = %item.filename, "rejected image extension");
        AppError::BadRequest(format!(
            "image must be one of: {}",
            ALLOWED_EXTENSIONS.join(", ")
        ))
    })?;
    if item.body.is_empty() {
        return Err(AppError::BadRequest("image is empty".into()));
    }

    let key = format!(
        "{}/{}-{}.{}",
        st.config.images.folder,
        Uuid::new_v4(),
        sanitize_stem(&item.filename),
        ext
    );
    st.images
        .put_object(&key, item.body, mime_from_ext(ext))
        .await
        .with_context(|| format!("put_object {}", key))?;

    let url = st.images.public_url(&key);
    info!(%key, "image uploaded");
    Ok(url)
}
