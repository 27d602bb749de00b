use std::collections::HashMap;

use axum::extract::Multipart;

use super::services::UploadItem;
use crate::error::AppError;

/// Multipart body drained into text fields and files.
/// Repeated text fields keep their order; `name[]` and `name` share a slot.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, Vec<String>>,
    files: HashMap<String, UploadItem>,
}

fn slot(name: &str) -> String {
    name.strip_suffix("[]").unwrap_or(name).to_string()
}

impl MultipartForm {
    pub async fn read(mut mp: Multipart) -> Result<Self, AppError> {
        let mut form = MultipartForm::default();
        while let Some(field) = mp
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
        {
            let Some(name) = field.name().map(slot) else {
                continue;
            };
            match field.file_name().map(str::to_string) {
                Some(filename) => {
                    let body = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(e.body_text()))?;
                    form.files.insert(name, UploadItem { filename, body });
                }
                None => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.body_text()))?;
                    form.fields.entry(name).or_default().push(text);
                }
            }
        }
        Ok(form)
    }

    /// First value of a text field, trimmed; `None` when absent or blank.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .and_then(|values| values.first())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Every value of a repeated text field, byte for byte, in submitted order.
    pub fn list(&self, name: &str) -> Vec<String> {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadItem> {
        self.files.remove(name)
    }

    pub fn require_file(&mut self, name: &str) -> Result<UploadItem, AppError> {
        self.take_file(name)
            .ok_or_else(|| AppError::BadRequest(format!("{name} file is required")))
    }
}

#[cfg(test)]
impl MultipartForm {
    pub(crate) fn with_fields(pairs: &[(&str, &str)]) -> Self {
        let mut form = MultipartForm::default();
        for (name, value) in pairs {
            form.fields
                .entry(slot(name))
                .or_default()
                .push(value.to_string());
        }
        form
    }
}
