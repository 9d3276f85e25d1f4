use serde::Deserialize;
use uuid::Uuid;

use crate::field::FieldUpdate;

#[derive(Debug, Default, Deserialize)]
pub struct UpdateDocumentRequest {
    #[serde(default)]
    pub description: FieldUpdate<Option<String>>,
    #[serde(default)]
    pub lab_result_id: FieldUpdate<Option<Uuid>>,
}

/// Parsed multipart upload.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub body: Option<bytes::Bytes>,
    pub description: Option<String>,
    pub lab_result_id: Option<Uuid>,
}
