use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Uploaded file metadata. The bytes live in object storage under `file_path`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Document {
    pub id: Uuid,
    pub user_id: Uuid,
    pub lab_result_id: Option<Uuid>,
    pub file_name: String,
    pub file_path: String,
    pub file_type: String,
    pub file_size: i64,
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub upload_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub id: Uuid,
    pub user_id: Uuid,
    pub lab_result_id: Option<Uuid>,
    pub file_name: String,
    pub file_path: String,
    pub file_type: String,
    pub file_size: i64,
    pub description: Option<String>,
}

/// File extension for the content types we accept.
pub fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "application/pdf" => Some("pdf"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        "text/plain" => Some("txt"),
        _ => None,
    }
}

/// Content type guessed from a file name, for clients that send
/// `application/octet-stream`.
pub fn mime_from_file_name(name: &str) -> Option<&'static str> {
    let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some("application/pdf"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        "txt" => Some("text/plain"),
        _ => None,
    }
}

pub fn object_key(user_id: Uuid, document_id: Uuid, ext: &str) -> String {
    format!("documents/{user_id}/{document_id}.{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("application/pdf"), Some("pdf"));
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/heic"), Some("heic"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
        assert_eq!(ext_from_mime("application/x-msdownload"), None);
    }

    #[test]
    fn test_mime_from_file_name() {
        assert_eq!(mime_from_file_name("CBC Panel.PDF"), Some("application/pdf"));
        assert_eq!(mime_from_file_name("scan.jpeg"), Some("image/jpeg"));
        assert_eq!(mime_from_file_name("setup.exe"), None);
        assert_eq!(mime_from_file_name("noext"), None);
    }

    #[test]
    fn keys_are_scoped_by_owner() {
        let user = Uuid::new_v4();
        let doc = Uuid::new_v4();
        assert_eq!(
            object_key(user, doc, "pdf"),
            format!("documents/{user}/{doc}.pdf")
        );
    }
}
