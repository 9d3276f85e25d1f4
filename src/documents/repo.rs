use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    links::{unique_violation_as, LinkConflict},
    model::{Document, NewDocument},
};

#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Document>>;

    async fn find_by_user_and_id(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> anyhow::Result<Option<Document>>;

    /// The document attached to a lab result, whoever owns it.
    async fn find_by_lab_result(&self, lab_result_id: Uuid) -> anyhow::Result<Option<Document>>;

    async fn create(&self, new: NewDocument) -> anyhow::Result<Document>;

    /// Writes `description` and `lab_result_id`, scoped to the owner.
    async fn update(&self, doc: &Document) -> anyhow::Result<Option<Document>>;

    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool>;
}

pub struct PgDocumentRepository {
    db: PgPool,
}

impl PgDocumentRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DocumentRepository for PgDocumentRepository {
    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Document>> {
        let rows = sqlx::query_as::<_, Document>(
            r#"
            SELECT id, user_id, lab_result_id, file_name, file_path, file_type, file_size,
                   description, upload_date, updated_at
              FROM documents
             WHERE user_id = $1
             ORDER BY upload_date DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list documents by user")?;
        Ok(rows)
    }

    async fn find_by_user_and_id(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> anyhow::Result<Option<Document>> {
        let row = sqlx::query_as::<_, Document>(
            r#"
            SELECT id, user_id, lab_result_id, file_name, file_path, file_type, file_size,
                   description, upload_date, updated_at
              FROM documents
             WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("get document")?;
        Ok(row)
    }

    async fn find_by_lab_result(&self, lab_result_id: Uuid) -> anyhow::Result<Option<Document>> {
        let row = sqlx::query_as::<_, Document>(
            r#"
            SELECT id, user_id, lab_result_id, file_name, file_path, file_type, file_size,
                   description, upload_date, updated_at
              FROM documents
             WHERE lab_result_id = $1
            "#,
        )
        .bind(lab_result_id)
        .fetch_optional(&self.db)
        .await
        .context("get document by lab result")?;
        Ok(row)
    }

    async fn create(&self, new: NewDocument) -> anyhow::Result<Document> {
        let row = sqlx::query_as::<_, Document>(
            r#"
            INSERT INTO documents (id, user_id, lab_result_id, file_name, file_path,
                                   file_type, file_size, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, user_id, lab_result_id, file_name, file_path, file_type, file_size,
                      description, upload_date, updated_at
            "#,
        )
        .bind(new.id)
        .bind(new.user_id)
        .bind(new.lab_result_id)
        .bind(&new.file_name)
        .bind(&new.file_path)
        .bind(&new.file_type)
        .bind(new.file_size)
        .bind(&new.description)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            unique_violation_as(e, LinkConflict::LabResultTaken).context("insert document")
        })?;
        Ok(row)
    }

    async fn update(&self, doc: &Document) -> anyhow::Result<Option<Document>> {
        let row = sqlx::query_as::<_, Document>(
            r#"
            UPDATE documents
               SET description = $3,
                   lab_result_id = $4,
                   updated_at = now()
             WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, lab_result_id, file_name, file_path, file_type, file_size,
                      description, upload_date, updated_at
            "#,
        )
        .bind(doc.id)
        .bind(doc.user_id)
        .bind(&doc.description)
        .bind(doc.lab_result_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| {
            unique_violation_as(e, LinkConflict::LabResultTaken).context("update document")
        })?;
        Ok(row)
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query(r#"DELETE FROM documents WHERE id = $1 AND user_id = $2"#)
            .bind(id)
            .bind(user_id)
            .execute(&self.db)
            .await
            .context("delete document")?;
        Ok(res.rows_affected() > 0)
    }
}
