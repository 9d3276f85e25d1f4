use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::model::{LabResult, LabResultFilter, NewLabResult};
use crate::documents::links::{unique_violation_as, LinkConflict};

#[async_trait]
pub trait LabResultRepository: Send + Sync {
    async fn list_by_user(
        &self,
        user_id: Uuid,
        filter: &LabResultFilter,
    ) -> anyhow::Result<Vec<LabResult>>;

    async fn find_by_user_and_id(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> anyhow::Result<Option<LabResult>>;

    async fn create(&self, new: NewLabResult) -> anyhow::Result<LabResult>;

    /// Writes every mutable column of `result`, scoped to its owner.
    async fn update(&self, result: &LabResult) -> anyhow::Result<Option<LabResult>>;

    /// `false` when nothing owned by `user_id` had that id.
    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool>;
}

pub struct PgLabResultRepository {
    db: PgPool,
}

impl PgLabResultRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LabResultRepository for PgLabResultRepository {
    async fn list_by_user(
        &self,
        user_id: Uuid,
        filter: &LabResultFilter,
    ) -> anyhow::Result<Vec<LabResult>> {
        let rows = sqlx::query_as::<_, LabResult>(
            r#"
            SELECT id, user_id, document_id, test_name, test_date, result_value, unit,
                   reference_range_low, reference_range_high, lab_name, ordering_doctor,
                   notes, is_abnormal, created_at, updated_at
            FROM lab_results
            WHERE user_id = $1
              AND ($2::text IS NULL OR test_name = $2)
              AND ($3::date IS NULL OR test_date >= $3)
              AND ($4::date IS NULL OR test_date <= $4)
            ORDER BY test_date DESC, created_at DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(user_id)
        .bind(&filter.test_name)
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find_by_user_and_id(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> anyhow::Result<Option<LabResult>> {
        let row = sqlx::query_as::<_, LabResult>(
            r#"
            SELECT id, user_id, document_id, test_name, test_date, result_value, unit,
                   reference_range_low, reference_range_high, lab_name, ordering_doctor,
                   notes, is_abnormal, created_at, updated_at
            FROM lab_results
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn create(&self, new: NewLabResult) -> anyhow::Result<LabResult> {
        let row = sqlx::query_as::<_, LabResult>(
            r#"
            INSERT INTO lab_results (id, user_id, document_id, test_name, test_date,
                                     result_value, unit, reference_range_low,
                                     reference_range_high, lab_name, ordering_doctor,
                                     notes, is_abnormal)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id, user_id, document_id, test_name, test_date, result_value, unit,
                      reference_range_low, reference_range_high, lab_name, ordering_doctor,
                      notes, is_abnormal, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(new.document_id)
        .bind(&new.test_name)
        .bind(new.test_date)
        .bind(new.result_value)
        .bind(&new.unit)
        .bind(new.reference_range_low)
        .bind(new.reference_range_high)
        .bind(&new.lab_name)
        .bind(&new.ordering_doctor)
        .bind(&new.notes)
        .bind(new.is_abnormal)
        .fetch_one(&self.db)
        .await
        .map_err(|e| unique_violation_as(e, LinkConflict::DocumentTaken))?;
        Ok(row)
    }

    async fn update(&self, r: &LabResult) -> anyhow::Result<Option<LabResult>> {
        let row = sqlx::query_as::<_, LabResult>(
            r#"
            UPDATE lab_results
               SET document_id = $3,
                   test_name = $4,
                   test_date = $5,
                   result_value = $6,
                   unit = $7,
                   reference_range_low = $8,
                   reference_range_high = $9,
                   lab_name = $10,
                   ordering_doctor = $11,
                   notes = $12,
                   is_abnormal = $13,
                   updated_at = now()
             WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, document_id, test_name, test_date, result_value, unit,
                      reference_range_low, reference_range_high, lab_name, ordering_doctor,
                      notes, is_abnormal, created_at, updated_at
            "#,
        )
        .bind(r.id)
        .bind(r.user_id)
        .bind(r.document_id)
        .bind(&r.test_name)
        .bind(r.test_date)
        .bind(r.result_value)
        .bind(&r.unit)
        .bind(r.reference_range_low)
        .bind(r.reference_range_high)
        .bind(&r.lab_name)
        .bind(&r.ordering_doctor)
        .bind(&r.notes)
        .bind(r.is_abnormal)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| unique_violation_as(e, LinkConflict::DocumentTaken))?;
        Ok(row)
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query(r#"DELETE FROM lab_results WHERE id = $1 AND user_id = $2"#)
            .bind(id)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
