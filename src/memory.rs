//! In-process implementations of the repositories and object storage.
//!
//! Used by `AppState::fake()`. The tables share one lock so deletes can apply
//! the same `SET NULL` rules as the Postgres foreign keys.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    documents::{
        links::LinkConflict,
        model::{Document, NewDocument},
        repo::DocumentRepository,
    },
    lab_results::{
        model::{LabResult, LabResultFilter, NewLabResult},
        repo::LabResultRepository,
    },
    storage::StorageClient,
    trends::{
        model::{NewTrendData, TrendData, TrendFilter},
        repo::TrendRepository,
    },
    users::{
        model::{NewUser, User},
        repo::UserRepository,
    },
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    lab_results: HashMap<Uuid, LabResult>,
    documents: HashMap<Uuid, Document>,
    trends: HashMap<Uuid, TrendData>,
}

impl Tables {
    /// Another lab result already references `document_id`.
    fn lab_document_taken(&self, document_id: Option<Uuid>, except: Option<Uuid>) -> bool {
        self.lab_results
            .values()
            .any(|r| r.document_id == document_id && Some(r.id) != except)
    }

    /// Another document already references `lab_result_id`.
    fn document_lab_taken(&self, lab_result_id: Option<Uuid>, except: Option<Uuid>) -> bool {
        self.documents
            .values()
            .any(|d| d.lab_result_id == lab_result_id && Some(d.id) != except)
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes a user and everything they own.
    pub async fn delete_user(&self, id: Uuid) -> bool {
        let mut t = self.tables.write().await;
        t.lab_results.retain(|_, r| r.user_id != id);
        t.documents.retain(|_, d| d.user_id != id);
        t.trends.retain(|_, d| d.user_id != id);
        t.users.remove(&id).is_some()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.values().find(|u| u.email == email).cloned())
    }

    async fn create(&self, new: NewUser) -> anyhow::Result<Option<User>> {
        let mut t = self.tables.write().await;
        if t.users.values().any(|u| u.email == new.email) {
            return Ok(None);
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            password_hash: new.password_hash,
            first_name: new.first_name,
            last_name: new.last_name,
            date_of_birth: new.date_of_birth,
            gender: new.gender,
            phone: new.phone,
            last_login: None,
            onboarding_completed: false,
            password_reset_token: None,
            password_reset_expires: None,
            created_at: now,
            updated_at: now,
        };
        t.users.insert(user.id, user.clone());
        Ok(Some(user))
    }

    async fn update(&self, user: &User) -> anyhow::Result<Option<User>> {
        let mut t = self.tables.write().await;
        let Some(stored) = t.users.get_mut(&user.id) else {
            return Ok(None);
        };
        stored.first_name = user.first_name.clone();
        stored.last_name = user.last_name.clone();
        stored.date_of_birth = user.date_of_birth;
        stored.gender = user.gender.clone();
        stored.phone = user.phone.clone();
        stored.onboarding_completed |= user.onboarding_completed;
        stored.updated_at = OffsetDateTime::now_utc();
        Ok(Some(stored.clone()))
    }

    async fn record_login(&self, id: Uuid, at: OffsetDateTime) -> anyhow::Result<()> {
        if let Some(u) = self.tables.write().await.users.get_mut(&id) {
            u.last_login = Some(at);
        }
        Ok(())
    }
}

#[async_trait]
impl LabResultRepository for MemoryStore {
    async fn list_by_user(
        &self,
        user_id: Uuid,
        filter: &LabResultFilter,
    ) -> anyhow::Result<Vec<LabResult>> {
        let t = self.tables.read().await;
        let mut rows: Vec<LabResult> = t
            .lab_results
            .values()
            .filter(|r| r.user_id == user_id && filter.matches(r))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.test_date
                .cmp(&a.test_date)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(rows
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect())
    }

    async fn find_by_user_and_id(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> anyhow::Result<Option<LabResult>> {
        let t = self.tables.read().await;
        Ok(t.lab_results
            .get(&id)
            .filter(|r| r.user_id == user_id)
            .cloned())
    }

    async fn create(&self, new: NewLabResult) -> anyhow::Result<LabResult> {
        let mut t = self.tables.write().await;
        anyhow::ensure!(t.users.contains_key(&new.user_id), "lab_results.user_id fk");
        if new.document_id.is_some() && t.lab_document_taken(new.document_id, None) {
            return Err(LinkConflict::DocumentTaken.into());
        }
        let now = OffsetDateTime::now_utc();
        let row = LabResult {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            document_id: new.document_id,
            test_name: new.test_name,
            test_date: new.test_date,
            result_value: new.result_value,
            unit: new.unit,
            reference_range_low: new.reference_range_low,
            reference_range_high: new.reference_range_high,
            lab_name: new.lab_name,
            ordering_doctor: new.ordering_doctor,
            notes: new.notes,
            is_abnormal: new.is_abnormal,
            created_at: now,
            updated_at: now,
        };
        t.lab_results.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update(&self, r: &LabResult) -> anyhow::Result<Option<LabResult>> {
        let mut t = self.tables.write().await;
        if r.document_id.is_some() && t.lab_document_taken(r.document_id, Some(r.id)) {
            return Err(LinkConflict::DocumentTaken.into());
        }
        let Some(stored) = t
            .lab_results
            .get_mut(&r.id)
            .filter(|s| s.user_id == r.user_id)
        else {
            return Ok(None);
        };
        let created_at = stored.created_at;
        *stored = LabResult {
            created_at,
            updated_at: OffsetDateTime::now_utc(),
            ..r.clone()
        };
        Ok(Some(stored.clone()))
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let mut t = self.tables.write().await;
        if !t.lab_results.get(&id).is_some_and(|r| r.user_id == user_id) {
            return Ok(false);
        }
        t.lab_results.remove(&id);
        for doc in t.documents.values_mut() {
            if doc.lab_result_id == Some(id) {
                doc.lab_result_id = None;
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl DocumentRepository for MemoryStore {
    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Document>> {
        let t = self.tables.read().await;
        let mut rows: Vec<Document> = t
            .documents
            .values()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.upload_date.cmp(&a.upload_date));
        Ok(rows)
    }

    async fn find_by_user_and_id(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> anyhow::Result<Option<Document>> {
        let t = self.tables.read().await;
        Ok(t.documents
            .get(&id)
            .filter(|d| d.user_id == user_id)
            .cloned())
    }

    async fn find_by_lab_result(&self, lab_result_id: Uuid) -> anyhow::Result<Option<Document>> {
        let t = self.tables.read().await;
        Ok(t.documents
            .values()
            .find(|d| d.lab_result_id == Some(lab_result_id))
            .cloned())
    }

    async fn create(&self, new: NewDocument) -> anyhow::Result<Document> {
        let mut t = self.tables.write().await;
        anyhow::ensure!(t.users.contains_key(&new.user_id), "documents.user_id fk");
        if new.lab_result_id.is_some() && t.document_lab_taken(new.lab_result_id, None) {
            return Err(LinkConflict::LabResultTaken.into());
        }
        let now = OffsetDateTime::now_utc();
        let doc = Document {
            id: new.id,
            user_id: new.user_id,
            lab_result_id: new.lab_result_id,
            file_name: new.file_name,
            file_path: new.file_path,
            file_type: new.file_type,
            file_size: new.file_size,
            description: new.description,
            upload_date: now,
            updated_at: now,
        };
        t.documents.insert(doc.id, doc.clone());
        Ok(doc)
    }

    async fn update(&self, doc: &Document) -> anyhow::Result<Option<Document>> {
        let mut t = self.tables.write().await;
        if doc.lab_result_id.is_some() && t.document_lab_taken(doc.lab_result_id, Some(doc.id)) {
            return Err(LinkConflict::LabResultTaken.into());
        }
        let Some(stored) = t
            .documents
            .get_mut(&doc.id)
            .filter(|s| s.user_id == doc.user_id)
        else {
            return Ok(None);
        };
        stored.description = doc.description.clone();
        stored.lab_result_id = doc.lab_result_id;
        stored.updated_at = OffsetDateTime::now_utc();
        Ok(Some(stored.clone()))
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let mut t = self.tables.write().await;
        if !t.documents.get(&id).is_some_and(|d| d.user_id == user_id) {
            return Ok(false);
        }
        t.documents.remove(&id);
        for r in t.lab_results.values_mut() {
            if r.document_id == Some(id) {
                r.document_id = None;
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl TrendRepository for MemoryStore {
    async fn list_by_user(
        &self,
        user_id: Uuid,
        filter: &TrendFilter,
    ) -> anyhow::Result<Vec<TrendData>> {
        let t = self.tables.read().await;
        let mut rows: Vec<TrendData> = t
            .trends
            .values()
            .filter(|d| d.user_id == user_id)
            .filter(|d| filter.test_name.as_deref().map_or(true, |n| d.test_name == n))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.test_name
                .cmp(&b.test_name)
                .then(b.end_date.cmp(&a.end_date))
        });
        Ok(rows)
    }

    async fn find_by_user_and_id(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> anyhow::Result<Option<TrendData>> {
        let t = self.tables.read().await;
        Ok(t.trends.get(&id).filter(|d| d.user_id == user_id).cloned())
    }

    async fn create(&self, new: NewTrendData) -> anyhow::Result<TrendData> {
        let mut t = self.tables.write().await;
        anyhow::ensure!(t.users.contains_key(&new.user_id), "trend_data.user_id fk");
        let now = OffsetDateTime::now_utc();
        let row = TrendData {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            test_name: new.test_name,
            start_date: new.start_date,
            end_date: new.end_date,
            count: new.count,
            min_value: new.min_value,
            max_value: new.max_value,
            average: new.average,
            median: new.median,
            standard_deviation: new.standard_deviation,
            created_at: now,
            updated_at: now,
        };
        t.trends.insert(row.id, row.clone());
        Ok(row)
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let mut t = self.tables.write().await;
        if !t.trends.get(&id).is_some_and(|d| d.user_id == user_id) {
            return Ok(false);
        }
        t.trends.remove(&id);
        Ok(true)
    }
}

/// Object storage kept in a map; presigned URLs use a `memory://` scheme.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    objects: Arc<RwLock<HashMap<String, (Bytes, String)>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<(Bytes, String)> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl StorageClient for MemoryStorage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        self.objects
            .write()
            .await
            .insert(key.to_string(), (body, content_type.to_string()));
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn presign_get(
        &self,
        key: &str,
        _download_name: &str,
        ttl: Duration,
    ) -> anyhow::Result<String> {
        anyhow::ensure!(self.objects.read().await.contains_key(key), "no such key {key}");
        Ok(format!("memory://{key}?expires={}", ttl.as_secs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    async fn seed_user(store: &MemoryStore, email: &str) -> User {
        UserRepository::create(
            store,
            NewUser {
                email: email.into(),
                password_hash: "hash".into(),
                first_name: "A".into(),
                last_name: "B".into(),
                date_of_birth: None,
                gender: None,
                phone: None,
            },
        )
        .await
        .unwrap()
        .unwrap()
    }

    fn glucose(user_id: Uuid) -> NewLabResult {
        NewLabResult {
            user_id,
            document_id: None,
            test_name: "Glucose".into(),
            test_date: date!(2025 - 01 - 01),
            result_value: 95.0,
            unit: "mg/dL".into(),
            reference_range_low: None,
            reference_range_high: None,
            lab_name: None,
            ordering_doctor: None,
            notes: None,
            is_abnormal: false,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_not_inserted() {
        let store = MemoryStore::new();
        seed_user(&store, "a@b.com").await;
        let again = UserRepository::create(
            &store,
            NewUser {
                email: "a@b.com".into(),
                password_hash: "other".into(),
                first_name: "C".into(),
                last_name: "D".into(),
                date_of_birth: None,
                gender: None,
                phone: None,
            },
        )
        .await
        .unwrap();
        assert!(again.is_none());
        assert_eq!(store.tables.read().await.users.len(), 1);
    }

    #[tokio::test]
    async fn lookups_are_scoped_to_owner() {
        let store = MemoryStore::new();
        let owner = seed_user(&store, "owner@x.com").await;
        let other = seed_user(&store, "other@x.com").await;
        let row = LabResultRepository::create(&store, glucose(owner.id)).await.unwrap();

        let found = LabResultRepository::find_by_user_and_id(&store, other.id, row.id)
            .await
            .unwrap();
        assert!(found.is_none());
        assert!(!LabResultRepository::delete(&store, other.id, row.id).await.unwrap());
        assert!(LabResultRepository::delete(&store, owner.id, row.id).await.unwrap());
    }

    #[tokio::test]
    async fn deleting_a_document_clears_lab_result_link() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "u@x.com").await;
        let doc = DocumentRepository::create(
            &store,
            NewDocument {
                id: Uuid::new_v4(),
                user_id: user.id,
                lab_result_id: None,
                file_name: "cbc.pdf".into(),
                file_path: "documents/x.pdf".into(),
                file_type: "application/pdf".into(),
                file_size: 10,
                description: None,
            },
        )
        .await
        .unwrap();
        let mut new = glucose(user.id);
        new.document_id = Some(doc.id);
        let row = LabResultRepository::create(&store, new).await.unwrap();

        assert!(DocumentRepository::delete(&store, user.id, doc.id).await.unwrap());
        let row = LabResultRepository::find_by_user_and_id(&store, user.id, row.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.document_id, None);
    }

    #[tokio::test]
    async fn a_document_backs_at_most_one_lab_result() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "one@x.com").await;
        let doc_id = Uuid::new_v4();
        let mut first = glucose(user.id);
        first.document_id = Some(doc_id);
        let first = LabResultRepository::create(&store, first).await.unwrap();

        let mut second = glucose(user.id);
        second.document_id = Some(doc_id);
        let err = LabResultRepository::create(&store, second).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<LinkConflict>(),
            Some(&LinkConflict::DocumentTaken)
        );

        // rewriting the owner of the link is not a conflict
        assert!(LabResultRepository::update(&store, &first).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn stale_profile_write_keeps_onboarding_flag() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "flag@x.com").await;
        let stale = user.clone();

        let mut onboarded = user;
        onboarded.onboarding_completed = true;
        UserRepository::update(&store, &onboarded).await.unwrap();

        let mut renamed = stale;
        renamed.first_name = "Renamed".into();
        let saved = UserRepository::update(&store, &renamed).await.unwrap().unwrap();
        assert_eq!(saved.first_name, "Renamed");
        assert!(saved.onboarding_completed);
    }

    #[tokio::test]
    async fn deleting_a_user_cascades() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "gone@x.com").await;
        LabResultRepository::create(&store, glucose(user.id)).await.unwrap();
        assert!(store.delete_user(user.id).await);
        assert!(store.tables.read().await.lab_results.is_empty());
    }

    #[tokio::test]
    async fn list_is_newest_first_and_paged() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "p@x.com").await;
        for day in [date!(2025 - 01 - 01), date!(2025 - 03 - 01), date!(2025 - 02 - 01)] {
            let mut new = glucose(user.id);
            new.test_date = day;
            LabResultRepository::create(&store, new).await.unwrap();
        }
        let filter = LabResultFilter {
            limit: 2,
            ..Default::default()
        };
        let rows = LabResultRepository::list_by_user(&store, user.id, &filter)
            .await
            .unwrap();
        let dates: Vec<_> = rows.iter().map(|r| r.test_date).collect();
        assert_eq!(dates, vec![date!(2025 - 03 - 01), date!(2025 - 02 - 01)]);
    }

    #[tokio::test]
    async fn storage_roundtrip() {
        let storage = MemoryStorage::new();
        storage
            .put_object("a/b.pdf", Bytes::from_static(b"%PDF"), "application/pdf")
            .await
            .unwrap();
        let ttl = Duration::from_secs(600);
        let url = storage.presign_get("a/b.pdf", "b.pdf", ttl).await.unwrap();
        assert!(url.contains("a/b.pdf"));
        storage.delete_object("a/b.pdf").await.unwrap();
        assert!(storage.presign_get("a/b.pdf", "b.pdf", ttl).await.is_err());
    }
}
