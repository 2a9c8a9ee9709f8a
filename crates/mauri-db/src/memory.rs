//! In-process store implementing every repository trait.
//!
//! Used by tests and by `mauri-web --memory` for local development.
//! Ordering and matching follow the Postgres queries: titles ascending,
//! submissions newest first, search over the same four text fields.

use async_trait::async_trait;
use chrono::Utc;
use mauri_common::query::contains_ignore_case;
use mauri_common::{NewPest, NewSubmission, Pest, PestPatch, Role, Submission, UpsertUser, User};
use tokio::sync::RwLock;

use crate::error::{DbError, Result};
use crate::pests::PestRepository;
use crate::submissions::SubmissionRepository;
use crate::users::UserRepository;

#[derive(Default)]
struct Tables {
    pests: Vec<Pest>,
    submissions: Vec<Submission>,
    users: Vec<User>,
    next_pest_id: i64,
    next_submission_id: i64,
    next_user_id: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_by_title(mut pests: Vec<Pest>) -> Vec<Pest> {
    pests.sort_by(|a, b| a.title.cmp(&b.title));
    pests
}

// ── Pests ────────────────────────────────────────────────────────────────

#[async_trait]
impl PestRepository for MemoryStore {
    async fn list_visible(&self) -> Result<Vec<Pest>> {
        let t = self.tables.read().await;
        Ok(sorted_by_title(t.pests.iter().filter(|p| p.visible).cloned().collect()))
    }

    async fn list_all(&self) -> Result<Vec<Pest>> {
        let t = self.tables.read().await;
        Ok(sorted_by_title(t.pests.clone()))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Pest>> {
        let t = self.tables.read().await;
        Ok(t.pests.iter().find(|p| p.id == id).cloned())
    }

    async fn get_by_title(&self, title: &str) -> Result<Option<Pest>> {
        let t = self.tables.read().await;
        Ok(t.pests.iter().find(|p| p.title == title).cloned())
    }

    async fn search(&self, query: &str) -> Result<Vec<Pest>> {
        if query.trim().is_empty() {
            return self.list_visible().await;
        }
        let t = self.tables.read().await;
        Ok(sorted_by_title(
            t.pests
                .iter()
                .filter(|p| p.visible && contains_ignore_case(p, query))
                .cloned()
                .collect(),
        ))
    }

    async fn create(&self, pest: NewPest) -> Result<Pest> {
        let pest = pest.normalized()?;
        let mut t = self.tables.write().await;
        if t.pests.iter().any(|p| p.title == pest.title) {
            return Err(DbError::Duplicate(format!("pest title '{}'", pest.title)));
        }
        let id = next_id(&mut t.next_pest_id);
        let created = pest.into_pest(id, Utc::now());
        t.pests.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: i64, patch: PestPatch) -> Result<u64> {
        patch.validate()?;
        let mut t = self.tables.write().await;
        if let Some(title) = &patch.title {
            let title = title.trim();
            if t.pests.iter().any(|p| p.id != id && p.title == title) {
                return Err(DbError::Duplicate(format!("pest title '{title}'")));
            }
        }
        match t.pests.iter_mut().find(|p| p.id == id) {
            Some(pest) => {
                patch.apply(pest, Utc::now());
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, id: i64) -> Result<u64> {
        let mut t = self.tables.write().await;
        let before = t.pests.len();
        t.pests.retain(|p| p.id != id);
        Ok((before - t.pests.len()) as u64)
    }

    async fn count(&self) -> Result<i64> {
        let t = self.tables.read().await;
        Ok(t.pests.iter().filter(|p| p.visible).count() as i64)
    }

    async fn count_alerts(&self) -> Result<i64> {
        let t = self.tables.read().await;
        Ok(t.pests.iter().filter(|p| p.visible && p.alert).count() as i64)
    }
}

// ── Submissions ──────────────────────────────────────────────────────────

#[async_trait]
impl SubmissionRepository for MemoryStore {
    async fn create(&self, submission: NewSubmission) -> Result<Submission> {
        let mut t = self.tables.write().await;
        let id = next_id(&mut t.next_submission_id);
        let created = submission.into_submission(id, Utc::now());
        t.submissions.push(created.clone());
        Ok(created)
    }

    async fn list(&self) -> Result<Vec<Submission>> {
        let t = self.tables.read().await;
        let mut all = t.submissions.clone();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(all)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Submission>> {
        let t = self.tables.read().await;
        Ok(t.submissions.iter().find(|s| s.id == id).cloned())
    }

    async fn delete(&self, id: i64) -> Result<u64> {
        let mut t = self.tables.write().await;
        let before = t.submissions.len();
        t.submissions.retain(|s| s.id != id);
        Ok((before - t.submissions.len()) as u64)
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.tables.read().await.submissions.len() as i64)
    }
}

// ── Users ────────────────────────────────────────────────────────────────

#[async_trait]
impl UserRepository for MemoryStore {
    async fn upsert(&self, user: UpsertUser) -> Result<User> {
        if user.open_id.trim().is_empty() {
            return Err(DbError::Common(mauri_common::MauriError::validation(
                "open_id",
                "is required for upsert",
            )));
        }
        let now = Utc::now();
        let signed_in = user.last_signed_in.unwrap_or(now);
        let mut t = self.tables.write().await;

        if let Some(existing) = t.users.iter_mut().find(|u| u.open_id == user.open_id) {
            if user.name.is_some() { existing.name = user.name; }
            if user.email.is_some() { existing.email = user.email; }
            if user.login_method.is_some() { existing.login_method = user.login_method; }
            if let Some(role) = user.role { existing.role = role; }
            existing.last_signed_in = signed_in;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let id = next_id(&mut t.next_user_id);
        let created = User {
            id,
            open_id: user.open_id,
            name: user.name,
            email: user.email,
            login_method: user.login_method,
            role: user.role.unwrap_or(Role::User),
            created_at: now,
            updated_at: now,
            last_signed_in: signed_in,
        };
        t.users.push(created.clone());
        Ok(created)
    }

    async fn find_by_open_id(&self, open_id: &str) -> Result<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.iter().find(|u| u.open_id == open_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use mauri_common::FacetSet;

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        let mut gorse = NewPest::new("Gorse");
        gorse.latin = Some("Ulex europaeus".into());
        gorse.pest_groups = FacetSet::parse("Plants");
        PestRepository::create(&store, gorse).await.unwrap();

        let mut rat = NewPest::new("Ship rat");
        rat.also_known_as = Some("Black rat".into());
        rat.alert = true;
        PestRepository::create(&store, rat).await.unwrap();

        let mut hidden = NewPest::new("Argentine ant");
        hidden.keywords = Some("ant,insect".into());
        hidden.visible = false;
        PestRepository::create(&store, hidden).await.unwrap();
        store
    }

    fn observation(pest_id: i64) -> NewSubmission {
        NewSubmission {
            pest_id,
            pest_title: "Gorse".into(),
            location: "Port Hills".into(),
            observation_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            notes: None,
            impact_whenua: None,
            impact_wai: None,
            impact_tangata: None,
            photo_urls: vec![],
            photo_keys: vec![],
            submitter_name: None,
            submitter_email: None,
            ip_address: None,
            user_agent: None,
        }
    }

    #[tokio::test]
    async fn test_hidden_pests_excluded_from_public_reads() {
        let store = seeded().await;
        let visible = store.list_visible().await.unwrap();
        let titles: Vec<_> = visible.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Gorse", "Ship rat"]);
        assert_eq!(store.list_all().await.unwrap().len(), 3);
        assert!(store.search("insect").await.unwrap().is_empty());
        assert_eq!(PestRepository::count(&store).await.unwrap(), 2);
        assert_eq!(store.count_alerts().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_search_blank_equals_list_visible() {
        let store = seeded().await;
        let visible = store.list_visible().await.unwrap();
        assert_eq!(store.search("").await.unwrap(), visible);
        assert_eq!(store.search("   \t").await.unwrap(), visible);
        let hits = store.search("BLACK").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Ship rat");
    }

    #[tokio::test]
    async fn test_get_by_title_is_exact() {
        let store = seeded().await;
        assert_eq!(store.get_by_title("Gorse").await.unwrap().unwrap().title, "Gorse");
        assert!(store.get_by_title("gorse").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_title_rejected() {
        let store = seeded().await;
        let err = PestRepository::create(&store, NewPest::new(" Gorse ")).await.unwrap_err();
        assert!(matches!(err, DbError::Duplicate(_)));

        let rename = PestPatch { title: Some("Gorse".into()), ..Default::default() };
        let rat = store.get_by_title("Ship rat").await.unwrap().unwrap();
        assert!(matches!(store.update(rat.id, rename).await, Err(DbError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_update_and_idempotent_delete() {
        let store = seeded().await;
        let gorse = store.get_by_title("Gorse").await.unwrap().unwrap();

        let patch = PestPatch { visible: Some(false), ..Default::default() };
        assert_eq!(store.update(gorse.id, patch.clone()).await.unwrap(), 1);
        assert_eq!(store.update(9999, patch).await.unwrap(), 0);
        assert!(!PestRepository::get_by_id(&store, gorse.id).await.unwrap().unwrap().visible);

        assert_eq!(PestRepository::delete(&store, gorse.id).await.unwrap(), 1);
        assert_eq!(PestRepository::delete(&store, gorse.id).await.unwrap(), 0);
        assert_eq!(PestRepository::delete(&store, 424242).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_submissions_newest_first() {
        let store = MemoryStore::new();
        let first = SubmissionRepository::create(&store, observation(1)).await.unwrap();
        let second = SubmissionRepository::create(&store, observation(2)).await.unwrap();
        let listed = store.list().await.unwrap();
        assert_eq!(listed.iter().map(|s| s.id).collect::<Vec<_>>(), vec![second.id, first.id]);
        assert_eq!(SubmissionRepository::count(&store).await.unwrap(), 2);
        assert_eq!(SubmissionRepository::delete(&store, first.id).await.unwrap(), 1);
        assert!(SubmissionRepository::get_by_id(&store, first.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_keeps_unsupplied_fields() {
        let store = MemoryStore::new();
        let mut first = UpsertUser::new("abc");
        first.name = Some("Aroha".into());
        first.role = Some(Role::Admin);
        let created = store.upsert(first).await.unwrap();

        let again = store.upsert(UpsertUser::new("abc")).await.unwrap();
        assert_eq!(again.id, created.id);
        assert_eq!(again.name.as_deref(), Some("Aroha"));
        assert_eq!(again.role, Role::Admin);
        assert!(again.last_signed_in >= created.last_signed_in);

        assert!(store.upsert(UpsertUser::new(" ")).await.is_err());
        assert!(store.find_by_open_id("nobody").await.unwrap().is_none());
    }
}
