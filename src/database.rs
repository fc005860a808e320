//! Database initialization, table definitions and the redb-backed store
//!
//! This module handles the setup of the embedded redb database and
//! implements the repository traits on top of it. Every mutating operation
//! runs in a single write transaction; redb serializes writers, so checks
//! made inside a write transaction hold until it commits.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::model::{NewShortLink, NewUser, ShortLink, User};
use crate::repository::{LinkRepository, UserRepository};

/// Main table for link rows
///
/// Key: link id
/// Value: JSON-serialized [`LinkRow`]
///
/// The click counter is kept out of this row so that an owner's update can
/// never overwrite counts written by concurrent redirects.
pub const TABLE_LINKS: TableDefinition<u64, &str> = TableDefinition::new("links_v1");

/// Unique slug index: slug -> link id
pub const TABLE_SLUGS: TableDefinition<&str, u64> = TableDefinition::new("slugs_v1");

/// Click counters: link id -> clicks
pub const TABLE_CLICKS: TableDefinition<u64, u64> = TableDefinition::new("clicks_v1");

/// Index table for listing links by owner
///
/// Key: composite key in format "{owner_id:020}:{link_id:020}"
/// Value: link id
///
/// Zero padding keeps the lexicographic order equal to creation order.
pub const TABLE_OWNER_INDEX: TableDefinition<&str, u64> = TableDefinition::new("owner_index_v1");

/// Accounts: user id -> JSON-serialized [`User`]
pub const TABLE_USERS: TableDefinition<u64, &str> = TableDefinition::new("users_v1");

/// Unique email index: email -> user id
pub const TABLE_EMAILS: TableDefinition<&str, u64> = TableDefinition::new("emails_v1");

/// Last assigned id per entity
pub const TABLE_SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences_v1");

const SEQ_LINKS: &str = "links";
const SEQ_USERS: &str = "users";

/// Initializes the embedded database and creates required tables
///
/// # Arguments
///
/// * `db_path` - File path where the database should be stored (e.g., "data.db")
///
/// # Example
///
/// ```no_run
/// # use linkcut::database::init_db;
/// let db = init_db("data.db").expect("Failed to initialize database");
/// ```
pub fn init_db(db_path: &str) -> Result<Database> {
    let db = Database::create(db_path)?;

    let write_txn = db.begin_write()?;
    {
        write_txn.open_table(TABLE_LINKS)?;
        write_txn.open_table(TABLE_SLUGS)?;
        write_txn.open_table(TABLE_CLICKS)?;
        write_txn.open_table(TABLE_OWNER_INDEX)?;
        write_txn.open_table(TABLE_USERS)?;
        write_txn.open_table(TABLE_EMAILS)?;
        write_txn.open_table(TABLE_SEQUENCES)?;
    }
    write_txn.commit()?;

    Ok(db)
}

/// Persisted link fields, everything except the click counter
#[derive(Serialize, Deserialize)]
struct LinkRow {
    id: u64,
    slug: String,
    long_url: String,
    created_at: DateTime<Utc>,
    owner_id: Option<u64>,
}

impl LinkRow {
    fn into_link(self, click_count: u64) -> ShortLink {
        ShortLink {
            id: self.id,
            slug: self.slug,
            long_url: self.long_url,
            click_count,
            created_at: self.created_at,
            owner_id: self.owner_id,
        }
    }
}

fn owner_key(owner_id: u64, link_id: u64) -> String {
    format!("{:020}:{:020}", owner_id, link_id)
}

fn next_id(txn: &WriteTransaction, sequence: &str) -> Result<u64> {
    let mut table = txn.open_table(TABLE_SEQUENCES)?;
    let next = table.get(sequence)?.map(|v| v.value()).unwrap_or(0) + 1;
    table.insert(sequence, next)?;
    Ok(next)
}

fn read_row(links: &impl ReadableTable<u64, &'static str>, id: u64) -> Result<Option<LinkRow>> {
    match links.get(id)? {
        Some(value) => Ok(Some(serde_json::from_str(value.value())?)),
        None => Ok(None),
    }
}

fn read_link(
    links: &impl ReadableTable<u64, &'static str>,
    clicks: &impl ReadableTable<u64, u64>,
    id: u64,
) -> Result<Option<ShortLink>> {
    let Some(row) = read_row(links, id)? else {
        return Ok(None);
    };
    let click_count = clicks.get(id)?.map(|c| c.value()).unwrap_or(0);
    Ok(Some(row.into_link(click_count)))
}

/// Repository implementation over a shared redb [`Database`]
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    pub fn new(db: Database) -> Self {
        Self { db: Arc::new(db) }
    }

    /// Opens (or creates) the database file and its tables.
    pub fn open(db_path: &str) -> Result<Self> {
        Ok(Self::new(init_db(db_path)?))
    }
}

#[async_trait]
impl LinkRepository for RedbStore {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<ShortLink>> {
        let read_txn = self.db.begin_read()?;
        let slugs = read_txn.open_table(TABLE_SLUGS)?;
        let Some(id) = slugs.get(slug)?.map(|v| v.value()) else {
            return Ok(None);
        };

        let links = read_txn.open_table(TABLE_LINKS)?;
        let clicks = read_txn.open_table(TABLE_CLICKS)?;
        read_link(&links, &clicks, id)
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<ShortLink>> {
        let read_txn = self.db.begin_read()?;
        let links = read_txn.open_table(TABLE_LINKS)?;
        let clicks = read_txn.open_table(TABLE_CLICKS)?;
        read_link(&links, &clicks, id)
    }

    async fn find_by_owner(&self, owner_id: u64) -> Result<Vec<ShortLink>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(TABLE_OWNER_INDEX)?;
        let links = read_txn.open_table(TABLE_LINKS)?;
        let clicks = read_txn.open_table(TABLE_CLICKS)?;

        // '{' sorts after every digit, so this range covers exactly one owner.
        let start_key = format!("{:020}:", owner_id);
        let end_key = format!("{:020}:{{", owner_id);

        let mut results = Vec::new();
        for entry in index.range(start_key.as_str()..end_key.as_str())? {
            let (_, id) = entry?;
            if let Some(link) = read_link(&links, &clicks, id.value())? {
                results.push(link);
            }
        }
        Ok(results)
    }

    async fn insert(&self, link: NewShortLink) -> Result<ShortLink> {
        let write_txn = self.db.begin_write()?;
        let record = {
            let mut slugs = write_txn.open_table(TABLE_SLUGS)?;
            if slugs.get(link.slug.as_str())?.is_some() {
                // Dropping the transaction aborts it.
                return Err(AppError::slug_taken());
            }

            let id = next_id(&write_txn, SEQ_LINKS)?;
            let row = LinkRow {
                id,
                slug: link.slug,
                long_url: link.long_url,
                created_at: link.created_at,
                owner_id: link.owner_id,
            };
            let row_json = serde_json::to_string(&row)?;

            let mut links = write_txn.open_table(TABLE_LINKS)?;
            links.insert(id, row_json.as_str())?;
            slugs.insert(row.slug.as_str(), id)?;

            let mut clicks = write_txn.open_table(TABLE_CLICKS)?;
            clicks.insert(id, 0u64)?;

            if let Some(owner_id) = row.owner_id {
                let mut index = write_txn.open_table(TABLE_OWNER_INDEX)?;
                index.insert(owner_key(owner_id, id).as_str(), id)?;
            }

            row.into_link(0)
        };
        write_txn.commit()?;

        Ok(record)
    }

    async fn save(&self, link: &ShortLink) -> Result<ShortLink> {
        let write_txn = self.db.begin_write()?;
        let record = {
            let mut links = write_txn.open_table(TABLE_LINKS)?;
            let mut row = read_row(&links, link.id)?.ok_or_else(AppError::url_not_found)?;

            if row.slug != link.slug {
                let mut slugs = write_txn.open_table(TABLE_SLUGS)?;
                let holder = slugs.get(link.slug.as_str())?.map(|v| v.value());
                if holder.is_some_and(|other| other != link.id) {
                    return Err(AppError::slug_taken());
                }
                slugs.remove(row.slug.as_str())?;
                slugs.insert(link.slug.as_str(), link.id)?;
                row.slug = link.slug.clone();
            }
            row.long_url = link.long_url.clone();

            let row_json = serde_json::to_string(&row)?;
            links.insert(link.id, row_json.as_str())?;

            let clicks = write_txn.open_table(TABLE_CLICKS)?;
            let click_count = clicks.get(link.id)?.map(|c| c.value()).unwrap_or(0);
            row.into_link(click_count)
        };
        write_txn.commit()?;

        Ok(record)
    }

    async fn increment_click_count(&self, id: u64) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut clicks = write_txn.open_table(TABLE_CLICKS)?;
            let current = clicks
                .get(id)?
                .map(|c| c.value())
                .ok_or_else(AppError::url_not_found)?;
            clicks.insert(id, current.saturating_add(1))?;
        }
        write_txn.commit()?;

        Ok(())
    }

    async fn delete_by_id(&self, id: u64) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut links = write_txn.open_table(TABLE_LINKS)?;
            let row = read_row(&links, id)?.ok_or_else(AppError::url_not_found)?;
            links.remove(id)?;

            write_txn.open_table(TABLE_SLUGS)?.remove(row.slug.as_str())?;
            write_txn.open_table(TABLE_CLICKS)?.remove(id)?;

            if let Some(owner_id) = row.owner_id {
                let mut index = write_txn.open_table(TABLE_OWNER_INDEX)?;
                index.remove(owner_key(owner_id, id).as_str())?;
            }
        }
        write_txn.commit()?;

        Ok(())
    }
}

#[async_trait]
impl UserRepository for RedbStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let read_txn = self.db.begin_read()?;
        let emails = read_txn.open_table(TABLE_EMAILS)?;
        let Some(id) = emails.get(email)?.map(|v| v.value()) else {
            return Ok(None);
        };

        let users = read_txn.open_table(TABLE_USERS)?;
        match users.get(id)? {
            Some(value) => Ok(Some(serde_json::from_str(value.value())?)),
            None => Ok(None),
        }
    }

    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let write_txn = self.db.begin_write()?;
        let record = {
            let mut emails = write_txn.open_table(TABLE_EMAILS)?;
            if emails.get(user.email.as_str())?.is_some() {
                return Err(AppError::Conflict("Email already registered".to_string()));
            }

            let id = next_id(&write_txn, SEQ_USERS)?;
            let record = User {
                id,
                email: user.email,
                password_hash: user.password_hash,
                created_at: user.created_at,
            };
            let user_json = serde_json::to_string(&record)?;

            write_txn
                .open_table(TABLE_USERS)?
                .insert(id, user_json.as_str())?;
            emails.insert(record.email.as_str(), id)?;

            record
        };
        write_txn.commit()?;

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn store() -> (RedbStore, NamedTempFile) {
        let temp_db = NamedTempFile::new().unwrap();
        let store = RedbStore::open(temp_db.path().to_str().unwrap()).unwrap();
        (store, temp_db)
    }

    fn new_link(slug: &str, owner_id: Option<u64>) -> NewShortLink {
        NewShortLink {
            slug: slug.to_string(),
            long_url: format!("https://example.com/{}", slug),
            owner_id,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let (store, _tmp) = store();
        let first = store.insert(new_link("one", Some(1))).await.unwrap();
        let second = store.insert(new_link("two", None)).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.click_count, 0);
        assert_eq!(store.find_by_slug("two").await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn insert_rejects_taken_slug_without_writing() {
        let (store, _tmp) = store();
        store.insert(new_link("dup", Some(1))).await.unwrap();

        let err = store.insert(new_link("dup", Some(2))).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(store.find_by_owner(2).await.unwrap().is_empty());
        assert!(store.find_by_id(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn owner_index_lists_only_that_owner_in_order() {
        let (store, _tmp) = store();
        store.insert(new_link("a1", Some(1))).await.unwrap();
        store.insert(new_link("b1", Some(2))).await.unwrap();
        store.insert(new_link("a2", Some(1))).await.unwrap();
        store.insert(new_link("anon", None)).await.unwrap();

        let slugs: Vec<String> = store
            .find_by_owner(1)
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.slug)
            .collect();
        assert_eq!(slugs, vec!["a1", "a2"]);
    }

    #[tokio::test]
    async fn save_moves_slug_index_and_keeps_clicks() {
        let (store, _tmp) = store();
        let mut link = store.insert(new_link("old", Some(1))).await.unwrap();
        store.increment_click_count(link.id).await.unwrap();

        // Stale count in the caller's copy must not be written back.
        link.slug = "new".to_string();
        link.click_count = 0;
        let saved = store.save(&link).await.unwrap();

        assert_eq!(saved.slug, "new");
        assert_eq!(saved.click_count, 1);
        assert!(store.find_by_slug("old").await.unwrap().is_none());
        assert_eq!(store.find_by_slug("new").await.unwrap().unwrap().id, link.id);
    }

    #[tokio::test]
    async fn save_rejects_slug_of_other_link() {
        let (store, _tmp) = store();
        store.insert(new_link("taken", Some(1))).await.unwrap();
        let mut link = store.insert(new_link("mine", Some(1))).await.unwrap();

        link.slug = "taken".to_string();
        let err = store.save(&link).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(store.find_by_id(link.id).await.unwrap().unwrap().slug, "mine");
    }

    #[tokio::test]
    async fn delete_clears_every_index() {
        let (store, _tmp) = store();
        let link = store.insert(new_link("gone", Some(7))).await.unwrap();
        store.delete_by_id(link.id).await.unwrap();

        assert!(store.find_by_id(link.id).await.unwrap().is_none());
        assert!(store.find_by_slug("gone").await.unwrap().is_none());
        assert!(store.find_by_owner(7).await.unwrap().is_empty());

        // The slug is free again.
        store.insert(new_link("gone", Some(7))).await.unwrap();
    }

    #[tokio::test]
    async fn increment_unknown_link_is_not_found() {
        let (store, _tmp) = store();
        let err = store.increment_click_count(42).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn users_are_unique_by_email() {
        let (store, _tmp) = store();
        let user = store
            .insert_user(NewUser {
                email: "a@example.com".into(),
                password_hash: "hash".into(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        assert_eq!(user.id, 1);

        let err = store
            .insert_user(NewUser {
                email: "a@example.com".into(),
                password_hash: "other".into(),
                created_at: Utc::now(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let found = store.find_user_by_email("a@example.com").await.unwrap().unwrap();
        assert_eq!(found.password_hash, "hash");
    }
}
