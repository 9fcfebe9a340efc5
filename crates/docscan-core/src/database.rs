//! Database handle
//!
//! `Database` owns the SQLite engine and is what every other component is
//! handed. It is explicitly constructed (usually once at startup) and cheap
//! to clone; clones share the engine.
//!
//! ## Engines
//!
//! At most one engine is opened per backing file. A process-wide registry,
//! keyed by canonical path, hands out the live engine to later openers and
//! serialises concurrent first opens. The registry holds weak references,
//! so dropping the last handle closes the file.
//!
//! ## Async access
//!
//! DAO work runs on tokio's blocking pool while the caller awaits. The
//! connection lock is held for one operation (or one transaction), which
//! serialises writes and gives each read a consistent view.
//!
//! ```ignore
//! let db = Database::open(&config)?;
//! let id = db.persist_document(Document::new(Some("Lease".into()))).await?;
//! let doc = db.document(id).await?;
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, Weak};
use std::time::Duration;

use rusqlite::Connection;
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::dao::Dao;
use crate::models::{
    Document, DocumentDetails, DocumentDraft, DocumentImageRelation, DocumentTagRelation, Image,
    Tag, TagWithDocuments,
};
use crate::observe::{ChangeNotifier, LiveQuery, Table, SAVE_TABLES};
use crate::storage::{init_schema, needs_init, StorageError, StorageResult};

/// How long a statement waits on a lock held by another process
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open engines by canonical file path
static ENGINES: OnceLock<Mutex<HashMap<PathBuf, Weak<Engine>>>> = OnceLock::new();

struct Engine {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
    changes: ChangeNotifier,
}

impl Engine {
    fn new(conn: Connection, path: Option<PathBuf>) -> StorageResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        if needs_init(&conn) {
            init_schema(&conn)?;
        }

        Ok(Self {
            conn: Mutex::new(conn),
            path,
            changes: ChangeNotifier::new(),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }
}

/// Shared handle to the document store
#[derive(Clone)]
pub struct Database {
    engine: Arc<Engine>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.engine.path)
            .finish()
    }
}

impl Database {
    /// Open the database configured in `config`
    pub fn open(config: &Config) -> StorageResult<Self> {
        Self::open_path(config.database_path())
    }

    /// Open the database stored at `path`, reusing an engine already open
    /// for that file
    pub fn open_path(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| StorageError::create_directory(e, parent.to_path_buf()))?;
        }

        let key = registry_key(path);
        let registry = ENGINES.get_or_init(Default::default);
        let mut engines = registry.lock().map_err(|_| StorageError::Poisoned)?;

        if let Some(engine) = engines.get(&key).and_then(Weak::upgrade) {
            debug!(path = %key.display(), "reusing open database");
            return Ok(Self { engine });
        }

        let conn = Connection::open(&key)?;
        let engine = Arc::new(Engine::new(conn, Some(key.clone()))?);

        engines.retain(|_, weak| weak.strong_count() > 0);
        engines.insert(key.clone(), Arc::downgrade(&engine));
        info!(path = %key.display(), "opened database");

        Ok(Self { engine })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            engine: Arc::new(Engine::new(conn, None)?),
        })
    }

    /// Backing file, `None` for in-memory databases
    pub fn path(&self) -> Option<&Path> {
        self.engine.path.as_deref()
    }

    /// Whether two handles share one engine
    pub fn same_engine(a: &Database, b: &Database) -> bool {
        Arc::ptr_eq(&a.engine, &b.engine)
    }

    /// Receive every table touched by a committed write
    pub fn subscribe_changes(&self) -> broadcast::Receiver<Table> {
        self.engine.changes.subscribe()
    }

    /// Run read-only DAO work on the calling thread
    ///
    /// For callers that are already off any UI or runtime thread. Writes made
    /// here are not published to subscribers; use the async methods instead.
    pub fn read_blocking<T>(
        &self,
        f: impl FnOnce(&Dao<'_>) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let conn = self.engine.lock()?;
        f(&Dao::new(&conn))
    }

    // ==================== Documents ====================

    pub async fn find_all_documents(&self) -> StorageResult<Vec<Document>> {
        self.read(|dao| dao.find_all_documents()).await
    }

    /// Get a document by id; a miss is `Ok(None)`
    pub async fn find_document_by_id(&self, document_id: i64) -> StorageResult<Option<Document>> {
        self.read(move |dao| dao.find_document_by_id(document_id))
            .await
    }

    /// Get a document by id; a miss is `StorageError::NotFound`
    pub async fn document(&self, document_id: i64) -> StorageResult<Document> {
        self.find_document_by_id(document_id)
            .await?
            .ok_or_else(|| StorageError::not_found("document", document_id))
    }

    pub async fn persist_document(&self, document: Document) -> StorageResult<i64> {
        self.write(&[Table::Document], move |dao| dao.persist_document(&document))
            .await
    }

    pub async fn update_document(&self, document: Document) -> StorageResult<usize> {
        self.write(&[Table::Document], move |dao| dao.update_document(&document))
            .await
    }

    pub async fn delete_document(&self, document: Document) -> StorageResult<usize> {
        self.write(Table::Document.cascades_to(), move |dao| {
            dao.delete_document(&document)
        })
        .await
    }

    // ==================== Tags ====================

    pub async fn find_all_tags(&self) -> StorageResult<Vec<Tag>> {
        self.read(|dao| dao.find_all_tags()).await
    }

    pub async fn find_tag_by_id(&self, tag_id: i64) -> StorageResult<Option<Tag>> {
        self.read(move |dao| dao.find_tag_by_id(tag_id)).await
    }

    /// Get a tag by id; a miss is `StorageError::NotFound`
    pub async fn tag(&self, tag_id: i64) -> StorageResult<Tag> {
        self.find_tag_by_id(tag_id)
            .await?
            .ok_or_else(|| StorageError::not_found("tag", tag_id))
    }

    pub async fn persist_tag(&self, tag: Tag) -> StorageResult<i64> {
        self.write(&[Table::Tag], move |dao| dao.persist_tag(&tag))
            .await
    }

    pub async fn update_tag(&self, tag: Tag) -> StorageResult<usize> {
        self.write(&[Table::Tag], move |dao| dao.update_tag(&tag))
            .await
    }

    pub async fn delete_tag(&self, tag: Tag) -> StorageResult<usize> {
        self.write(Table::Tag.cascades_to(), move |dao| dao.delete_tag(&tag))
            .await
    }

    // ==================== Images ====================

    pub async fn find_all_images(&self) -> StorageResult<Vec<Image>> {
        self.read(|dao| dao.find_all_images()).await
    }

    pub async fn find_image_by_id(&self, image_id: i64) -> StorageResult<Option<Image>> {
        self.read(move |dao| dao.find_image_by_id(image_id)).await
    }

    pub async fn persist_image(&self, image: Image) -> StorageResult<i64> {
        self.write(&[Table::Image], move |dao| dao.persist_image(&image))
            .await
    }

    pub async fn update_image(&self, image: Image) -> StorageResult<usize> {
        self.write(&[Table::Image], move |dao| dao.update_image(&image))
            .await
    }

    pub async fn delete_image(&self, image: Image) -> StorageResult<usize> {
        self.write(Table::Image.cascades_to(), move |dao| {
            dao.delete_image(&image)
        })
        .await
    }

    // ==================== Relations ====================

    pub async fn persist_document_tag(&self, document_id: i64, tag_id: i64) -> StorageResult<bool> {
        self.write(&[Table::DocumentTagRelation], move |dao| {
            dao.persist_document_tag(document_id, tag_id)
        })
        .await
    }

    pub async fn find_all_document_tag_relations(&self) -> StorageResult<Vec<DocumentTagRelation>> {
        self.read(|dao| dao.find_all_document_tag_relations())
            .await
    }

    pub async fn delete_document_tag_relation(
        &self,
        relation: DocumentTagRelation,
    ) -> StorageResult<usize> {
        self.write(&[Table::DocumentTagRelation], move |dao| {
            dao.delete_document_tag_relation(&relation)
        })
        .await
    }

    pub async fn persist_document_image(
        &self,
        document_id: i64,
        image_id: i64,
    ) -> StorageResult<bool> {
        self.write(&[Table::DocumentImageRelation], move |dao| {
            dao.persist_document_image(document_id, image_id)
        })
        .await
    }

    pub async fn find_all_document_image_relations(
        &self,
    ) -> StorageResult<Vec<DocumentImageRelation>> {
        self.read(|dao| dao.find_all_document_image_relations())
            .await
    }

    pub async fn delete_document_image_relation(
        &self,
        relation: DocumentImageRelation,
    ) -> StorageResult<usize> {
        self.write(&[Table::DocumentImageRelation], move |dao| {
            dao.delete_document_image_relation(&relation)
        })
        .await
    }

    // ==================== Joins ====================

    pub async fn tags_with_documents(&self) -> StorageResult<Vec<TagWithDocuments>> {
        self.read(|dao| dao.tags_with_documents()).await
    }

    pub async fn document_details(&self, document_id: i64) -> StorageResult<Option<DocumentDetails>> {
        self.read(move |dao| dao.document_details(document_id))
            .await
    }

    // ==================== Composite writes ====================

    /// Save a draft as one transaction; returns the new document id
    pub async fn save_document(&self, draft: DocumentDraft) -> StorageResult<i64> {
        let pages = draft.image_uris.len();
        let tags = draft.tag_ids.len();
        let document_id = self
            .write(SAVE_TABLES, move |dao| dao.save_document(&draft))
            .await?;
        info!(document_id, pages, tags, "saved document");
        Ok(document_id)
    }

    // ==================== Live queries ====================

    /// All documents, refreshed after every document change
    pub async fn observe_documents(&self) -> StorageResult<LiveQuery<Vec<Document>>> {
        self.observe(&[Table::Document], |dao| dao.find_all_documents())
            .await
    }

    /// All tags, refreshed after every tag change
    pub async fn observe_tags(&self) -> StorageResult<LiveQuery<Vec<Tag>>> {
        self.observe(&[Table::Tag], |dao| dao.find_all_tags())
            .await
    }

    pub async fn observe_tags_with_documents(
        &self,
    ) -> StorageResult<LiveQuery<Vec<TagWithDocuments>>> {
        self.observe(
            &[Table::Tag, Table::Document, Table::DocumentTagRelation],
            |dao| dao.tags_with_documents(),
        )
        .await
    }

    /// Follow `query`, re-running it after each committed change to `tables`
    ///
    /// The first result is ready when this returns. Must be called from
    /// within a tokio runtime; the refresh task ends when every clone of the
    /// returned `LiveQuery` is dropped.
    pub async fn observe<T, Q>(
        &self,
        tables: &'static [Table],
        query: Q,
    ) -> StorageResult<LiveQuery<T>>
    where
        T: Clone + Send + Sync + 'static,
        Q: Fn(&Dao<'_>) -> StorageResult<T> + Send + Sync + 'static,
    {
        // Subscribe first so no change between the initial read and the
        // refresh loop is missed
        let mut changes = self.engine.changes.subscribe();
        let query = Arc::new(query);

        let initial = {
            let query = Arc::clone(&query);
            self.read(move |dao| (*query)(dao)).await?
        };
        let (tx, rx) = watch::channel(initial);

        let db = self.clone();
        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = tx.closed() => break,
                    event = changes.recv() => event,
                };

                match event {
                    Ok(table) if !tables.contains(&table) => continue,
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break,
                }

                // One refresh covers everything already queued
                loop {
                    match changes.try_recv() {
                        Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                        Err(_) => break,
                    }
                }

                let query = Arc::clone(&query);
                match db.read(move |dao| (*query)(dao)).await {
                    Ok(value) => {
                        if tx.send(value).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "live query refresh failed"),
                }
            }
        });

        Ok(LiveQuery::new(rx))
    }

    // ==================== Private helpers ====================

    async fn read<T, F>(&self, f: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Dao<'_>) -> StorageResult<T> + Send + 'static,
    {
        self.run(&[], f).await
    }

    /// Run a write and announce `tables` once it has committed
    async fn write<T, F>(&self, tables: &'static [Table], f: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Dao<'_>) -> StorageResult<T> + Send + 'static,
    {
        self.run(tables, f).await
    }

    /// Run `f` on the blocking pool, then publish `tables` if it succeeded
    ///
    /// Publishing happens on the worker, so a caller that stops awaiting
    /// still gets its committed write announced.
    async fn run<T, F>(&self, tables: &'static [Table], f: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Dao<'_>) -> StorageResult<T> + Send + 'static,
    {
        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || {
            let value = {
                let conn = engine.lock()?;
                f(&Dao::new(&conn))?
            };
            engine.changes.publish(tables);
            Ok(value)
        })
        .await?
    }
}

/// Canonical form of a database path, used to find an open engine
fn registry_key(path: &Path) -> PathBuf {
    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        return path.to_path_buf();
    };
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };

    fs::canonicalize(parent)
        .map(|dir| dir.join(name))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Keeps the connection locked from another thread until released
#[cfg(test)]
pub(crate) struct HeldLock {
    release: std::sync::mpsc::Sender<()>,
    holder: std::thread::JoinHandle<()>,
}

#[cfg(test)]
impl HeldLock {
    pub(crate) fn new(db: &Database) -> Self {
        let (locked_tx, locked_rx) = std::sync::mpsc::channel();
        let (release, release_rx) = std::sync::mpsc::channel::<()>();
        let db = db.clone();
        let holder = std::thread::spawn(move || {
            db.read_blocking(|_| {
                locked_tx.send(()).unwrap();
                let _ = release_rx.recv();
                Ok(())
            })
            .unwrap();
        });
        locked_rx.recv().unwrap();
        Self { release, holder }
    }

    pub(crate) fn release(self) {
        let _ = self.release.send(());
        self.holder.join().unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir) -> Config {
        Config {
            data_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_persist_then_fetch() {
        let db = Database::open_in_memory().unwrap();

        let id = db
            .persist_document(Document::new(Some("Passport".to_string())))
            .await
            .unwrap();

        let fetched = db.document(id).await.unwrap();
        assert_eq!(fetched, Document::with_id(id, Some("Passport".to_string())));
    }

    #[tokio::test]
    async fn test_missing_document() {
        let db = Database::open_in_memory().unwrap();

        assert!(db.find_document_by_id(1).await.unwrap().is_none());
        let err = db.document(1).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::NotFound {
                entity: "document",
                id: 1
            }
        ));
    }

    #[tokio::test]
    async fn test_open_creates_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let db = Database::open(&config).unwrap();

        assert!(config.database_path().exists());
        assert!(db.path().unwrap().ends_with("document_database"));
    }

    #[test]
    fn test_open_creates_missing_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("deeper").join("docs.db");

        Database::open_path(&path).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_data_dir_blocked_by_file() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("data");
        fs::write(&blocker, b"not a directory").unwrap();

        let err = Database::open_path(blocker.join("document_database")).unwrap_err();

        assert!(matches!(err, StorageError::CreateDirectory { .. }));
        assert!(err.recovery_suggestion().is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_unwritable_data_dir_is_permission_denied() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let locked = temp_dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

        // Privileged users bypass directory permissions
        let writable = fs::create_dir(locked.join("check")).is_ok();
        let result = Database::open_path(locked.join("data").join("document_database"));
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        if writable {
            return;
        }

        let err = result.unwrap_err();
        assert!(matches!(err, StorageError::PermissionDenied { .. }));
        assert!(err.is_recoverable());
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_same_file_shares_engine() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("shared.db");

        let a = Database::open_path(&path).unwrap();
        let b = Database::open_path(temp_dir.path().join(".").join("shared.db")).unwrap();
        let other = Database::open_path(temp_dir.path().join("other.db")).unwrap();

        assert!(Database::same_engine(&a, &b));
        assert!(!Database::same_engine(&a, &other));
    }

    #[test]
    fn test_concurrent_first_open_yields_one_engine() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("race.db");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let path = path.clone();
                thread::spawn(move || Database::open_path(path).unwrap())
            })
            .collect();
        let dbs: Vec<Database> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        for db in &dbs[1..] {
            assert!(Database::same_engine(&dbs[0], db));
        }
    }

    #[test]
    fn test_in_memory_databases_are_private() {
        let a = Database::open_in_memory().unwrap();
        let b = Database::open_in_memory().unwrap();

        assert!(!Database::same_engine(&a, &b));
        assert!(a.path().is_none());
    }

    #[tokio::test]
    async fn test_data_persists_across_reopens() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let id = {
            let db = Database::open(&config).unwrap();
            db.persist_document(Document::new(Some("Kept".to_string())))
                .await
                .unwrap()
        };

        let db = Database::open(&config).unwrap();
        let doc = db.document(id).await.unwrap();
        assert_eq!(doc.title.as_deref(), Some("Kept"));
    }

    #[tokio::test]
    async fn test_relation_persisted_twice_leaves_one_row() {
        let db = Database::open_in_memory().unwrap();
        let doc = db.persist_document(Document::default()).await.unwrap();
        let tag = db.persist_tag(Tag::new("once")).await.unwrap();

        assert!(db.persist_document_tag(doc, tag).await.unwrap());
        assert!(!db.persist_document_tag(doc, tag).await.unwrap());

        assert_eq!(db.find_all_document_tag_relations().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_tag_removes_relations() {
        let db = Database::open_in_memory().unwrap();
        let doc = db.persist_document(Document::default()).await.unwrap();
        let tag_id = db.persist_tag(Tag::new("gone")).await.unwrap();
        db.persist_document_tag(doc, tag_id).await.unwrap();

        let tag = db.tag(tag_id).await.unwrap();
        assert_eq!(db.delete_tag(tag).await.unwrap(), 1);

        assert!(db.find_all_document_tag_relations().await.unwrap().is_empty());
        assert!(db.find_document_by_id(doc).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_save_document_publishes_changes() {
        let db = Database::open_in_memory().unwrap();
        let mut changes = db.subscribe_changes();

        let mut draft = DocumentDraft::new(Some("Notes".to_string()));
        draft.add_image("file:///n/0.jpg");
        db.save_document(draft).await.unwrap();

        let mut seen = Vec::new();
        while let Ok(table) = changes.try_recv() {
            seen.push(table);
        }
        assert_eq!(seen, SAVE_TABLES.to_vec());
    }

    #[tokio::test]
    async fn test_failed_write_publishes_nothing() {
        let db = Database::open_in_memory().unwrap();
        let mut changes = db.subscribe_changes();

        let mut draft = DocumentDraft::new(None);
        draft.add_tag(77);
        assert!(db.save_document(draft).await.is_err());

        assert!(changes.try_recv().is_err());
        assert!(db.find_all_documents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_observe_documents_follows_writes() {
        let db = Database::open_in_memory().unwrap();
        let mut live = db.observe_documents().await.unwrap();
        assert!(live.current().is_empty());

        let id = db
            .persist_document(Document::new(Some("First".to_string())))
            .await
            .unwrap();

        assert!(live.changed().await);
        assert_eq!(
            live.current_and_mark_seen(),
            vec![Document::with_id(id, Some("First".to_string()))]
        );

        db.delete_document(Document::with_id(id, None))
            .await
            .unwrap();
        assert!(live.changed().await);
        assert!(live.current_and_mark_seen().is_empty());
    }

    #[tokio::test]
    async fn test_observe_tags_with_documents_follows_links() {
        let db = Database::open_in_memory().unwrap();
        let tag = db.persist_tag(Tag::new("watched")).await.unwrap();
        let doc = db.persist_document(Document::default()).await.unwrap();

        let mut live = db.observe_tags_with_documents().await.unwrap();
        assert!(live.current()[0].documents.is_empty());

        db.persist_document_tag(doc, tag).await.unwrap();

        assert!(live.changed().await);
        let current = live.current_and_mark_seen();
        assert_eq!(current[0].documents, vec![Document::with_id(doc, None)]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_tags_with_documents_is_a_snapshot() {
        let db = Database::open_in_memory().unwrap();
        let tag = db.persist_tag(Tag::new("T")).await.unwrap();
        let d1 = db.persist_document(Document::default()).await.unwrap();
        let d2 = db.persist_document(Document::default()).await.unwrap();
        db.persist_document_tag(d1, tag).await.unwrap();
        db.persist_document_tag(d2, tag).await.unwrap();

        let writer = {
            let db = db.clone();
            tokio::spawn(async move {
                for i in 0..50 {
                    let mut draft = DocumentDraft::new(Some(format!("noise {}", i)));
                    draft.add_image(format!("file:///noise/{}.jpg", i));
                    db.save_document(draft).await.unwrap();
                    db.persist_tag(Tag::new(format!("other {}", i)))
                        .await
                        .unwrap();
                }
            })
        };

        for _ in 0..50 {
            let result = db.tags_with_documents().await.unwrap();
            let entry = result
                .iter()
                .find(|entry| entry.tag.tag_id == Some(tag))
                .unwrap();
            let ids: Vec<_> = entry.documents.iter().map(|d| d.document_id).collect();
            assert_eq!(ids, vec![Some(d1), Some(d2)]);
        }

        writer.await.unwrap();
    }

    #[test]
    fn test_read_blocking() {
        let db = Database::open_in_memory().unwrap();
        let count = db.read_blocking(|dao| dao.document_count()).unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_abandoned_write_still_reaches_live_queries() {
        let db = Database::open_in_memory().unwrap();
        let mut live = db.observe_documents().await.unwrap();
        let held = HeldLock::new(&db);

        let write = db.persist_document(Document::new(Some("Receipt".to_string())));
        let abandoned = tokio::time::timeout(Duration::from_millis(50), write).await;
        assert!(abandoned.is_err());

        held.release();

        let refreshed = tokio::time::timeout(Duration::from_secs(5), live.changed())
            .await
            .unwrap();
        assert!(refreshed);
        assert_eq!(live.current().len(), 1);
        assert_eq!(db.find_all_documents().await.unwrap().len(), 1);
    }
}
