//! Change notification and live queries
//!
//! After each committed write the database publishes the tables it touched
//! on a broadcast channel. A [`LiveQuery`] subscribes to that channel and
//! re-runs its query whenever one of its tables changes, so consumers see
//! fresh results without polling.

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};

/// Tables that can change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Table {
    Document,
    Tag,
    Image,
    DocumentTagRelation,
    DocumentImageRelation,
}

impl Table {
    /// SQL table name
    pub fn name(self) -> &'static str {
        match self {
            Table::Document => "document",
            Table::Tag => "tag",
            Table::Image => "image",
            Table::DocumentTagRelation => "documentTagRelation",
            Table::DocumentImageRelation => "documentImageRelation",
        }
    }

    /// Tables whose rows disappear with a delete from this one
    pub fn cascades_to(self) -> &'static [Table] {
        match self {
            Table::Document => &[
                Table::Document,
                Table::DocumentTagRelation,
                Table::DocumentImageRelation,
            ],
            Table::Tag => &[Table::Tag, Table::DocumentTagRelation],
            Table::Image => &[Table::Image, Table::DocumentImageRelation],
            Table::DocumentTagRelation => &[Table::DocumentTagRelation],
            Table::DocumentImageRelation => &[Table::DocumentImageRelation],
        }
    }
}

/// Everything a document save writes to
pub(crate) const SAVE_TABLES: &[Table] = &[
    Table::Document,
    Table::DocumentTagRelation,
    Table::Image,
    Table::DocumentImageRelation,
];

/// Capacity of the change channel; slow subscribers skip to a re-query
const CHANGE_CAPACITY: usize = 64;

/// Publisher side of table change events
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<Table>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANGE_CAPACITY);
        Self { tx }
    }

    /// Announce committed changes to `tables`
    pub fn publish(&self, tables: &[Table]) {
        for &table in tables {
            // No subscribers is not an error
            let _ = self.tx.send(table);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Table> {
        self.tx.subscribe()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

/// A query result that follows the database
///
/// Cloning shares the same underlying subscription. The refresh task stops
/// once every clone has been dropped.
#[derive(Debug, Clone)]
pub struct LiveQuery<T> {
    rx: watch::Receiver<T>,
}

impl<T: Clone> LiveQuery<T> {
    pub(crate) fn new(rx: watch::Receiver<T>) -> Self {
        Self { rx }
    }

    /// Latest result
    pub fn current(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Latest result, marking it as seen
    pub fn current_and_mark_seen(&mut self) -> T {
        self.rx.borrow_and_update().clone()
    }

    /// Wait for a result newer than the last one seen
    ///
    /// Returns `false` once the database side has gone away.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}
