//! Table-level change notifications.
//!
//! Every committed write transaction publishes one [`TableSet`] naming the
//! tables it touched. Live queries declare the tables they read and re-run
//! whenever a published set intersects theirs.

use std::fmt;

/// Tables that writers can report as changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Manga,
    Tags,
    MangaTags,
    Bookmarks,
}

impl Table {
    pub const ALL: [Table; 4] = [Table::Manga, Table::Tags, Table::MangaTags, Table::Bookmarks];

    fn bit(self) -> u8 {
        match self {
            Table::Manga => 1,
            Table::Tags => 1 << 1,
            Table::MangaTags => 1 << 2,
            Table::Bookmarks => 1 << 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Table::Manga => "manga",
            Table::Tags => "tags",
            Table::MangaTags => "manga_tags",
            Table::Bookmarks => "bookmarks",
        }
    }
}

/// A set of [`Table`]s, cheap to copy through a broadcast channel.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct TableSet(u8);

impl TableSet {
    pub const EMPTY: TableSet = TableSet(0);

    pub fn of(tables: &[Table]) -> Self {
        Self(tables.iter().fold(0, |acc, t| acc | t.bit()))
    }

    pub fn contains(&self, table: Table) -> bool {
        self.0 & table.bit() != 0
    }

    pub fn intersects(&self, other: TableSet) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Table> + '_ {
        Table::ALL.into_iter().filter(move |t| self.contains(*t))
    }
}

impl fmt::Debug for TableSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(Table::name)).finish()
    }
}
