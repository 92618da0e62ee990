#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{CardStore, CardWithSkills, InMemoryCardStore, StorageError, copy_cards};
pub use sqlite::{SqliteInitError, SqliteRepository};
