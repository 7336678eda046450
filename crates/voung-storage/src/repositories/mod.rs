pub mod memory;
pub mod sqlite;

pub use memory::InMemoryBoardStore;
pub use sqlite::SqliteBoardStore;
