pub mod commit;
pub mod journal;
pub mod schema;
pub mod table;
pub mod value;

pub use commit::{CommitId, CommitRecord, Reference};
pub use journal::{JournalEntry, JournalFilter, OpKind};
pub use schema::{ColumnDef, TableSchema};
pub use table::{RowKey, Table};
pub use value::{ColumnType, Value};
