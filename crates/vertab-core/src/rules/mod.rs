pub mod identifiers;
pub mod validation;

pub use identifiers::{validate_branch_name, validate_identifier, validate_journal_table};
pub use validation::validate_table;
