//! Migrations embedded at compile time

pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}

/// All embedded migrations in order
pub fn get_migrations() -> Vec<Migration> {
    vec![
        Migration {
            id: "001_commit_graph",
            sql: include_str!("../../migrations/001_commit_graph.sql"),
        },
        Migration {
            id: "002_refs",
            sql: include_str!("../../migrations/002_refs.sql"),
        },
    ]
}
