pub mod repository;

pub use repository::{HistoryRepository, ListQuery, ListResult, PgHistoryRepository, SortBy, SortDir};
