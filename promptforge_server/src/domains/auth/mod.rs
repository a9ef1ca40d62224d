pub mod password;
pub mod repository;
pub mod service;

pub use repository::{PgSessionRepository, PgUserRepository, SessionRepository, UserRepository};
