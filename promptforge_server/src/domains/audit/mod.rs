pub mod repository;

pub use repository::PgApiUsageRepository;
