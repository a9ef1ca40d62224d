pub mod audit;
pub mod auth;
pub mod cache;
pub mod history;
pub mod orchestration;
pub mod rate_limit;
