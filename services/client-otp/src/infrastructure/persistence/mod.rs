//! 持久化实现

mod memory;
mod migrations;
mod postgres_client_directory;
mod postgres_otp_record_repository;

pub use memory::{InMemoryClientDirectory, InMemoryOtpRecordRepository};
pub use migrations::{MIGRATIONS, run_migrations};
pub use postgres_client_directory::PostgresClientDirectory;
pub use postgres_otp_record_repository::PostgresOtpRecordRepository;
