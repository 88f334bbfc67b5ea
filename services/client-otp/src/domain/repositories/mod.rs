//! 仓储接口

mod client_directory;
mod otp_record_repository;

pub use client_directory::ClientDirectory;
pub use otp_record_repository::OtpRecordRepository;
