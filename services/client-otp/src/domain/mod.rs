//! 领域层

pub mod client;
pub mod clock;
pub mod otp_policy;
pub mod otp_record;
pub mod repositories;
pub mod services;

pub use client::{Cedula, CedulaError, ClientContact};
pub use clock::{Clock, ManualClock, SystemClock};
pub use otp_policy::{OtpPolicy, OtpPrecedence};
pub use otp_record::{OtpCode, OtpRecord, OtpRecordId, OtpState};
