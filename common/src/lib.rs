//! Angle-of-view Review Common Library
//!
//! 管理コンソールと請負業者アプリで共有される型とユーティリティ

pub mod types;
pub mod error;
pub mod messages;
pub mod validation;
pub mod status;

pub use types::{
    Account, ConnectionState, Device, DeviceProgressStatus, DeviceType, Envelope, ListEnvelope,
    ProgressReport, Review, ReviewResult,
};
pub use error::{Error, Result};
pub use messages::{error_message, text, ErrorCode, Locale, Surface, TextKey};
pub use validation::{ensure_present, string_difference, validate_string, ValidationKind};
pub use status::{contrast_color, status_to_string, StatusFilter};
