#![forbid(unsafe_code)]
//! Domain model for the BarberBoard checklist service: category schemas,
//! payload validation, derived-field math and directory records.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fmt::{Display, Formatter};

mod branch;
mod category;
mod math;
mod month;
mod payload;

pub use branch::{
    BranchName, BranchRecord, BranchStatus, BRANCH_NAME_MAX_LEN, DIRECTORY_HEADERS,
    DIRECTORY_SHEET_COLS, DIRECTORY_SHEET_NAME, DIRECTORY_SHEET_ROWS, SPREADSHEET_ID_COLUMN,
};
pub use category::{
    Category, CategorySchema, CellValue, SHEET_COLS, SHEET_ROWS, SUMMARY_HEADERS,
    SUMMARY_SHEET_NAME,
};
pub use math::{overall_score, plan_fact_pct, round1};
pub use month::{cell_month_label, current_month_label, month_label, now_timestamp, MONTHS_RU};
pub use payload::{
    FieldVisit, MasterPlan, MorningEvent, NewbieAdaptation, OneOnOneMeeting, Review, WeeklyMetrics,
};

pub const CRATE_NAME: &str = "barberboard-model";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ValidationError {}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Password hash stored in the directory sheet: lowercase hex sha-256.
pub fn hash_password(password: &str) -> String {
    sha256_hex(password.as_bytes())
}

/// Url-safe branch auth token from 32 bytes of OS entropy.
pub fn generate_token() -> String {
    let mut bytes = [0_u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_is_lowercase_hex_sha256() {
        let hash = hash_password("secret");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(hash, hash_password("secret"));
        assert_ne!(hash, hash_password("Secret"));
    }

    #[test]
    fn generated_tokens_are_url_safe_and_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
