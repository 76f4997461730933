#![forbid(unsafe_code)]

pub mod dto;
pub mod errors;

pub use dto::{
    BranchProfile, BranchSummaryRequest, CacheStatsResponse, DashboardOverrides, HealthResponse,
    LoginRequest, LoginResponse, MessageResponse, RecordsResponse, RegisterRequest, SummaryCard,
};
pub use errors::{ApiError, ApiErrorCode};

pub const CRATE_NAME: &str = "barberboard-api";
