//! Score Portal
//!
//! Internal web application over a scored-records dataset:
//! - `config`: environment configuration (signing secret is required)
//! - `data`: spreadsheet export -> normalized in-memory table at startup
//! - `score`: derived composite Final Score per record
//! - `query`: identifier lookup and multi-predicate filtering with a
//!   stable descending sort by Final Score
//! - `auth`: role-gated user directory and credential verification
//! - `session`: signed-cookie sessions
//! - `server`: axum router and HTML views

pub mod auth;
pub mod config;
pub mod data;
pub mod query;
pub mod score;
pub mod server;
pub mod session;

// Re-export commonly used types
pub use auth::{AccountType, AuthError, MemoryUserRepo, User, UserRepository};
pub use config::Config;
pub use data::{load_dataset, Dataset, DatasetState, LoadError, ScoreRecord};
pub use query::{filter_records, lookup, FilterForm, ScoreFilters, ValidationError};
pub use score::{compute_score, ScoreInputs};
pub use server::{create_router, AppError, AppState};
pub use session::{Session, SessionCodec};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
