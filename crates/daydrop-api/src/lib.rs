pub mod drops;
pub mod error;
pub mod follows;
pub mod groups;
pub mod middleware;
pub mod reports;
pub mod router;
pub mod state;
