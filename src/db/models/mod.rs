//! Database models split into domain-specific modules.

pub mod approval;
pub mod audit;
pub mod expense;
pub mod user;

pub use approval::*;
pub use audit::*;
pub use expense::*;
pub use user::*;
