//! Data models for the Trade Union membership system.

mod dashboard;
mod member;
mod renewal;

pub use dashboard::*;
pub use member::*;
pub use renewal::*;
