pub mod ai;
pub mod analytics;
pub mod community;
pub mod companies;
pub mod health;
pub mod records;
pub mod resume_base;
pub mod users;
