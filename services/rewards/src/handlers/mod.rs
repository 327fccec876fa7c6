pub mod admin;
pub mod health;
pub mod scan;
pub mod user;
