pub mod bulk;
pub mod health;
