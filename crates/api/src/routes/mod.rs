pub mod auth;
pub mod claims;
pub mod conversations;
pub mod health;
pub mod items;
pub mod models;
pub mod notifications;
pub mod organizations;
pub mod users;
pub mod verification;
