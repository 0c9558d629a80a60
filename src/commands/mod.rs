pub mod admin;
pub mod auth;
pub mod menu;
pub mod orders;
pub mod settings;
pub mod wizard;
