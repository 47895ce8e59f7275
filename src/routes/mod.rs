pub mod health;
pub mod logs;
pub mod oauth;
pub mod orders;
pub mod settings;
pub mod stores;
pub mod webhook;
