pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod issuance;
pub mod ledger;
pub mod models;
pub mod repos;
#[cfg(feature = "sqlite")]
pub mod schema;
pub mod security;
pub mod web;
