pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod factory;
pub mod login;
pub mod session_store;
