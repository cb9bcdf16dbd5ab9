// Library for tests to access modules

pub mod alerts;
pub mod collector;
pub mod config;
pub mod growth;
pub mod history_repo;
pub mod models;
pub mod monitor;
pub mod routes;
pub mod scheduler;
pub mod whitelist;
