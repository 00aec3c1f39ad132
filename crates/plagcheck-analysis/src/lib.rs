pub mod batch;
pub mod clients;
pub mod config;
pub mod detection;
pub mod handlers;
pub mod models;
pub mod repo;
pub mod routes;
pub mod worker;
