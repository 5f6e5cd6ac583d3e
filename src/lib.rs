pub mod api;
pub mod domain;
pub mod models;
pub mod platform;
pub mod repositories;
pub mod routes;
pub mod schema;
pub mod services;
pub mod storage;
