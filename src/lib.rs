pub mod app;
pub mod audit;
pub mod checkout;
pub mod config;
pub mod db;
pub mod dto;
pub mod entity;
pub mod error;
pub mod mailer;
pub mod middleware;
pub mod models;
pub mod payments;
pub mod policy;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;
pub mod token;
