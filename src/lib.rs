//! Personal health-record API: accounts, lab results, attached documents and
//! trend summaries.

pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod documents;
pub mod error;
pub mod field;
pub mod lab_results;
pub mod memory;
pub mod response;
pub mod state;
pub mod storage;
pub mod trends;
pub mod users;
