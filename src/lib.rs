pub mod board;
pub mod cli;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod notify;
pub mod ordering;
pub mod queue;
pub mod server;
pub mod timer;
