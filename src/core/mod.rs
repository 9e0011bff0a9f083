pub mod config;
pub mod coordinator;
pub mod discovery;
pub mod emit;
pub mod error;
pub mod log_io;
pub mod model;
pub mod names;
pub mod parser;
pub mod pets;
pub mod players;
pub mod replay;
pub mod report;
pub mod session;
pub mod spells;
pub mod target;
pub mod timestamp;
pub mod tracker;
pub mod watcher;
