pub mod cli;
pub mod config;
pub mod error;
pub mod nvpmodel;
pub mod output;
pub mod resolve;
pub mod script;
pub mod selector;
pub mod sysfs;
