pub mod auth;
pub mod boot;
pub mod config;
pub mod database;
pub mod filter;
pub mod mq;

#[cfg(test)]
pub mod testing;
