pub mod config;
pub mod oauth_flow;
pub mod runtime;
pub mod storage;
pub mod sync;
pub mod token_provider;
