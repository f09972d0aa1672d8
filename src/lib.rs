pub mod features;
pub mod learn;
pub mod loader;
pub mod output;
pub mod recommend;
pub mod service;
pub mod store;
pub mod types;
pub mod weather;
