pub mod config;
pub mod pose;
pub mod prayer;
pub mod recording;
pub mod tracker;
