pub mod cli;
pub mod config;
pub mod logging;
pub mod models;
pub mod navigation;
pub mod normalize;
pub mod position;
pub mod restore;
pub mod segment;
pub mod settings;
pub mod source;
pub mod state;
pub mod surface;
pub mod tracker;
pub mod ui;
