pub mod board;
pub mod reader;
pub mod viewport;
pub mod windows;
