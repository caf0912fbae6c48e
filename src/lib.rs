pub mod config;
pub mod console;
pub mod environment;
pub mod executor;
pub mod host;
pub mod output_file;
pub mod runner;
pub mod session;
pub mod stream;
pub mod substitute;
pub mod utils;
