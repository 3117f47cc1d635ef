pub mod ingest;
pub mod init;
pub mod source;
pub mod process;
pub mod model;
pub mod settings;
pub mod stats;
pub mod daemon;
