pub mod config;
pub mod document;
pub mod publish;
pub mod schedule;
pub mod sink;
pub mod source;
pub mod status;

pub use config::Config;
pub use schedule::Scheduler;
pub use status::StatusSnapshot;
