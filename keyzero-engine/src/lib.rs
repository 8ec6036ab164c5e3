pub mod constants;
pub mod derive;
pub mod keyspace;
pub mod known;
pub mod match_handler;
pub mod metrics;
pub mod oracle;
pub mod progress;
pub mod scanner;
