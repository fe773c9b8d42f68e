pub mod beacon_queue;
pub mod config;
pub mod http_source;
pub mod logging;
pub mod system_clock;
