pub mod live;
pub mod metrics;
pub mod round_log;
pub mod static_hops;
