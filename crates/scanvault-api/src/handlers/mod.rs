pub mod scans;
pub mod stats;
pub mod users;
