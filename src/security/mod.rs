pub mod ban_cache;
pub mod password;
pub mod rate_limit;
pub mod ssh_registration;

pub use ban_cache::BanCache;
pub use rate_limit::RateLimitManager;
