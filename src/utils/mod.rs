pub mod html;
pub mod jwt;
pub mod preview_cache;
pub mod rate_limit;
