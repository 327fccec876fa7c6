pub mod profile;
pub mod redeem;
pub mod reset;
pub mod seed;
pub mod stats;
