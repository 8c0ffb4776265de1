pub mod activity;
pub mod power;
pub mod profile;
pub mod serde_fmt;
