pub mod access;
pub mod model;
pub mod snowflake;
pub mod upload;
pub mod util;
pub mod visibility;
