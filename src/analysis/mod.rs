pub mod angles;
pub mod compatibility;
