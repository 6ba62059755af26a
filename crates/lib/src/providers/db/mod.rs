#[cfg(feature = "sql")]
pub mod sqlite;
pub mod storage;
pub mod tabular;
