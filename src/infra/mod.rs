pub mod cache;
pub mod db;
pub mod memory;
pub mod pg;
pub mod storage;
