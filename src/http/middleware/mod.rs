pub mod error_pages;
pub mod login;
pub mod page_cache;
