pub mod classify;
pub mod diff;
pub mod file;
pub mod layout;
pub mod map;
pub mod report;
pub mod summary;
pub mod table;
