pub mod diff;
pub mod report;
pub mod sections;
pub mod summary;
