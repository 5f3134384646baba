pub mod job;
pub mod row;
pub mod submission;
