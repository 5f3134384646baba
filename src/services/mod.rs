pub mod artifact_store;
pub mod fetcher;
pub mod job_store;
pub mod notifier;
pub mod orchestrator;
pub mod queue;
pub mod result_table;
pub mod row_processor;
pub mod transcoder;
