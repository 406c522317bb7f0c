pub mod error;
pub mod infrastructure;
pub mod outcome;
pub mod progress_sink;
pub mod request;
pub mod run_workspace;
pub mod stage;
pub mod stage_runner;
pub mod state;
pub mod transcribe_pipeline;
