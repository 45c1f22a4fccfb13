pub mod orchestrator;


pub use orchestrator::{all_topics, Collaborators, Dispatch, Orchestrator, PipelineConfig, RunOutcome};
