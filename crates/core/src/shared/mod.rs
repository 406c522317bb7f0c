pub mod cancellation;
pub mod child_process;
pub mod collaborator_error;
pub mod constants;
pub mod interval;
pub mod model_resolver;
pub mod stage_control;
