pub mod dispatcher;
pub mod locks;
pub mod orchestrator;
