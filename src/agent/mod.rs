mod agent;
mod allocator;
mod orchestrator;
mod prompt;
mod runner;

pub use agent::{Agent, AgentState, Transition};
pub use allocator::TaskAllocator;
pub use orchestrator::{MatchPolicy, PoolConfig};
pub use runner::{ExecutionCoordinator, ExecutionReport};
