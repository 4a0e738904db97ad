mod store;
mod task;

pub use store::TranscriptStore;
pub use task::Task;
