pub mod conversation;
pub mod dispatch;
pub mod events;
pub mod loop_;
pub mod registry;

pub use conversation::Conversation;
pub use dispatch::dispatch;
pub use events::{AgentObserver, NoopObserver};
pub use loop_::{AgentLoop, LoopState};
pub use registry::ToolRegistry;
