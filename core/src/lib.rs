pub mod agent;
pub mod config;
pub mod error;
pub mod message;
pub mod providers;
pub mod schema;
pub mod tools;
pub mod traits;

pub use agent::{AgentLoop, AgentObserver, Conversation, LoopState, ToolRegistry};
pub use config::*;
pub use error::*;
pub use message::*;
pub use providers::*;
pub use schema::generate_schema;
pub use tools::*;
pub use traits::*;
