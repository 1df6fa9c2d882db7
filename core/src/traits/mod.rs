pub mod input;
pub mod provider;
pub mod tool;

pub use input::{InputSource, ScriptedInput};
pub use provider::Provider;
pub use tool::{Tool, ToolSpec};
