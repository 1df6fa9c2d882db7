use async_trait::async_trait;

/// Line-oriented source of human input.
#[async_trait]
pub trait InputSource: Send {
    /// `Ok(None)` means the source is exhausted and the conversation is over.
    async fn next_line(&mut self) -> anyhow::Result<Option<String>>;
}

/// Replays a fixed list of lines, then reports end-of-stream.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    lines: std::collections::VecDeque<String>,
    reads: usize,
}

impl ScriptedInput {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            reads: 0,
        }
    }

    /// How many times `next_line` has been called, including the final
    /// end-of-stream read.
    pub fn reads(&self) -> usize {
        self.reads
    }
}

#[async_trait]
impl InputSource for ScriptedInput {
    async fn next_line(&mut self) -> anyhow::Result<Option<String>> {
        self.reads += 1;
        Ok(self.lines.pop_front())
    }
}
