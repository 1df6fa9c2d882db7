use anyhow::Context;
use async_trait::async_trait;
use relay_core::InputSource;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::sync::mpsc;
use tokio::sync::mpsc as async_mpsc;

/// Reads lines with rustyline on its own thread so the terminal editor never
/// blocks the runtime. Ctrl-D and Ctrl-C both end the conversation.
pub struct ReadlineInput {
    requests: mpsc::Sender<()>,
    lines: async_mpsc::Receiver<anyhow::Result<Option<String>>>,
}

impl ReadlineInput {
    pub fn spawn(prompt: String) -> Self {
        let (requests, request_rx) = mpsc::channel::<()>();
        let (line_tx, lines) = async_mpsc::channel(1);

        std::thread::spawn(move || {
            let mut editor = match DefaultEditor::new() {
                Ok(editor) => editor,
                Err(e) => {
                    if request_rx.recv().is_ok() {
                        let _ = line_tx.blocking_send(Err(e).context("Failed to open terminal"));
                    }
                    return;
                }
            };

            while request_rx.recv().is_ok() {
                let outcome = match editor.readline(&prompt) {
                    Ok(line) => {
                        let _ = editor.add_history_entry(line.as_str());
                        Ok(Some(line))
                    }
                    Err(ReadlineError::Eof | ReadlineError::Interrupted) => Ok(None),
                    Err(e) => Err(e).context("Failed to read line"),
                };
                let done = !matches!(outcome, Ok(Some(_)));
                if line_tx.blocking_send(outcome).is_err() || done {
                    break;
                }
            }
        });

        Self { requests, lines }
    }
}

#[async_trait]
impl InputSource for ReadlineInput {
    async fn next_line(&mut self) -> anyhow::Result<Option<String>> {
        if self.requests.send(()).is_err() {
            return Ok(None);
        }
        match self.lines.recv().await {
            Some(outcome) => outcome,
            None => Ok(None),
        }
    }
}
