//! Chat command - interactive conversation in the terminal

use clap::Args;
use confer_core::{AppContext, Config, Orchestrator};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Talk to the supervisor line by line
#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Conversation thread to use (overrides config)
    #[arg(short, long)]
    thread_id: Option<String>,
}

impl ChatArgs {
    /// Execute the chat command
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let thread_id = self
            .thread_id
            .clone()
            .unwrap_or_else(|| config.chat.thread_id.clone());

        let context = AppContext::bootstrap(config).await?;
        let orchestrator = context.orchestrator();

        let stdin = BufReader::new(tokio::io::stdin());
        let mut stdout = tokio::io::stdout();
        chat_loop(&orchestrator, &thread_id, stdin, &mut stdout).await
    }
}

fn is_exit(line: &str) -> bool {
    line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit")
}

/// Read lines from `input` and answer each one on `thread_id`
///
/// Blank lines are skipped; `exit`, `quit` or end of input stop the loop.
/// A failed turn is reported and the loop keeps going.
pub async fn chat_loop<R, W>(
    orchestrator: &Orchestrator,
    thread_id: &str,
    input: R,
    output: &mut W,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    loop {
        output.write_all(b"User: ").await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            output.write_all(b"\n").await?;
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if is_exit(line) {
            break;
        }

        let reply = match orchestrator.chat(thread_id, line).await {
            Ok(answer) => format!("Assistant: {}\n", answer),
            Err(e) => {
                tracing::error!(thread_id, error = %e, "Chat turn failed");
                format!("Error: {}\n", e)
            }
        };
        output.write_all(reply.as_bytes()).await?;
    }

    output.write_all(b"Goodbye.\n").await?;
    output.flush().await?;
    Ok(())
}
