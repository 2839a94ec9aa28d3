//! Interactive chat loop.
//!
//! Reads one line per turn and writes only the final text of each turn.
//! Generic over the reader and writer so it runs against stdin/stdout in
//! the binary and against in-memory buffers in tests.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::agent::TurnRunner;

/// Printed once when the loop starts.
pub const BANNER: &str = "Start chatting (type 'exit' to quit):";
/// Printed before each input line.
pub const PROMPT: &str = "You: ";
/// Printed when the user exits.
pub const GOODBYE: &str = "Goodbye!";
/// Prefix of every response line.
pub const AGENT_PREFIX: &str = "Agent: ";

/// Runs the chat loop until `exit` or end of input.
///
/// `exit` (any case) clears the session before ending; end of input ends
/// without clearing.
///
/// # Errors
///
/// Returns an I/O error if reading input or writing output fails.
pub async fn run_chat<R, W>(
    runner: &TurnRunner,
    session_id: &str,
    input: R,
    output: &mut W,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    output.write_all(format!("{BANNER}\n").as_bytes()).await?;

    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            debug!("end of input");
            output.write_all(b"\n").await?;
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("exit") {
            if let Err(e) = runner.clear_session(session_id) {
                warn!(error = %e, session = session_id, "failed to clear session");
            }
            output.write_all(format!("{GOODBYE}\n").as_bytes()).await?;
            break;
        }

        let outcome = runner.run_turn(session_id, line).await;
        output
            .write_all(format!("{AGENT_PREFIX}{}\n\n", outcome.message()).as_bytes())
            .await?;
    }

    output.flush().await
}
