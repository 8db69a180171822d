// Interactive terminal chat

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::error;
use umi_assist_core::ChatService;

/// Words that end the session
fn is_exit(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "quit" | "exit")
}

/// Run the REPL until EOF or `quit`/`exit`; `initial` is sent before the first prompt
pub async fn run(
    service: Arc<ChatService>,
    session: Option<String>,
    initial: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session_id = session.filter(|s| !s.trim().is_empty());
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout
        .write_all(b"UMI assistant. Describe the API request you want to build; type 'quit' to leave.\n")
        .await?;

    let mut pending = initial.filter(|q| !q.trim().is_empty());
    loop {
        let line = match pending.take() {
            Some(q) => q,
            None => {
                stdout.write_all(b"> ").await?;
                stdout.flush().await?;
                match lines.next_line().await? {
                    Some(l) => l,
                    None => break,
                }
            }
        };
        if is_exit(&line) {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        match service.handle_turn(session_id.as_deref(), &line).await {
            Ok(outcome) => {
                if session_id.as_deref() != Some(outcome.session_id.as_str()) {
                    stdout
                        .write_all(format!("[session {}]\n", outcome.session_id).as_bytes())
                        .await?;
                    session_id = Some(outcome.session_id);
                }
                stdout
                    .write_all(format!("{}\n\n", outcome.response).as_bytes())
                    .await?;
            }
            Err(e) => {
                error!(target = "umi_assistant", error = %e, "turn failed");
                stdout.write_all(format!("error: {e}\n\n").as_bytes()).await?;
            }
        }
    }

    if let Some(id) = session_id {
        stdout
            .write_all(format!("Session {id} saved.\n").as_bytes())
            .await?;
    }
    stdout.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_words() {
        assert!(is_exit("quit"));
        assert!(is_exit("  EXIT "));
        assert!(!is_exit("exit the bond"));
    }
}
