//! Headless till driver.
//!
//! Reads one JSON request per stdin line, applies it to a fresh session and
//! writes the resulting session snapshot as one JSON line to stdout. Dismiss
//! timers keep running between lines.

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use till_notifications::TokioScheduler;
use till_session::{PosSession, SessionConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = SessionConfig::from_env().context("reading session configuration")?;
    till_observability::init_with(config.log_format);

    let scheduler = TokioScheduler::try_current().context("no tokio runtime")?;
    let mut session = PosSession::new(config, scheduler);
    info!(cart_id = %session.cart().id_typed(), "session started");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        if line.trim().is_empty() {
            continue;
        }

        session.handle_line(&line);

        let mut out = serde_json::to_vec(&session.snapshot()).context("encoding snapshot")?;
        out.push(b'\n');
        stdout.write_all(&out).await.context("writing stdout")?;
        stdout.flush().await.context("flushing stdout")?;
    }

    info!("input closed, session ended");
    Ok(())
}
