//! Line transport
//!
//! Reads requests line by line, runs each on its own task and funnels every
//! reply and notification through a single writer task.

use std::io;
use std::sync::Arc;

use refbridge_sdk::BridgeError;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::ServeError;
use crate::protocol::{decode_line, encode, Decoded, Outbound};
use crate::session::Session;

/// Serve a session until `reader` reaches end of input.
///
/// On EOF the loop stops reading, waits for in-flight requests to reply
/// and drains the writer before returning.
pub async fn serve<R, W>(session: Arc<Session>, mut reader: R, writer: W) -> Result<(), ServeError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let outbound = session.take_outbound().ok_or(ServeError::AlreadyServing)?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let writer_task = tokio::spawn(write_loop(outbound, shutdown_rx, writer));

    let limit = session.config().max_line_bytes;
    let mut in_flight = JoinSet::new();
    let mut buf = Vec::new();
    info!("serving");

    while let Some(fits) = next_line(&mut reader, &mut buf, limit).await? {
        while let Some(joined) = in_flight.try_join_next() {
            log_join(joined);
        }
        if !fits {
            warn!(limit, "inbound line exceeds the length limit, skipped");
            continue;
        }
        let text = String::from_utf8_lossy(&buf);
        let line = text.trim();
        if line.is_empty() {
            continue;
        }
        debug!(line, "inbound");
        match decode_line(line) {
            Decoded::Request(request) => {
                let session = Arc::clone(&session);
                in_flight.spawn(async move {
                    let reply = session.handle(request).await;
                    session.send(reply);
                });
            }
            Decoded::Invalid { r, message } => {
                session.send(Outbound::error(r, &BridgeError::Protocol(message)));
            }
            Decoded::Skip(reason) => warn!(%reason, "skipping malformed line"),
        }
    }

    info!(pending = in_flight.len(), "inbound closed");
    while let Some(joined) = in_flight.join_next().await {
        log_join(joined);
    }
    // The writer may already be gone if the output failed
    let _ = shutdown_tx.send(());
    writer_task.await?
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(err) = joined {
        warn!(error = %err, "request task failed");
    }
}

/// Read one `\n`-terminated line into `buf`, without the terminator.
///
/// Returns `None` at end of input and `Some(false)` when the line was longer
/// than `limit` (its bytes are discarded).
async fn next_line<R>(reader: &mut R, buf: &mut Vec<u8>, limit: usize) -> io::Result<Option<bool>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let mut fits = true;
    let mut seen = false;
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(seen.then_some(fits));
        }
        seen = true;
        let (chunk, complete) = match available.iter().position(|&b| b == b'\n') {
            Some(end) => (&available[..end], true),
            None => (available, false),
        };
        if fits && buf.len() + chunk.len() <= limit {
            buf.extend_from_slice(chunk);
        } else {
            fits = false;
            buf.clear();
        }
        let used = chunk.len() + usize::from(complete);
        reader.consume(used);
        if complete {
            return Ok(Some(fits));
        }
    }
}

async fn write_loop<W>(
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    mut shutdown: oneshot::Receiver<()>,
    mut writer: W,
) -> Result<(), ServeError>
where
    W: AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            biased;
            message = outbound.recv() => match message {
                Some(message) => write_message(&mut writer, &message).await?,
                None => break,
            },
            _ = &mut shutdown => {
                while let Ok(message) = outbound.try_recv() {
                    write_message(&mut writer, &message).await?;
                }
                break;
            }
        }
    }
    writer.flush().await?;
    Ok(())
}

async fn write_message<W>(writer: &mut W, message: &Outbound) -> Result<(), ServeError>
where
    W: AsyncWrite + Unpin,
{
    let mut line = encode(message)?;
    debug!(line = %line, "outbound");
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
