use crate::events::{AppEvent, Reply};
use async_channel::Sender;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

pub const SOCKET_PATH: &str = "/tmp/foodwheel.sock";

/// Maps a client line to the event that serves it.
pub fn parse_command(line: &str, reply: Reply) -> Option<AppEvent> {
    match line.trim() {
        "spin" => Some(AppEvent::Spin(reply)),
        "retry" => Some(AppEvent::Retry(reply)),
        "all" => Some(AppEvent::SearchAll(reply)),
        "status" => Some(AppEvent::Status(reply)),
        _ => None,
    }
}

pub async fn run_server(tx: Sender<AppEvent>) {
    // Cleanup old socket if it exists
    if std::fs::metadata(SOCKET_PATH).is_ok() {
        let _ = std::fs::remove_file(SOCKET_PATH);
    }

    let listener = match UnixListener::bind(SOCKET_PATH) {
        Ok(l) => l,
        Err(e) => {
            log::error!("Failed to bind unix socket: {}", e);
            return;
        }
    };
    log::info!("Listening on {}", SOCKET_PATH);

    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let tx = tx.clone();
                tokio::spawn(async move {
                    if let Err(e) = serve(stream, tx).await {
                        log::debug!("Client connection ended: {}", e);
                    }
                });
            }
            Err(e) => {
                log::error!("Failed to accept connection: {}", e);
            }
        }
    }
}

async fn serve(stream: UnixStream, tx: Sender<AppEvent>) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let (reply_tx, reply_rx) = async_channel::unbounded();
        let Some(event) = parse_command(&line, reply_tx) else {
            writer
                .write_all(format!("error: unknown command '{}'\n", line.trim()).as_bytes())
                .await?;
            continue;
        };

        if tx.send(event).await.is_err() {
            writer.write_all(b"error: foodwheel is shutting down\n").await?;
            break;
        }

        // Ends once the handler and any task it spawned drop their reply senders.
        while let Ok(out) = reply_rx.recv().await {
            writer.write_all(out.as_bytes()).await?;
            writer.write_all(b"\n").await?;
        }
    }

    writer.shutdown().await
}
