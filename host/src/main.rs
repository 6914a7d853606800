mod command;
mod session;

use command::{ReplyMatch, RequestConfig, Requester, TimeoutTracker};
use session::NodeSession;
use climate_shared::{limits, Command, Frame};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "0.0.0.0:7600".into());
    let listener = TcpListener::bind(&addr).await?;
    info!("Host listening on {}", addr);

    let requester = Arc::new(Requester::new(RequestConfig::default()));

    let tracker = TimeoutTracker::new(requester.clone());
    tokio::spawn(async move {
        tracker.run().await;
    });

    // Commands typed on stdin, one code per line
    let stdin_requester = requester.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line == "help" {
                let codes: Vec<String> = Command::all().map(|c| c.to_string()).collect();
                info!("Commands: {}", codes.join(" "));
                continue;
            }
            match Command::parse(line.as_bytes()) {
                Some(command) => {
                    if let Err(e) = stdin_requester.send(command).await {
                        warn!("Failed to send {}: {}", command, e);
                    }
                }
                None => warn!("Unknown command: {:?} (type 'help')", line),
            }
        }
    });

    // Periodic status poll
    let poll_requester = requester.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(poll_requester.config().status_poll_interval);
        loop {
            ticker.tick().await;
            if let Err(e) = poll_requester.send(Command::Status).await {
                debug!("Status poll skipped: {}", e);
            }
        }
    });

    loop {
        let (stream, addr) = listener.accept().await?;
        stream.set_nodelay(true)?;
        info!("Node connected from {}", addr);

        let mut session = NodeSession::new(stream, addr);
        requester.attach(session.handle()).await;

        let requester = requester.clone();
        tokio::spawn(async move {
            while let Some(frame) = session.recv().await {
                handle_frame(&requester, &frame).await;
            }
            info!("Node disconnected: {}", addr);
            requester.detach(addr).await;
        });
    }
}

async fn handle_frame(requester: &Requester, frame: &Frame) {
    if frame.channel_id != u32::from(limits::REPLY_CHANNEL_ID) {
        debug!("Ignoring frame on channel {}", frame.channel_id);
        return;
    }

    let text = String::from_utf8_lossy(&frame.payload);
    match requester.handle_reply(&text).await {
        Ok(ReplyMatch::Matched { request, reply }) => {
            info!(
                "<<< {} (seq={}): {}={}",
                request.command,
                reply.sequence,
                reply.key,
                reply.values.join(";")
            );
        }
        Ok(ReplyMatch::Unsolicited(reply)) => {
            warn!("<<< Unmatched reply (seq={}): {}", reply.sequence, text);
        }
        Err(e) => {
            warn!("<<< Unparseable reply {:?}: {}", text, e);
        }
    }
}
