//! Echo handler - inline callback example.
//!
//! This example demonstrates:
//! - Building an inline handler with `HandlerDefinition::when_ready`
//! - Registering message and close callbacks on the session's `Inbound`
//! - Playing the transport's role: feeding frames and draining `Outbound`
//!
//! Each line read from stdin is one inbound frame. Type `quit` to make the
//! handler close the session.
//!
//! ```text
//! cargo run --example echo
//! ```

use sockjs_handler::channel::OutboundEvent;
use sockjs_handler::{open_session, HandlerDefinition, Session, SessionSettings};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let settings = SessionSettings::builder().send_buffer_capacity(64).build();

    let echo = HandlerDefinition::when_ready(|inbound, out| {
        out.write("connected, type something")?;

        inbound.on_message(move |msg| {
            if msg.trim() == "quit" {
                out.close();
            } else if let Err(e) = out.write(format!("echo: {msg}")) {
                tracing::warn!("Dropping echo: {}", e);
            }
        });
        inbound.on_close(|| tracing::info!("Session closed"));
        Ok(())
    })
    .with_settings(settings);

    let Session::Inline(mut session) = open_session(&echo)? else {
        return Err("echo handler is inline".into());
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        // Flush everything the handler has written so far
        while let Some(event) = session.outbound().try_recv() {
            match event {
                OutboundEvent::Message(msg) => println!("{msg}"),
                OutboundEvent::Closed => {
                    session.close();
                    return Ok(());
                }
            }
        }

        match lines.next_line().await? {
            Some(line) => session.deliver(&line),
            None => break,
        }
    }

    session.close();
    Ok(())
}
