//! Actor echo - actor-backed handler example.
//!
//! This example demonstrates:
//! - Building an actor-backed handler with `HandlerDefinition::with_actor`
//! - Keeping per-session state inside a `SessionActor`
//! - Loading `SessionSettings` from a TOML document
//!
//! Each line read from stdin is delivered to the actor's mailbox; its replies
//! are printed as they arrive.
//!
//! ```text
//! cargo run --example actor_echo
//! ```

use sockjs_handler::channel::{Outbound, OutboundEvent};
use sockjs_handler::error::HandlerResult;
use sockjs_handler::{
    open_session, ActorProps, HandlerDefinition, Session, SessionActor, SessionSettings,
};
use tokio::io::{AsyncBufReadExt, BufReader};

const SETTINGS: &str = r#"
heartbeatMs = 10000
sessionTimeoutMs = 30000
sendBufferCapacity = 32
cookieStrategy = "jSessionId"
"#;

/// Numbers every reply and says goodbye on close.
struct Numbered {
    count: u64,
}

impl SessionActor for Numbered {
    fn on_message(&mut self, message: String, out: &Outbound) -> HandlerResult {
        self.count += 1;
        out.write(format!("#{} {}", self.count, message))?;
        Ok(())
    }

    fn on_close(&mut self) {
        tracing::info!("Actor saw {} messages", self.count);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let settings = SessionSettings::from_toml_str(SETTINGS)?;
    tracing::info!(
        "Heartbeat every {:?}, cookie needed: {}",
        settings.heartbeat(),
        settings.cookie_strategy().cookie_needed()
    );

    let handler = HandlerDefinition::with_actor(|out| {
        out.write("actor ready")?;
        Ok(ActorProps::new(Numbered { count: 0 }).named("numbered"))
    })
    .with_settings(settings);

    let Session::Actor(mut session) = open_session(&handler)? else {
        return Err("handler is actor-backed".into());
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => session.deliver(line).await?,
                None => break,
            },
            event = session.outbound().recv() => match event {
                Some(OutboundEvent::Message(msg)) => println!("{msg}"),
                Some(OutboundEvent::Closed) | None => break,
            },
        }
    }

    session.close().await;
    Ok(())
}
