//! `memgarden stream`: newline-delimited JSON events on stdout.

use std::io::Write;

use memgarden_core::{SiteContext, parse_history};

use super::{Overrides, Runtime};
use crate::output;

pub async fn run(
    overrides: &Overrides,
    message: &str,
    history: Option<&str>,
    context: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let history = history.map(parse_history).transpose()?.unwrap_or_default();
    let context = context.map(SiteContext::parse).transpose()?.flatten();

    let service = Runtime::load().text_service(overrides)?;
    let mut events = service.stream_conversation(message, &history, context.as_ref());

    let mut stdout = std::io::stdout();
    while let Some(event) = events.recv().await {
        output::emit_line(&event);
        stdout.flush()?;
    }
    Ok(())
}
