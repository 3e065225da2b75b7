//! `memgarden chat` and `memgarden reflect`.

use memgarden_companion::ChatReply;
use memgarden_core::{SiteContext, parse_history};
use serde_json::{Value, json};

use super::{Overrides, Runtime};
use crate::output;

pub async fn run(
    overrides: &Overrides,
    message: &str,
    history: Option<&str>,
    context: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let history = match history {
        Some(raw) => parse_history(raw)?,
        None => Vec::new(),
    };
    let context = match context {
        Some(raw) => SiteContext::parse(raw)?,
        None => None,
    };

    let service = Runtime::load().text_service(overrides)?;
    let reply = service
        .continue_conversation(message, &history, context.as_ref())
        .await;

    output::emit(&output::success(chat_payload(message, reply)));
    Ok(())
}

pub async fn reflect(
    overrides: &Overrides,
    title: &str,
    description: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = Runtime::load().text_service(overrides)?;
    let reply = service.reflect_on_memory(title, description).await;

    output::emit(&output::success(reflection_payload(title, description, reply)));
    Ok(())
}

fn chat_payload(message: &str, reply: ChatReply) -> Value {
    let mut payload = json!({
        "response": reply.response,
        "message": message,
        "model": reply.model,
        "fallback": reply.fallback,
    });
    extend_optional(&mut payload, &reply.category, &reply.note);
    payload
}

fn reflection_payload(title: &str, description: &str, reply: ChatReply) -> Value {
    let mut payload = json!({
        "reflection": reply.response,
        "title": title,
        "description": description,
        "model": reply.model,
        "fallback": reply.fallback,
    });
    extend_optional(&mut payload, &None, &reply.note);
    payload
}

fn extend_optional(payload: &mut Value, category: &Option<String>, note: &Option<String>) {
    if let Some(category) = category {
        payload["category"] = Value::String(category.clone());
    }
    if let Some(note) = note {
        payload["note"] = Value::String(note.clone());
    }
}
