//! Conversation assembly.
//!
//! Turns a new message, the caller's history and an optional site context
//! into the ordered turn sequence sent to a text oracle:
//! `[system] + last five user/assistant turns + [user]`.
//!
//! Assembly is pure and never fails; bad optional inputs have already been
//! degraded to "none" by the time they reach here.

use memgarden_config::PersonalityConfig;
use memgarden_core::context::SiteContext;
use memgarden_core::message::{ConversationContext, Message};
use memgarden_core::provider::ProviderRequest;

const SITE_INTRO: &str =
    "You are Sprout, a kind Memory Garden helper. Use simple words and easy language.";

const GENERIC_INTRO: &str =
    "You are a kind friend helping with the Memory Garden. Use simple words and easy language.";

/// An assembled prompt, ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPrompt {
    turns: Vec<Message>,
}

impl AssembledPrompt {
    pub fn turns(&self) -> &[Message] {
        &self.turns
    }

    /// The system instruction (always the first turn).
    pub fn system_instruction(&self) -> &str {
        self.turns.first().map(|m| m.content.as_str()).unwrap_or_default()
    }

    pub fn into_turns(self) -> Vec<Message> {
        self.turns
    }

    pub fn into_request(
        self,
        model: impl Into<String>,
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> ProviderRequest {
        let mut request = ProviderRequest::new(model, self.turns);
        request.temperature = temperature;
        request.max_tokens = max_tokens;
        request
    }
}

/// Builds prompts against one loaded personality.
#[derive(Debug, Clone, Copy)]
pub struct ConversationAssembler<'a> {
    personality: &'a PersonalityConfig,
}

impl<'a> ConversationAssembler<'a> {
    pub fn new(personality: &'a PersonalityConfig) -> Self {
        Self { personality }
    }

    /// The system instruction for a request from `context`.
    pub fn system_instruction(&self, context: Option<&SiteContext>) -> String {
        let intro = match context {
            Some(ctx) if ctx.is_memory_garden() => SITE_INTRO,
            _ => GENERIC_INTRO,
        };

        let mut instruction = format!("{intro}\n\n{}", self.personality.personality_prompt().trim_end());

        if let Some(story) = context.and_then(story_line) {
            instruction.push_str("\n\n");
            instruction.push_str(&story);
        }

        instruction.push_str("\n\n");
        instruction.push_str(&self.reply_rules());
        instruction
    }

    /// Length, tone and closing-question rules every reply must follow.
    fn reply_rules(&self) -> String {
        let flow = self.personality.conversation_flow();
        let mut rules = format!(
            "Keep responses short (4-5 lines max, under {} words), warm, and friendly. \
             ALWAYS end with a guiding question that starts with 'What' or 'How' to help them \
             explore their memories deeper.",
            flow.max_response_length
        );
        if !flow.use_emojis {
            rules.push_str(" Do not use emojis.");
        }
        rules
    }

    /// `[system] + retained history + [user(new_message)]`.
    pub fn assemble(
        &self,
        new_message: &str,
        history: &[Message],
        context: Option<&SiteContext>,
    ) -> AssembledPrompt {
        let window = ConversationContext::from_history(history.to_vec());

        let mut turns = Vec::with_capacity(window.len() + 2);
        turns.push(Message::system(self.system_instruction(context)));
        turns.extend(window.conversational().cloned());
        turns.push(Message::user(new_message));

        AssembledPrompt { turns }
    }

    /// A single-turn prompt asking for a reflection on one memory.
    pub fn reflection(&self, title: &str, description: &str) -> AssembledPrompt {
        let user = format!(
            "Talk like a kind friend about this memory:\n\nTitle: {title}\nDescription: {description}\n\n\
             Use simple words, keep it short (4-5 lines), be warm and friendly. IMPORTANT: Always end \
             with a guiding question that starts with 'What' or 'How' to help them think about this \
             memory more."
        );

        AssembledPrompt {
            turns: vec![
                Message::system(self.system_instruction(None)),
                Message::user(user),
            ],
        }
    }
}

/// The memory a chat is about, when the front end sends one along.
fn story_line(ctx: &SiteContext) -> Option<String> {
    let title = ctx.attribute("test_title");
    let description = ctx.attribute("test_description");
    match (title, description) {
        (None, None) => None,
        (title, description) => Some(format!(
            "The user is talking about this memory:\nTitle: {}\nDescription: {}",
            title.unwrap_or("Untitled"),
            description.unwrap_or("")
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memgarden_core::context::MEMORY_GARDEN_SITE;
    use memgarden_core::message::Role;
    use serde_json::json;

    fn contents(prompt: &AssembledPrompt) -> Vec<(Role, &str)> {
        prompt
            .turns()
            .iter()
            .map(|m| (m.role, m.content.as_str()))
            .collect()
    }

    #[test]
    fn empty_message_and_history_gives_system_and_user() {
        let personality = PersonalityConfig::default();
        let prompt = ConversationAssembler::new(&personality).assemble("", &[], None);

        assert_eq!(prompt.turns().len(), 2);
        assert_eq!(prompt.turns()[0].role, Role::System);
        assert_eq!(prompt.turns()[1], Message::user(""));
    }

    #[test]
    fn seven_entry_history_keeps_last_five() {
        let history = vec![
            Message::user("Hi"),
            Message::assistant("Hello"),
            Message::user("A"),
            Message::assistant("B"),
            Message::user("C"),
            Message::assistant("D"),
            Message::user("E"),
        ];
        let personality = PersonalityConfig::default();
        let prompt = ConversationAssembler::new(&personality).assemble("F", &history, None);

        let turns = contents(&prompt);
        assert_eq!(turns.len(), 7);
        assert_eq!(
            &turns[1..],
            &[
                (Role::User, "A"),
                (Role::Assistant, "B"),
                (Role::User, "C"),
                (Role::Assistant, "D"),
                (Role::User, "E"),
                (Role::User, "F"),
            ]
        );
    }

    #[test]
    fn any_long_history_keeps_exactly_the_last_five() {
        let personality = PersonalityConfig::default();
        let assembler = ConversationAssembler::new(&personality);
        for len in 6..20 {
            let history: Vec<Message> = (0..len)
                .map(|i| {
                    if i % 2 == 0 {
                        Message::user(i.to_string())
                    } else {
                        Message::assistant(i.to_string())
                    }
                })
                .collect();
            let prompt = assembler.assemble("next", &history, None);
            let kept: Vec<String> = prompt.turns()[1..6].iter().map(|m| m.content.clone()).collect();
            let expected: Vec<String> = (len - 5..len).map(|i| i.to_string()).collect();
            assert_eq!(kept, expected, "history of {len}");
        }
    }

    #[test]
    fn truncation_happens_before_role_filtering() {
        // "old" falls outside the window; the system and unknown entries
        // inside it are dropped afterwards.
        let history = vec![
            Message::user("old"),
            Message::user("u1"),
            Message::assistant("a1"),
            Message::system("injected"),
            Message::new(Role::Unknown, "tool noise"),
            Message::user("u2"),
        ];
        let personality = PersonalityConfig::default();
        let prompt = ConversationAssembler::new(&personality).assemble("now", &history, None);

        let turns = contents(&prompt);
        assert_eq!(
            &turns[1..],
            &[
                (Role::User, "u1"),
                (Role::Assistant, "a1"),
                (Role::User, "u2"),
                (Role::User, "now"),
            ]
        );
        assert!(!prompt.system_instruction().contains("injected"));
    }

    #[test]
    fn site_context_selects_sprout() {
        let personality = PersonalityConfig::default();
        let assembler = ConversationAssembler::new(&personality);

        let site = SiteContext::for_site(MEMORY_GARDEN_SITE);
        assert!(assembler.system_instruction(Some(&site)).starts_with("You are Sprout"));

        let other = SiteContext::for_site("Somewhere Else");
        assert!(assembler.system_instruction(Some(&other)).starts_with(GENERIC_INTRO));
        assert!(assembler.system_instruction(None).starts_with(GENERIC_INTRO));
    }

    #[test]
    fn instruction_enforces_short_replies_and_closing_question() {
        let personality = PersonalityConfig::default();
        let instruction = ConversationAssembler::new(&personality).system_instruction(None);
        assert!(instruction.contains("4-5 lines max, under 200 words"));
        assert!(instruction.contains("starts with 'What' or 'How'"));
        assert!(instruction.contains("Active Listening"));
    }

    #[test]
    fn word_ceiling_and_emojis_follow_personality() {
        let mut personality = PersonalityConfig::default();
        let updates = json!({"conversation_flow": {"max_response_length": 80, "use_emojis": false}});
        personality.merge(updates.as_object().unwrap());

        let instruction = ConversationAssembler::new(&personality).system_instruction(None);
        assert!(instruction.contains("under 80 words"));
        assert!(instruction.contains("Do not use emojis."));
    }

    #[test]
    fn story_attributes_are_included() {
        let personality = PersonalityConfig::default();
        let ctx = SiteContext::for_site(MEMORY_GARDEN_SITE)
            .with_attribute("test_title", "Sunset Walk")
            .with_attribute("test_description", "Evening by the lake");
        let instruction = ConversationAssembler::new(&personality).system_instruction(Some(&ctx));
        assert!(instruction.contains("Title: Sunset Walk\nDescription: Evening by the lake"));
    }

    #[test]
    fn reflection_prompt_names_the_memory() {
        let personality = PersonalityConfig::default();
        let prompt = ConversationAssembler::new(&personality).reflection("Sunset Walk", "By the sea");
        assert_eq!(prompt.turns().len(), 2);
        assert!(prompt.turns()[1].content.contains("Title: Sunset Walk\nDescription: By the sea"));
    }

    #[test]
    fn request_carries_sampling_settings() {
        let personality = PersonalityConfig::default();
        let request = ConversationAssembler::new(&personality)
            .assemble("hi", &[], None)
            .into_request("gemini-2.5-flash", 0.4, Some(150));
        assert_eq!(request.model, "gemini-2.5-flash");
        assert_eq!(request.max_tokens, Some(150));
        assert!((request.temperature - 0.4).abs() < f32::EPSILON);
        assert!(request.system_instruction().is_some());
    }
}
