//! Prompt templates for the two model calls of a turn.
//!
//! Placeholders are `{name}` and are filled in a single pass, so text
//! supplied by users or documents is never re-expanded.

/// Rewrites a follow-up message into a standalone question.
pub const CONDENSE_TEMPLATE: &str = "\
You are a question rewriter. Given the conversation so far and a new user message,
rewrite the message into a standalone, specific question that can be answered with the provided knowledge base.
If the message is a generic or ambiguous follow-up (e.g., \"then\", \"okay\"), turn it into a clarifying question.
The new message may or may not be related to the previous conversation.

Chat History:
{chat_history}

User Message: {question}

Standalone question:";

/// Answers strictly from the retrieved context.
pub const ANSWER_TEMPLATE: &str = "\
You are a respectful, professional, and supportive support assistant.
Answer using ONLY the provided context.

- If the answer to the user's question is not found in the context, do NOT attempt to answer. Instead, politely suggest chatting with a live agent for further assistance.
- However, if the user is making a generic or social remark (such as \"how are you\", \"good afternoon\", \"hello\", etc.), you may respond appropriately and courteously.
- Never fabricate answers or provide information not present in the context.
- Be concise, avoid repeating prior answers unless explicitly asked, and always maintain a respectful and supportive tone.

Context:
{context}

Chat History:
{chat_history}

Question: {question}

Answer:";

pub fn condense_prompt(chat_history: &str, question: &str) -> String {
    render(
        CONDENSE_TEMPLATE,
        &[("chat_history", chat_history), ("question", question)],
    )
}

pub fn answer_prompt(context: &str, chat_history: &str, question: &str) -> String {
    render(
        ANSWER_TEMPLATE,
        &[
            ("context", context),
            ("chat_history", chat_history),
            ("question", question),
        ],
    )
}

/// Substitute `{name}` placeholders. Unknown names are left as written.
fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(
        template.len() + vars.iter().map(|(_, v)| v.len()).sum::<usize>(),
    );
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let substituted = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });

        match substituted {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condense_prompt_carries_history_and_message() {
        let prompt = condense_prompt(
            "user: I need help with my order\nassistant: Sure, what's your order number?",
            "12345",
        );
        assert!(prompt.contains("Chat History:\nuser: I need help with my order"));
        assert!(prompt.contains("User Message: 12345"));
        assert!(prompt.ends_with("Standalone question:"));
        assert!(!prompt.contains("{chat_history}"));
    }

    #[test]
    fn answer_prompt_sections_in_order() {
        let prompt = answer_prompt("We are open 9-5 Mon-Fri.", "", "What are your business hours?");
        let context = prompt.find("Context:\nWe are open 9-5 Mon-Fri.").unwrap();
        let history = prompt.find("Chat History:").unwrap();
        let question = prompt.find("Question: What are your business hours?").unwrap();
        assert!(context < history && history < question);
        assert!(prompt.contains("live agent"));
        assert!(prompt.contains("Never fabricate"));
        assert!(prompt.contains("generic or social remark"));
    }

    #[test]
    fn empty_context_keeps_section() {
        let prompt = answer_prompt("", "", "What's the meaning of life?");
        assert!(prompt.contains("Context:\n\n\nChat History:"));
    }

    #[test]
    fn values_are_not_re_expanded() {
        let prompt = condense_prompt("", "what does {chat_history} mean? {question}");
        assert!(prompt.contains("User Message: what does {chat_history} mean? {question}"));
    }

    #[test]
    fn unknown_placeholders_and_stray_braces_kept() {
        assert_eq!(render("a {x} {y", &[("z", "1")]), "a {x} {y");
        assert_eq!(render("{a}{b}", &[("a", "1"), ("b", "2")]), "12");
    }
}
