//! Prompt templates and the `{{name}}` substitution used to fill them.
//!
//! Rendering is a pure string transform so prompts can be checked without a
//! model in the loop.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PromptError {
    #[error("no value for template variable `{0}`")]
    MissingVariable(String),

    #[error("unterminated placeholder at byte {0}")]
    Unterminated(usize),
}

pub fn render(template: &str, vars: &[(&str, &str)]) -> Result<String, PromptError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut offset = 0;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or(PromptError::Unterminated(offset + start))?;
        let name = after[..end].trim();

        let value = vars
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| *v)
            .ok_or_else(|| PromptError::MissingVariable(name.to_string()))?;
        out.push_str(value);

        let consumed = start + 2 + end + 2;
        offset += consumed;
        rest = &rest[consumed..];
    }

    out.push_str(rest);
    Ok(out)
}

pub const CLASSIFY_TEMPLATE: &str = r#"You are an intent classifier for an e-commerce customer support assistant.

Read the customer's latest message, using the earlier turns only as context, and answer with exactly one of these labels:
- ORDER_INFO: the customer asks for facts about an existing or past order (status, shipping, delivery date, payment, tracking)
- ORDER_HELP: the customer needs an action on an order (cancel, change address, refund, return, damaged or missing item)
- OUT_OF_SCOPE: anything else

Allowed labels: {{labels}}

Answer with the label only. No punctuation, no explanation."#;

pub const EXTRACT_TEMPLATE: &str = r#"You resolve which order an e-commerce customer is talking about.

The customer's own recent orders, most recent first (do not invent anything else):
{{orders}}

Rules:
- If the customer gives an order number, use it as target_order_id, even if it is not in the list.
- If the customer says "my last order", "my latest order" or "my most recent order", set wants_latest to true and target_order_id to null.
- If it is not clear which order they mean, set needs_clarification to true and target_order_id to null.

Return ONLY a JSON object with exactly these keys:
{"target_order_id": <number or null>, "wants_latest": <true or false>, "needs_clarification": <true or false>}"#;

pub const ANSWER_TEMPLATE: &str = r#"You are the customer support assistant of an online shop.
You write friendly, clear, polite English in two or three sentences.
You never mention SQL, databases, internal tools or other customers.
You only use the facts in the order record below. If a fact is missing, say it is not available yet.
Always mention the order number as #{{order_id}} and its current status.

Customer first name: {{first_name}}

Order record:
- order: #{{order_id}}
- status: {{status}}
- purchased: {{date_purchase}}
- shipped: {{date_shipped}}
- delivered: {{date_delivered}}
- payment: {{payment_status}}
- items: {{items}}

Answer the customer's latest message. Return only the reply text, not JSON."#;
