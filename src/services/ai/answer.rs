use std::time::Duration;

use crate::models::{Order, OrderSummary, User};
use crate::services::ai::prompt::{self, ANSWER_TEMPLATE};
use crate::services::ai::{complete, GenerationOptions, LlmProvider, Message};

pub const HANDOFF_REPLY: &str =
    "Thanks for letting me know. A human support agent will take over this request for you shortly.";

pub const REDIRECT_REPLY: &str = "I can help you with information about your existing or past orders \
     (status, delivery, payment). How can I help with one of your orders?";

pub const REFUSAL_REPLY: &str =
    "Sorry, I can't help with that request. I can answer questions about your own orders.";

pub const UNAVAILABLE_REPLY: &str =
    "Sorry, I'm having trouble right now. Please try again in a moment.";

/// Same wording whether the order does not exist or belongs to someone else.
pub const NOT_FOUND_REPLY: &str =
    "Sorry, I couldn't locate that order. Could you double-check the order number?";

pub fn clarification_reply(first_name: &str, recent_orders: &[OrderSummary]) -> String {
    if recent_orders.is_empty() {
        return format!("Hi {first_name}, which order do you mean? Could you share the order number?");
    }
    let ids = recent_orders
        .iter()
        .map(|o| format!("#{}", o.order_id))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Hi {first_name}, which order do you mean? Your recent orders are {ids}. \
         Could you confirm the order number?"
    )
}

/// Deterministic reply built only from the stored record.
pub fn order_facts_reply(first_name: &str, order: &Order) -> String {
    let mut reply = format!(
        "Hi {first_name}, your order #{} is currently {}. It was purchased on {}",
        order.order_id, order.status, order.date_purchase
    );
    if let Some(shipped) = &order.date_shipped {
        reply.push_str(&format!(", shipped on {shipped}"));
    }
    if let Some(delivered) = &order.date_delivered {
        reply.push_str(&format!(", delivered on {delivered}"));
    }
    reply.push_str(&format!(". Payment status: {}.", order.payment_status));
    reply
}

/// Asks the model to phrase the order facts, keeping its reply only if it
/// states the stored status and names no other order.
pub async fn generate_order_answer(
    llm: &dyn LlmProvider,
    user: &User,
    message: &str,
    order: &Order,
    max_tokens: u32,
    timeout: Duration,
) -> String {
    let items = if order.items.is_empty() {
        "not available".to_string()
    } else {
        order
            .items
            .iter()
            .map(|i| format!("{} x{}", i.product_name, i.quantity))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let order_id = order.order_id.to_string();

    let rendered = prompt::render(
        ANSWER_TEMPLATE,
        &[
            ("first_name", user.first_name.as_str()),
            ("order_id", order_id.as_str()),
            ("status", order.status.as_str()),
            ("date_purchase", order.date_purchase.as_str()),
            ("date_shipped", order.date_shipped.as_deref().unwrap_or("not available")),
            ("date_delivered", order.date_delivered.as_deref().unwrap_or("not available")),
            ("payment_status", order.payment_status.as_str()),
            ("items", items.as_str()),
        ],
    );
    let system = match rendered {
        Ok(system) => system,
        Err(e) => {
            tracing::error!(error = %e, "answer template failed to render");
            return order_facts_reply(&user.first_name, order);
        }
    };

    let messages = [Message {
        role: "user".to_string(),
        content: message.to_string(),
    }];

    match complete(llm, &system, &messages, &GenerationOptions::text(max_tokens), timeout).await {
        Ok(reply) if is_grounded(reply.trim(), order) => reply.trim().to_string(),
        Ok(_) => {
            tracing::warn!(order_id = order.order_id, "model reply not grounded in order record, using template");
            order_facts_reply(&user.first_name, order)
        }
        Err(e) => {
            tracing::warn!(error = %e, "answer generation failed, using template");
            order_facts_reply(&user.first_name, order)
        }
    }
}

/// Payment words a reply could state. Any of them must agree with the record.
const PAYMENT_WORDS: &[&str] = &[
    "paid", "unpaid", "pending", "refunded", "declined", "authorized", "overdue",
];

/// A reply is grounded when it affirms the stored status, names no other
/// order, and every date or payment word it states comes from the record.
pub fn is_grounded(reply: &str, order: &Order) -> bool {
    let words = words(reply);
    if !affirms_status(&words, &order.status) {
        return false;
    }
    if referenced_order_ids(reply).into_iter().any(|id| id != order.order_id) {
        return false;
    }

    let known_dates: Vec<&str> = [
        Some(order.date_purchase.as_str()),
        order.date_shipped.as_deref(),
        order.date_delivered.as_deref(),
    ]
    .into_iter()
    .flatten()
    .filter_map(|d| d.get(..10))
    .collect();
    if iso_dates(reply).iter().any(|d| !known_dates.contains(&d.as_str())) {
        return false;
    }

    let payment = order.payment_status.to_lowercase();
    let status = order.status.to_lowercase();
    words
        .iter()
        .filter(|w| PAYMENT_WORDS.contains(&w.as_str()))
        .all(|w| **w == payment || **w == status)
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '\u{2019}'))
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase().replace('\u{2019}', "'"))
        .collect()
}

fn is_negation(word: &str) -> bool {
    matches!(word, "not" | "never" | "no") || word.ends_with("n't")
}

/// The status must appear as whole words, and never right after a negation
/// such as "not" or "hasn't".
fn affirms_status(words: &[String], status: &str) -> bool {
    let status = self::words(status);
    if status.is_empty() || words.len() < status.len() {
        return false;
    }

    let mut affirmed = false;
    for start in 0..=words.len() - status.len() {
        if words[start..start + status.len()] != status[..] {
            continue;
        }
        let negated = words[start.saturating_sub(2)..start]
            .iter()
            .any(|w| is_negation(w));
        if negated {
            return false;
        }
        affirmed = true;
    }
    affirmed
}

/// `YYYY-MM-DD` (or `YYYY/MM/DD`) dates in the text, normalised to dashes.
fn iso_dates(text: &str) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut dates = Vec::new();
    let mut i = 0;
    while i + 10 <= bytes.len() {
        let candidate = &bytes[i..i + 10];
        let sep = candidate[4];
        let shaped = (sep == b'-' || sep == b'/')
            && candidate[7] == sep
            && candidate
                .iter()
                .enumerate()
                .all(|(k, b)| k == 4 || k == 7 || b.is_ascii_digit());
        let bounded = (i == 0 || !bytes[i - 1].is_ascii_digit())
            && bytes.get(i + 10).map_or(true, |b| !b.is_ascii_digit());
        if shaped && bounded {
            let date: String = candidate.iter().map(|&b| b as char).collect();
            dates.push(date.replace('/', "-"));
            i += 10;
        } else {
            i += 1;
        }
    }
    dates
}

fn referenced_order_ids(text: &str) -> Vec<i64> {
    text.split('#')
        .skip(1)
        .filter_map(|part| {
            let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse().ok()
        })
        .collect()
}
