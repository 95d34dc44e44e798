use crate::chat::MessageBuffer;
use crate::context::UserContext;
use log::debug;

pub const PREFERENCE_KEY: &str = "preferences";

pub const PREFERENCE_KEYWORDS: [&str; 7] = [
    "prefer",
    "like",
    "want",
    "need",
    "looking for",
    "important",
    "priority",
];

/// Harvests every sentence that mentions a preference keyword.
///
/// Sentences are split on `.` only. Keywords are scanned in order and each
/// matching sentence is appended unless the exact string is already stored,
/// so existing entries are never removed.
pub fn extract(history: &MessageBuffer, mut context: UserContext) -> UserContext {
    let transcript = history.transcript().to_lowercase();
    let sentences: Vec<&str> = transcript.split('.').collect();

    for keyword in PREFERENCE_KEYWORDS {
        if !transcript.contains(keyword) {
            continue;
        }
        for sentence in &sentences {
            if !sentence.contains(keyword) {
                continue;
            }
            let preference = sentence.trim();
            let stored = context
                .user_preferences
                .entry(PREFERENCE_KEY.to_string())
                .or_default();
            if !stored.iter().any(|p| p == preference) {
                debug!("Recorded preference via '{}': {}", keyword, preference);
                stored.push(preference.to_string());
            }
        }
    }

    context
}

/// Records the researched product, then folds in preferences from the chat.
pub fn update_context(product: &str, history: &MessageBuffer, mut context: UserContext) -> UserContext {
    context.remember_product(product);
    extract(history, context)
}
