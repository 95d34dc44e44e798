use crate::chat::ChatMessage;
use std::collections::BTreeMap;

pub const COMPARISON_TEMPLATE: &str = r#"
You are a helpful AI assistant specialized in product research and comparisons for business professionals.
Your goal is to provide brief, actionable insights about products and comparisons between them.

Only use the vector database if the user's prompt explicitly refers to a product found in it. Avoid unnecessary retrievals.

If the user has mentioned fewer than two products, politely ask them to provide at least two products for comparison.
Don't output lines like "I've researched".
Respond to simple user interactions like hi, bye, etc. Remember the last 5 messages received and generated and answer to
follow-up messages when asked.

Product being researched: {product}

SEARCH RESULTS:
{search_results}

ADDITIONAL CONTEXT:
Chat history: {chat_history}
Previously researched products: {previous_products}
Known user preferences: {user_preferences}
Relevant vector database info (if applicable): {vector_db_results}

Your output must follow these rules strictly:
- Output a table with 5 rows, each comparing the two products across a specific aspect.
- The first row must be the header: "Aspect | Product 1 | Product 2" with `|` as the delimiter.
- Product 1 and Product 2 must be the names of the two products being compared (e.g., iPhone 11 and iPhone 12).
- Each subsequent row must contain exactly three segments separated by `|` with no extra spaces.
- Each row must be on a new line.
- After the table, add a marker "SUMMARY:" followed by a 2-line summary on separate lines.
- Do NOT use markdown, bullet points, or any special formatting beyond the `|` delimiter.
- Keep each cell content concise (under 50 characters).
- Write in plain text, structured for easy parsing.

Use these exact aspect labels for the table rows:
1. Key features
2. Comparison
3. Pricing
4. Strengths
5. Suitability

Example output format:
Aspect | iPhone 11 | iPhone 12
Key features | A13, 10hr play | A14, OLED, 11hr
Comparison | Similar to 11 | Beats flagships
Pricing | Budget-friendly | Higher value
Strengths | Good value | Better battery
Suitability | Cost-focused | Power-focused
SUMMARY:
iPhone 12 suits power users.
iPhone 11 fits budget needs.

Be clear and business-oriented. Avoid unnecessary technical jargon.
"#;

/// Values substituted into `COMPARISON_TEMPLATE`.
#[derive(Debug, Clone)]
pub struct PromptInputs<'a> {
    pub product: &'a str,
    pub search_results: &'a str,
    pub chat_history: &'a [ChatMessage],
    pub previous_products: &'a [String],
    pub user_preferences: &'a BTreeMap<String, Vec<String>>,
    pub vector_db_results: &'a str,
}

impl PromptInputs<'_> {
    pub fn render(&self) -> String {
        let chat_history = serde_json::to_string(self.chat_history).unwrap_or_default();
        let previous_products = serde_json::to_string(self.previous_products).unwrap_or_default();
        let user_preferences = serde_json::to_string(self.user_preferences).unwrap_or_default();

        fill(
            COMPARISON_TEMPLATE,
            &[
                ("product", self.product),
                ("search_results", self.search_results),
                ("chat_history", chat_history.as_str()),
                ("previous_products", previous_products.as_str()),
                ("user_preferences", user_preferences.as_str()),
                ("vector_db_results", self.vector_db_results),
            ],
        )
    }
}

/// Single pass over `template`; substituted text is never re-scanned and
/// unknown `{...}` spans are left as they are.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match replaced {
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
    use crate::chat::Role;

    #[test]
    fn fill_substitutes_known_names_once() {
        let out = fill(
            "a={a} b={b} c={c} {",
            &[("a", "{b}"), ("b", "two")],
        );
        assert_eq!(out, "a={b} b=two c={c} {");
    }

    #[test]
    fn render_includes_every_input() {
        let history = vec![ChatMessage::new(Role::User, "I prefer OLED.")];
        let previous = vec!["iPhone 11".to_string()];
        let mut prefs = BTreeMap::new();
        prefs.insert("preferences".to_string(), vec!["i prefer oled".to_string()]);

        let prompt = PromptInputs {
            product: "iPhone 12",
            search_results: "A14 Bionic",
            chat_history: &history,
            previous_products: &previous,
            user_preferences: &prefs,
            vector_db_results: "Mock result for iPhone 12",
        }
        .render();

        assert!(prompt.contains("Product being researched: iPhone 12\n"));
        assert!(prompt.contains("SEARCH RESULTS:\nA14 Bionic\n"));
        assert!(prompt.contains(r#"Chat history: [{"role":"user","content":"I prefer OLED."}]"#));
        assert!(prompt.contains(r#"Previously researched products: ["iPhone 11"]"#));
        assert!(prompt.contains(r#"Known user preferences: {"preferences":["i prefer oled"]}"#));
        assert!(prompt.contains("(if applicable): Mock result for iPhone 12"));
        assert!(!prompt.contains("{product}"));
    }
}
