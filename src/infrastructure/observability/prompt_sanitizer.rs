const MAX_VISIBLE_LENGTH: usize = 100;

/// Sanitizes user prompt text for safe logging: trims, truncates, and redacts
/// obvious credential patterns.
pub fn sanitize_prompt(prompt: &str) -> String {
    let trimmed = prompt.trim();

    if trimmed.is_empty() {
        return String::from("[EMPTY]");
    }

    let truncated = if trimmed.len() > MAX_VISIBLE_LENGTH {
        let cut = trimmed
            .char_indices()
            .map(|(i, _)| i)
            .take_while(|&i| i <= MAX_VISIBLE_LENGTH)
            .last()
            .unwrap_or(0);
        format!("{}... ({} chars total)", &trimmed[..cut], trimmed.len())
    } else {
        trimmed.to_string()
    };

    redact_sensitive_patterns(&truncated)
}

fn redact_sensitive_patterns(text: &str) -> String {
    let patterns = [
        ("Bearer ", "Bearer [REDACTED]"),
        ("api_key=", "api_key=[REDACTED]"),
        ("password=", "password=[REDACTED]"),
        ("secret=", "secret=[REDACTED]"),
        ("token=", "token=[REDACTED]"),
    ];

    let mut result = text.to_string();
    for (pattern, replacement) in patterns {
        if let Some(idx) = result.find(pattern) {
            let end = result[idx + pattern.len()..]
                .find(|c: char| c.is_whitespace() || c == '&' || c == '"' || c == '\'')
                .map(|i| idx + pattern.len() + i)
                .unwrap_or(result.len());
            result = format!("{}{}{}", &result[..idx], replacement, &result[end..]);
        }
    }

    result
}
