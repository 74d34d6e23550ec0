const HAS_ATTACHMENT: &str = "has:attachment";
const NEWER_THAN: &str = "newer_than:";

/// Add the attachment filter and the lookback window to a Gmail search query
/// unless the caller already supplied them.
///
/// Applying this twice gives the same query as applying it once.
pub fn augment_query(query: &str, lookback_days: u32) -> String {
    let mut augmented = query.trim().to_string();
    let lowered = augmented.to_lowercase();
    let tokens: Vec<&str> = lowered.split_whitespace().collect();

    let has_attachment = tokens.iter().any(|token| token.starts_with(HAS_ATTACHMENT));
    let has_newer_than = tokens.iter().any(|token| token.starts_with(NEWER_THAN));

    if !has_attachment {
        push_token(&mut augmented, HAS_ATTACHMENT);
    }
    if lookback_days > 0 && !has_newer_than {
        push_token(&mut augmented, &format!("{}{}d", NEWER_THAN, lookback_days));
    }
    augmented
}

fn push_token(query: &mut String, token: &str) {
    if !query.is_empty() {
        query.push(' ');
    }
    query.push_str(token);
}
