/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

/// Find the first balanced `{ ... }` object in a model reply.
///
/// Models wrap JSON in prose or markdown fences often enough that parsing the
/// whole reply is useless. Braces inside string literals are ignored so a
/// `"}"` in a DM draft doesn't end the object early. Returns `None` when no
/// opening brace ever closes.
pub fn extract_json_object(response: &str) -> Option<&str> {
    let bytes = response.as_bytes();
    let mut search_from = 0;

    while let Some(offset) = response[search_from..].find('{') {
        let start = search_from + offset;
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;

        for (i, &b) in bytes.iter().enumerate().skip(start) {
            if in_string {
                match b {
                    _ if escaped => escaped = false,
                    b'\\' => escaped = true,
                    b'"' => in_string = false,
                    _ => {}
                }
                continue;
            }
            match b {
                b'"' => in_string = true,
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(&response[start..=i]);
                    }
                }
                _ => {}
            }
        }

        search_from = start + 1;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_backs_off_to_char_start() {
        // "台北" is 6 bytes; cutting at 4 would split the second character.
        assert_eq!(truncate_to_char_boundary("台北美髮", 4), "台");
        assert_eq!(truncate_to_char_boundary("salon", 3), "sal");
        assert_eq!(truncate_to_char_boundary("salon", 50), "salon");
    }

    #[test]
    fn test_extract_json_from_fenced_reply() {
        let reply = "Here is my verdict:\n```json\n{\"score\": 8, \"reasons\": [\"owner\"]}\n```\nThanks!";
        assert_eq!(
            extract_json_object(reply),
            Some("{\"score\": 8, \"reasons\": [\"owner\"]}")
        );
    }

    #[test]
    fn test_extract_json_nested_objects() {
        let reply = r#"{"a": {"b": 1}, "c": 2} trailing {"d": 3}"#;
        assert_eq!(extract_json_object(reply), Some(r#"{"a": {"b": 1}, "c": 2}"#));
    }

    #[test]
    fn test_extract_json_ignores_braces_in_strings() {
        let reply = r#"{"content": "hi :} there \"{\"", "n": 1}"#;
        assert_eq!(extract_json_object(reply), Some(reply));
    }

    #[test]
    fn test_extract_json_none_without_object() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("{ never closed"), None);
        assert_eq!(extract_json_object(""), None);
    }
}
