// Output — file exports and terminal display.

pub mod export;
pub mod terminal;

/// Shorten text to `max_chars` characters for table cells, adding "..." when cut.
/// Counts chars, not bytes, so accented clinical terms never split mid-character.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let char_count = text.chars().count();
    if char_count <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("ventilator", 4), "vent...");
        assert_eq!(truncate_chars("café au lait", 4), "café...");
    }
}
