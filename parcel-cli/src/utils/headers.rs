use tracing::warn;

/// Split a header given as "Name: Value" into its trimmed name and value.
pub fn parse_header(header_str: &str) -> Option<(&str, &str)> {
    let Some((name, value)) = header_str.split_once(':') else {
        warn!("Invalid header format: '{}'. Expected 'Name: Value'", header_str);
        return None;
    };

    let name = name.trim();
    if name.is_empty() {
        warn!("Invalid header name in '{}'", header_str);
        return None;
    }

    Some((name, value.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("Referer: https://example.com/a:b"),
            Some(("Referer", "https://example.com/a:b"))
        );
        assert_eq!(parse_header("  X-Token :abc "), Some(("X-Token", "abc")));
        assert_eq!(parse_header("no colon"), None);
        assert_eq!(parse_header(": value"), None);
    }
}
