/// Format bytes as space-separated uppercase hex pairs (`[0x1B, 0x40]` → `"1B 40"`).
pub fn format_hex_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{b:02X}"));
    }
    out
}

/// Parse a whitespace-separated list of hex bytes.
///
/// Each item is one or two hex digits with an optional `0x` prefix, so
/// `"1B 40"`, `"0x1b 0x40"` and `"1b\t40"` all parse to `[0x1B, 0x40]`.
pub fn parse_hex_bytes(text: &str) -> Result<Vec<u8>, String> {
    text.split_whitespace()
        .map(|item| {
            let digits = item
                .strip_prefix("0x")
                .or_else(|| item.strip_prefix("0X"))
                .unwrap_or(item);
            if digits.is_empty() || digits.len() > 2 {
                return Err(format!("invalid hex byte {item:?} (expected 1-2 hex digits)"));
            }
            u8::from_str_radix(digits, 16)
                .map_err(|_| format!("invalid hex byte {item:?} (expected 1-2 hex digits)"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_pairs() {
        assert_eq!(format_hex_bytes(&[0x1D, 0x6B, 0x04]), "1D 6B 04");
        assert_eq!(format_hex_bytes(&[]), "");
    }

    #[test]
    fn parse_accepts_prefixes_and_case() {
        assert_eq!(parse_hex_bytes("0x1b 40\tA").unwrap(), vec![0x1B, 0x40, 0x0A]);
    }

    #[test]
    fn parse_rejects_wide_items() {
        assert!(parse_hex_bytes("1B40").is_err());
        assert!(parse_hex_bytes("0x").is_err());
    }
}
