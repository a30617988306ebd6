//! Article-ID encoding (§4.9). Storage IDs are plain `i64`s; GReader clients
//! exchange them as zero-padded 16-char hex, optionally wrapped in the
//! `tag:google.com,2005:reader/item/<hex>` form.

const TAG_PREFIX: &str = "tag:google.com,2005:reader/item/";

pub fn encode_item_id(id: i64) -> String {
    format!("{TAG_PREFIX}{id:016x}")
}

/// Short form used by `stream/items/ids` responses, which hand back plain
/// hex without the `tag:` wrapper.
pub fn encode_item_id_hex(id: i64) -> String {
    format!("{id:016x}")
}

/// Accepts any of: 16-char zero-padded hex, the full `tag:` form, `0x`-prefixed
/// hex, or a plain decimal string.
pub fn parse_item_id(s: &str) -> Option<i64> {
    let s = s.strip_prefix(TAG_PREFIX).unwrap_or(s);
    if let Some(hex) = s.strip_prefix("0x") {
        return i64::from_str_radix(hex, 16).ok();
    }
    if s.len() == 16 && s.chars().all(|c| c.is_ascii_hexdigit()) {
        if let Ok(v) = i64::from_str_radix(s, 16) {
            return Some(v);
        }
    }
    s.parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_and_decodes_the_documented_example() {
        assert_eq!(encode_item_id(123), "tag:google.com,2005:reader/item/000000000000007b");
        assert_eq!(parse_item_id("000000000000007b"), Some(123));
        assert_eq!(parse_item_id("0x7b"), Some(123));
        assert_eq!(parse_item_id("123"), Some(123));
    }

    #[test]
    fn round_trips_through_full_tag_form() {
        for n in [0i64, 1, 42, 1 << 40, i64::MAX] {
            let encoded = encode_item_id(n);
            assert_eq!(parse_item_id(&encoded), Some(n));
        }
    }
}
