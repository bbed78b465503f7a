pub const DEFAULT_AVATAR_BASE_URL: &str = "https://avatar.iran.liara.run/public/";

/// Maps a name onto 1..=100 by summing its UTF-16 code units.
pub fn avatar_index(name: &str) -> u32 {
    let checksum: u64 = name.encode_utf16().map(u64::from).sum();
    (checksum % 100) as u32 + 1
}

pub fn avatar_url(name: &str) -> String {
    avatar_url_with_base(DEFAULT_AVATAR_BASE_URL, name)
}

pub fn avatar_url_with_base(base_url: &str, name: &str) -> String {
    format!("{}{}", base_url, avatar_index(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_same_avatar() {
        assert_eq!(avatar_url("Ann"), avatar_url("Ann"));
        assert_eq!(avatar_url_with_base("http://img/", "Bo"), avatar_url_with_base("http://img/", "Bo"));
    }

    #[test]
    fn index_matches_char_code_sum() {
        // 'A' 65 + 'n' 110 + 'n' 110 = 285
        assert_eq!(avatar_index("Ann"), 86);
        assert_eq!(avatar_index(""), 1);
        // 'd' is 100, wraps to the bottom of the range
        assert_eq!(avatar_index("d"), 1);
        assert_eq!(avatar_index("c"), 100);
    }

    #[test]
    fn url_has_numeric_suffix_in_range() {
        for name in ["Ann", "Bo", "planner", "研究员", "🤖 bot", ""] {
            let url = avatar_url(name);
            let suffix = url.strip_prefix(DEFAULT_AVATAR_BASE_URL).unwrap();
            let n: u32 = suffix.parse().unwrap();
            assert!((1..=100).contains(&n), "{} -> {}", name, n);
        }
    }
}
