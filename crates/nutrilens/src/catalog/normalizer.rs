use std::collections::BTreeSet;

/// Splits a comma- or pipe-separated tag list into lowercase tags.
pub(crate) fn split_tags(value: &str) -> BTreeSet<String> {
    value
        .split([',', '|'])
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// Drops invisible characters and collapses runs of whitespace.
pub(crate) fn normalize_text(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_accept_both_separators() {
        let tags = split_tags("en:Milk| en:soybeans ,,en:gluten");
        let expected: BTreeSet<String> = ["en:gluten", "en:milk", "en:soybeans"]
            .into_iter()
            .map(str::to_string)
            .collect();
        assert_eq!(tags, expected);
    }

    #[test]
    fn text_loses_bom_and_extra_spaces() {
        assert_eq!(normalize_text("\u{feff}Oat   flakes\n"), "Oat flakes");
    }
}
