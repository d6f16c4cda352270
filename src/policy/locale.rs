/// Reduce a locale tag to its lowercase primary language subtag.
///
/// `"ja-JP"` and `"JA_jp"` both become `"ja"`. Empty input stays empty so
/// callers can substitute their own default.
pub fn normalise_locale(locale: &str) -> String {
    locale
        .trim()
        .split(['-', '_', '.', '@'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}
