/// Lowercase, hyphen-separated ASCII form of `name`. Non-ASCII letters are transliterated
/// first, then every run of other characters becomes a single `-`, with none at either end.
pub fn slugify(name: &str) -> String {
    deunicode::deunicode(name)
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
