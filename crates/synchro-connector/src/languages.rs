//! Fixed language-tag mapping (§4.10, Open Question 3): the remote model
//! speaks its own three-letter codes, unrelated to the BCP-47-ish tags carried
//! on `StreamConfig::language_tag`. Treated as small injected configuration,
//! not business logic - extend the table, don't branch on it.

/// `(our_tag, remote_tag)` pairs the connector accepts as `lang_to`.
const LANGUAGES_MAP: &[(&str, &str)] = &[("en", "eng"), ("ru", "rus")];

/// Looks up the remote model's code for one of our language tags.
#[must_use]
pub fn to_remote_tag(lang: &str) -> Option<&'static str> {
    LANGUAGES_MAP
        .iter()
        .find(|(ours, _)| *ours == lang)
        .map(|(_, remote)| *remote)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_language_resolves() {
        assert_eq!(to_remote_tag("en"), Some("eng"));
        assert_eq!(to_remote_tag("ru"), Some("rus"));
    }

    #[test]
    fn unknown_language_is_none() {
        assert_eq!(to_remote_tag("fr"), None);
    }
}
