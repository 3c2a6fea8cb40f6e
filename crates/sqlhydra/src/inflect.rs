//! English singular/plural inflection for table names.
//!
//! Covers the regular suffix rules plus a short irregular list; enough to derive
//! `user_id` from `users` and `categories` from `category`.

const IRREGULAR: &[(&str, &str)] = &[("person", "people"), ("child", "children")];

const UNCOUNTABLE: &[&str] = &["data", "information", "equipment", "series", "species", "news"];

/// Plural form of `word`.
pub fn plural(word: &str) -> String {
    if word.is_empty() || UNCOUNTABLE.contains(&word) {
        return word.to_string();
    }
    for (singular, plural) in IRREGULAR {
        if let Some(stem) = word.strip_suffix(singular) {
            return format!("{stem}{plural}");
        }
        if word.ends_with(plural) {
            return word.to_string();
        }
    }

    if let Some(stem) = word.strip_suffix('y') {
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            return format!("{stem}ies");
        }
    }
    if ["ss", "us", "x", "z", "ch", "sh"].iter().any(|s| word.ends_with(s)) {
        return format!("{word}es");
    }
    // Already plural.
    if word.ends_with('s') {
        return word.to_string();
    }
    format!("{word}s")
}

/// Singular form of `word`.
pub fn singular(word: &str) -> String {
    if word.is_empty() || UNCOUNTABLE.contains(&word) {
        return word.to_string();
    }
    for (singular, plural) in IRREGULAR {
        if let Some(stem) = word.strip_suffix(plural) {
            return format!("{stem}{singular}");
        }
    }

    if let Some(stem) = word.strip_suffix("ies") {
        return format!("{stem}y");
    }
    for suffix in ["sses", "xes", "ches", "shes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    if word.ends_with("ss") || word.ends_with("us") || word.ends_with("is") {
        return word.to_string();
    }
    match word.strip_suffix('s') {
        Some(stem) => stem.to_string(),
        None => word.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singularizes_table_names() {
        assert_eq!(singular("posts"), "post");
        assert_eq!(singular("users"), "user");
        assert_eq!(singular("categories"), "category");
        assert_eq!(singular("boxes"), "box");
        assert_eq!(singular("people"), "person");
        assert_eq!(singular("addresses"), "address");
        assert_eq!(singular("status"), "status");
        assert_eq!(singular("post"), "post");
    }

    #[test]
    fn pluralizes_table_names() {
        assert_eq!(plural("post"), "posts");
        assert_eq!(plural("category"), "categories");
        assert_eq!(plural("day"), "days");
        assert_eq!(plural("box"), "boxes");
        assert_eq!(plural("branch"), "branches");
        assert_eq!(plural("person"), "people");
        assert_eq!(plural("people"), "people");
        assert_eq!(plural("posts"), "posts");
        assert_eq!(plural("address"), "addresses");
        assert_eq!(plural("status"), "statuses");
    }

    #[test]
    fn compound_names_keep_prefix() {
        assert_eq!(singular("sales_people"), "sales_person");
        assert_eq!(plural("post_tag"), "post_tags");
    }
}
