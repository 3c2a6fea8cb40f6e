//! Per-builder table alias tracking.

/// Split `"users AS u"` or `"users u"` into the table and its explicit alias.
pub(crate) fn split_alias(spec: &str) -> (&str, Option<&str>) {
    let spec = spec.trim();
    let mut parts = spec.split_whitespace();
    let table = parts.next().unwrap_or_default();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(kw), Some(alias), None) if kw.eq_ignore_ascii_case("as") => (table, Some(alias)),
        (Some(alias), None, None) => (table, Some(alias)),
        _ => (table, None),
    }
}

fn first_letter(table: &str) -> char {
    // Schema-qualified names alias by the table part.
    let name = table.rsplit('.').next().unwrap_or(table);
    name.chars()
        .find(|c| c.is_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .unwrap_or('t')
}

/// Table → alias assignments, in registration order.
///
/// Generated aliases are `<first letter><n>` where `n` counts the aliases already taken with
/// that letter, so `users` then `uploads` become `u0` and `u1`.
#[derive(Clone, Debug, Default)]
pub(crate) struct AliasMap {
    entries: Vec<(String, String)>,
}

impl AliasMap {
    /// Register a table reference and return its alias.
    ///
    /// An explicit alias in `spec` is kept verbatim. A table that is already registered keeps
    /// its first alias.
    pub(crate) fn register(&mut self, spec: &str) -> String {
        let (table, explicit) = split_alias(spec);
        if let Some(alias) = explicit {
            if self.get(table) != Some(alias) {
                self.entries.push((table.to_string(), alias.to_string()));
            }
            return alias.to_string();
        }
        if let Some(alias) = self.get(table) {
            return alias.to_string();
        }

        let letter = first_letter(table);
        let mut index = self
            .entries
            .iter()
            .filter(|(_, alias)| {
                alias
                    .strip_prefix(letter)
                    .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
            })
            .count();
        let alias = loop {
            let candidate = format!("{letter}{index}");
            if !self.entries.iter().any(|(_, a)| *a == candidate) {
                break candidate;
            }
            index += 1;
        };
        self.entries.push((table.to_string(), alias.clone()));
        alias
    }

    /// Alias registered for `table`, if any.
    pub(crate) fn get(&self, table: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(t, _)| t == table)
            .map(|(_, a)| a.as_str())
    }

    /// Whether a table starting with the same letter as `table` (but not `table` itself) is
    /// among `referenced`.
    pub(crate) fn collides<'a>(table: &str, referenced: impl IntoIterator<Item = &'a str>) -> bool {
        let letter = first_letter(table);
        referenced
            .into_iter()
            .any(|other| other != table && first_letter(other) == letter)
    }

    /// FROM/JOIN text for a table reference.
    pub(crate) fn render(&self, spec: &str) -> String {
        let (table, explicit) = split_alias(spec);
        if explicit.is_some() {
            return spec.trim().to_string();
        }
        match self.get(table) {
            Some(alias) if alias != table => format!("{table} AS {alias}"),
            _ => table.to_string(),
        }
    }

    /// Rewrite `table.` qualifiers in `sql` to their generated aliases.
    pub(crate) fn qualify(&self, sql: &str) -> String {
        let mut out = sql.to_string();
        for (table, alias) in &self.entries {
            if table != alias {
                out = replace_qualifier(&out, table, alias);
            }
        }
        out
    }
}

fn replace_qualifier(sql: &str, table: &str, alias: &str) -> String {
    let needle = format!("{table}.");
    let mut out = String::with_capacity(sql.len());
    let mut last = 0;
    for (idx, _) in sql.match_indices(&needle) {
        let at_boundary = sql[..idx]
            .chars()
            .next_back()
            .is_none_or(|c| !(c.is_alphanumeric() || c == '_' || c == '.'));
        if at_boundary && idx >= last {
            out.push_str(&sql[last..idx]);
            out.push_str(alias);
            out.push('.');
            last = idx + needle.len();
        }
    }
    out.push_str(&sql[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_letter_gets_distinct_aliases() {
        let mut aliases = AliasMap::default();
        assert_eq!(aliases.register("users"), "u0");
        assert_eq!(aliases.register("uploads"), "u1");
        assert_eq!(aliases.register("users"), "u0");
        assert_eq!(aliases.register("posts"), "p0");
    }

    #[test]
    fn explicit_alias_kept_verbatim() {
        let mut aliases = AliasMap::default();
        assert_eq!(aliases.register("users AS usr"), "usr");
        assert_eq!(aliases.get("users"), Some("usr"));
        assert_eq!(aliases.render("users AS usr"), "users AS usr");
        assert_eq!(aliases.register("uploads"), "u0");
        assert_eq!(split_alias("orders o"), ("orders", Some("o")));
    }

    #[test]
    fn generated_alias_skips_taken_names() {
        let mut aliases = AliasMap::default();
        aliases.register("users AS u1");
        assert_eq!(aliases.register("uploads"), "u2");
    }

    #[test]
    fn qualifiers_rewritten_on_boundaries() {
        let mut aliases = AliasMap::default();
        aliases.register("users");
        aliases.register("uploads");
        assert_eq!(
            aliases.qualify("users.id = uploads.user_id AND app_users.id = 1"),
            "u0.id = u1.user_id AND app_users.id = 1"
        );
        assert_eq!(aliases.render("uploads"), "uploads AS u1");
    }

    #[test]
    fn collision_detection() {
        assert!(AliasMap::collides("uploads", ["users"]));
        assert!(!AliasMap::collides("posts", ["users"]));
        assert!(!AliasMap::collides("users", ["users"]));
    }
}
