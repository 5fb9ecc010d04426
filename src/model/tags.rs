// Struct tag parsing: `json:"text-body" bson:"text_body" fire:"filterable,sortable"`

/// A parsed tag string: ordered `key:"value"` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructTag {
    pairs: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSyntaxError;

impl StructTag {
    pub fn parse(tag: &str) -> Result<Self, TagSyntaxError> {
        let mut pairs = Vec::new();
        let mut rest = tag.trim_start();

        while !rest.is_empty() {
            let colon = rest.find(':').ok_or(TagSyntaxError)?;
            let key = &rest[..colon];
            if key.is_empty() || key.chars().any(|c| c.is_whitespace() || c == '"') {
                return Err(TagSyntaxError);
            }

            rest = rest[colon + 1..].strip_prefix('"').ok_or(TagSyntaxError)?;

            let mut value = String::new();
            let mut chars = rest.char_indices();
            let end = loop {
                match chars.next() {
                    Some((_, '\\')) => match chars.next() {
                        Some((_, c)) => value.push(c),
                        None => return Err(TagSyntaxError),
                    },
                    Some((i, '"')) => break i,
                    Some((_, c)) => value.push(c),
                    None => return Err(TagSyntaxError),
                }
            };

            pairs.push((key.to_string(), value));
            rest = &rest[end + 1..];

            // Pairs are separated by whitespace
            if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
                return Err(TagSyntaxError);
            }
            rest = rest.trim_start();
        }

        Ok(Self { pairs })
    }

    /// First value for `key`, like Go's `StructTag.Lookup`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Comma separated items of `key`, trimmed, empties dropped.
    pub fn items(&self, key: &str) -> Vec<&str> {
        self.get(key)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The name part of a `json`/`bson` style value (`"name,omitempty"`).
    pub fn name(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multiple_pairs() {
        let tag = StructTag::parse(r#"json:"text-body" bson:"text_body" fire:"filterable,sortable""#)
            .unwrap();
        assert_eq!(tag.get("json"), Some("text-body"));
        assert_eq!(tag.get("bson"), Some("text_body"));
        assert_eq!(tag.items("fire"), vec!["filterable", "sortable"]);
        assert_eq!(tag.get("valid"), None);
    }

    #[test]
    fn name_ignores_options() {
        let tag = StructTag::parse(r#"json:",omitempty" bson:"title,omitempty""#).unwrap();
        assert_eq!(tag.name("json"), None);
        assert_eq!(tag.name("bson"), Some("title"));
    }

    #[test]
    fn empty_tag_is_valid() {
        assert_eq!(StructTag::parse("").unwrap(), StructTag::default());
        assert_eq!(StructTag::parse("   ").unwrap(), StructTag::default());
    }

    #[test]
    fn rejects_malformed_syntax() {
        assert!(StructTag::parse("json").is_err());
        assert!(StructTag::parse("json:title").is_err());
        assert!(StructTag::parse(r#"json:"title"#).is_err());
        assert!(StructTag::parse(r#"json:"a"bson:"b""#).is_err());
        assert!(StructTag::parse(r#":"a""#).is_err());
    }

    #[test]
    fn supports_escaped_quotes() {
        let tag = StructTag::parse(r#"doc:"say \"hi\"""#).unwrap();
        assert_eq!(tag.get("doc"), Some("say \"hi\""));
    }
}
