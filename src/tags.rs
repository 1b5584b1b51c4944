/// a single tag (array of strings)
pub type Tag = Vec<String>;

/// collection of tags
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Tags(pub Vec<Tag>);

impl Tags {
    /// find the first tag with the given key that has at least one value
    pub fn find(&self, key: &str) -> Option<&Tag> {
        self.0.iter().find(|tag| tag.len() >= 2 && tag[0] == key)
    }

    /// find all tags with the given key that have at least one value
    pub fn find_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Tag> {
        self.0
            .iter()
            .filter(move |tag| tag.len() >= 2 && tag[0] == key)
    }

    /// find tag with specific key and value
    pub fn find_with_value(&self, key: &str, value: &str) -> Option<&Tag> {
        self.0
            .iter()
            .find(|tag| tag.len() >= 2 && tag[0] == key && tag[1] == value)
    }

    /// check if tags contain any of the given values for a tag name
    pub fn contains_any(&self, tag_name: &str, values: &[String]) -> bool {
        self.find_all(tag_name).any(|tag| values.contains(&tag[1]))
    }

    /// all `t` values
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.find_all("t").map(|tag| tag[1].as_str())
    }

    /// the first `e` value, i.e. the event this one replies to
    pub fn reply_to(&self) -> Option<&str> {
        self.find("e").map(|tag| tag[1].as_str())
    }

    /// whether any `e` tag points exactly at `id`
    pub fn references(&self, id: &str) -> bool {
        self.find_with_value("e", id).is_some()
    }

    pub fn subject(&self) -> Option<&str> {
        self.find("subject").map(|tag| tag[1].as_str())
    }

    /// all `p` values
    pub fn recipients(&self) -> impl Iterator<Item = &str> {
        self.find_all("p").map(|tag| tag[1].as_str())
    }

    pub fn push(&mut self, key: &str, value: impl Into<String>) {
        self.0.push(vec![key.to_string(), value.into()]);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.0.iter()
    }
}

impl IntoIterator for Tags {
    type Item = Tag;
    type IntoIter = std::vec::IntoIter<Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl std::fmt::Display for Tags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => write!(f, "{json}"),
            Err(err) => write!(f, "Tags({err})"),
        }
    }
}

impl From<Vec<Tag>> for Tags {
    fn from(tags: Vec<Tag>) -> Self {
        Self(tags)
    }
}

impl From<Tags> for Vec<Tag> {
    fn from(tags: Tags) -> Self {
        tags.0
    }
}
