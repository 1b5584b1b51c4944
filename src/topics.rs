/// keyword-triggered topic tags, checked against the lowercased content
const KEYWORD_TOPICS: &[(&str, &[&str])] = &[
    ("cooling", &["cooling", "thermal", "hvac"]),
    ("sustainability", &["sustain", "environment", "green", "carbon"]),
    ("networking", &["network", "protocol", "tcp", "http"]),
    ("infrastructure", &["infrastructure", "server", "datacenter"]),
    ("ai-hardware", &["machine learning", "tpu", "gpu"]),
    ("security", &["security", "compliance", "encryption"]),
    ("efficiency", &["efficiency", "power", "energy", "optimization"]),
];

/// extra `t` tags worth attaching to a post based on what it talks about
pub fn suggest_topics(content: &str) -> Vec<&'static str> {
    let lower = content.to_lowercase();
    KEYWORD_TOPICS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(topic, _)| *topic)
        .collect()
}

/// `base` followed by whatever `extra` adds, each topic once
pub fn merge_topics<S: AsRef<str>>(base: &[S], extra: &[&str]) -> Vec<String> {
    let mut topics: Vec<String> = Vec::with_capacity(base.len() + extra.len());
    for topic in base.iter().map(|t| t.as_ref()).chain(extra.iter().copied()) {
        if !topics.iter().any(|t| t == topic) {
            topics.push(topic.to_string());
        }
    }
    topics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggest_topics() {
        assert!(suggest_topics("corn and cows").is_empty());
        assert_eq!(
            suggest_topics("The new DATACENTER needs so much Power for its HVAC"),
            vec!["cooling", "infrastructure", "efficiency"]
        );
        assert_eq!(suggest_topics("GPU farms"), vec!["ai-hardware"]);
    }

    #[test]
    fn test_merge_topics() {
        let merged = merge_topics(
            &["frederick-county", "agriculture"],
            &["agriculture", "cooling", "cooling"],
        );
        assert_eq!(merged, vec!["frederick-county", "agriculture", "cooling"]);
    }
}
