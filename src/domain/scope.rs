use serde::Serialize;

/// The tenant a request operates in: a municipality and one of its namespaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scope {
    pub municipality_id: String,
    pub namespace: String,
}

impl Scope {
    pub fn parse(municipality_id: &str, namespace: &str) -> Option<Self> {
        let municipality_ok = (1..=8).contains(&municipality_id.len())
            && municipality_id.chars().all(|c| c.is_ascii_digit());
        let namespace_ok = (1..=32).contains(&namespace.len())
            && namespace
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

        if municipality_ok && namespace_ok {
            Some(Self {
                municipality_id: municipality_id.to_string(),
                namespace: namespace.to_string(),
            })
        } else {
            None
        }
    }
}
