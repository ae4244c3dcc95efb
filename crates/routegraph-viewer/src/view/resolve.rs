use routegraph_core::{Node, NodeId};
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

// NFD, strip combining marks, lowercase, trim. Total: never fails, empty in
// gives empty out. "São Paulo " and "sao paulo" collapse to the same key.
pub fn normalize(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
        .trim()
        .to_string()
}

// Lookup table from the spellings a user may type to canonical node ids.
// Each node contributes its display title (plain and normalized), its id and
// its label, all lowercased. Later nodes win colliding keys; source datasets
// keep display names unique so collisions only happen between a node's own
// aliases.
#[derive(Debug, Default)]
pub struct NameIndex {
    by_key: HashMap<String, NodeId>,
    ids: HashSet<NodeId>,
}

impl NameIndex {
    pub fn build(nodes: &[Node]) -> Self {
        let mut by_key = HashMap::new();
        let mut ids = HashSet::new();
        for node in nodes {
            let mut keys: SmallVec<[String; 4]> = SmallVec::new();
            if let Some(pretty) = &node.original_title {
                keys.push(pretty.to_lowercase());
                keys.push(normalize(pretty));
            }
            keys.push(node.id.0.to_lowercase());
            keys.push(node.label.to_lowercase());
            for key in keys {
                if !key.is_empty() {
                    by_key.insert(key, node.id.clone());
                }
            }
            ids.insert(node.id.clone());
        }
        Self { by_key, ids }
    }

    // Tries the forgiving lookups first, then accepts input that already is a
    // canonical id verbatim. Whitespace-only input never resolves.
    pub fn resolve(&self, input: &str) -> Option<NodeId> {
        let lowered = input.trim().to_lowercase();
        if lowered.is_empty() {
            return None;
        }
        if let Some(id) = self.by_key.get(&lowered) {
            return Some(id.clone());
        }
        if let Some(id) = self.by_key.get(&normalize(input)) {
            return Some(id.clone());
        }
        let literal = NodeId(input.to_string());
        self.ids.contains(&literal).then_some(literal)
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, label: &str, original_title: Option<&str>) -> Node {
        Node {
            id: NodeId(id.to_string()),
            label: label.to_string(),
            original_title: original_title.map(str::to_string),
            value: None,
            group: None,
            title: None,
        }
    }

    fn sample_index() -> NameIndex {
        NameIndex::build(&[
            node("recife", "Recife", Some("Recife")),
            node("sao_paulo", "São Paulo", Some("São Paulo")),
            node("boa_viagem", "Boa Viagem", Some("Boa Viagem")),
        ])
    }

    #[test]
    fn normalize_strips_accents_case_and_whitespace() {
        assert_eq!(normalize("  São Paulo "), "sao paulo");
        assert_eq!(normalize("CONCEIÇÃO"), "conceicao");
        assert_eq!(normalize("recife"), "recife");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn resolve_is_insensitive_to_case_and_padding() {
        let index = sample_index();
        assert_eq!(index.resolve("Recife "), Some(NodeId("recife".into())));
        assert_eq!(index.resolve("rEcIfE"), Some(NodeId("recife".into())));
    }

    #[test]
    fn resolve_matches_accented_and_plain_spellings() {
        let index = sample_index();
        assert_eq!(index.resolve("são paulo"), Some(NodeId("sao_paulo".into())));
        assert_eq!(index.resolve("Sao Paulo"), Some(NodeId("sao_paulo".into())));
    }

    #[test]
    fn resolve_accepts_a_canonical_id_verbatim() {
        let index = sample_index();
        assert_eq!(index.resolve("boa_viagem"), Some(NodeId("boa_viagem".into())));
    }

    #[test]
    fn resolve_rejects_unknown_and_empty_input() {
        let index = sample_index();
        assert_eq!(index.resolve("Atlantis"), None);
        assert_eq!(index.resolve(""), None);
        assert_eq!(index.resolve("   "), None);
    }

    #[test]
    fn index_counts_nodes_not_keys() {
        let index = sample_index();
        assert_eq!(index.len(), 3);
        assert!(!index.is_empty());
        assert!(NameIndex::build(&[]).is_empty());
    }
}
