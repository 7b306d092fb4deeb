use confscope_xml::{documents_equal, Attribute, Document, Fragment, FragmentNode, Match, Query};
use proptest::prelude::*;

const NAMES: &[&str] = &["add", "item", "section", "value", "node"];

fn name_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(NAMES).prop_map(str::to_string)
}

fn attributes_strategy() -> impl Strategy<Value = Vec<Attribute>> {
    prop::collection::btree_map(
        prop::sample::select(&["key", "value", "id", "name"][..]),
        "[a-z0-9 &<>\"']{0,8}",
        0..4,
    )
    .prop_map(|map| {
        map.into_iter()
            .map(|(name, value)| Attribute::new(name, value))
            .collect()
    })
}

/// Adjacent text nodes serialize as one; merge them so generated trees
/// survive a round trip.
fn merge_adjacent_text(nodes: Vec<FragmentNode>) -> Vec<FragmentNode> {
    let mut out: Vec<FragmentNode> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if let FragmentNode::Text(next) = &node {
            if let Some(FragmentNode::Text(prev)) = out.last_mut() {
                prev.push_str(next);
                continue;
            }
        }
        out.push(node);
    }
    out
}

fn node_strategy() -> impl Strategy<Value = FragmentNode> {
    let leaf = prop_oneof![
        (name_strategy(), attributes_strategy()).prop_map(|(name, attributes)| {
            FragmentNode::Element {
                name,
                attributes,
                children: Vec::new(),
            }
        }),
        "[a-z<>&]{1,6}".prop_map(FragmentNode::Text),
    ];
    leaf.prop_recursive(4, 32, 4, |inner| {
        (
            name_strategy(),
            attributes_strategy(),
            prop::collection::vec(inner, 0..4),
        )
            .prop_map(|(name, attributes, children)| FragmentNode::Element {
                name,
                attributes,
                children: merge_adjacent_text(children),
            })
    })
}

fn document_strategy() -> impl Strategy<Value = Document> {
    prop::collection::vec(node_strategy(), 0..5).prop_map(|children| {
        let mut doc = Document::new();
        let root = doc.create_element("configuration");
        let top = doc.root();
        doc.append_child(top, root);
        doc.append_fragment(root, &Fragment::new(merge_adjacent_text(children)));
        doc
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn serialized_documents_reparse_equal(doc in document_strategy(), indent in any::<bool>()) {
        let text = doc.to_xml_string(indent).unwrap();
        let reparsed = Document::parse(&text).unwrap();
        prop_assert!(documents_equal(&doc, &reparsed), "{}", text);
    }

    #[test]
    fn attribute_order_never_matters(doc in document_strategy()) {
        let mut reversed = doc.clone();
        for id in reversed.descendants(reversed.root()) {
            let attributes: Vec<Attribute> = reversed.attributes(id).iter().rev().cloned().collect();
            for attr in &attributes {
                reversed.remove_attribute(id, &attr.name).unwrap();
            }
            for attr in attributes {
                reversed.set_attribute(id, attr.name, attr.value).unwrap();
            }
        }
        prop_assert!(documents_equal(&doc, &reversed));
    }

    #[test]
    fn descendant_query_finds_every_named_element(doc in document_strategy(), name in name_strategy()) {
        let context = doc.document_element().unwrap();
        let query = Query::parse(&format!("//{name}")).unwrap();
        let found: Vec<_> = query.select(&doc, context).iter().filter_map(Match::as_node).collect();
        let expected: Vec<_> = doc
            .descendants(doc.root())
            .into_iter()
            .filter(|id| doc.name(*id) == Some(name.as_str()))
            .collect();
        prop_assert_eq!(found, expected);
    }

    #[test]
    fn attribute_query_agrees_with_lookup(doc in document_strategy()) {
        let context = doc.document_element().unwrap();
        let query = Query::parse("//*[@key]/@key").unwrap();
        for hit in query.select(&doc, context) {
            match hit {
                Match::Attribute { element, name } => {
                    prop_assert_eq!(name.as_str(), "key");
                    prop_assert!(doc.attribute(element, "key").is_some());
                }
                Match::Node(id) => prop_assert!(false, "unexpected node {}", id),
            }
        }
    }
}
