use super::*;

const SAMPLE: &str = r#"<configuration>
  <appSettings>
    <add key="mode" value="debug"/>
    <add key="retries" value="3"/>
    <add key="timeout" value="30"/>
  </appSettings>
  <connectionStrings>
    <add name="main" connectionString="Server=dev"/>
  </connectionStrings>
  <!-- trailing -->
  <notes>first<b>bold</b></notes>
</configuration>"#;

fn sample() -> Document {
    Document::parse(SAMPLE).unwrap()
}

fn select(doc: &Document, query: &str) -> Vec<Match> {
    let context = doc.document_element().unwrap();
    Query::parse(query).unwrap().select(doc, context)
}

fn names(doc: &Document, matches: &[Match]) -> Vec<String> {
    matches
        .iter()
        .map(|m| match m {
            Match::Node(id) => doc
                .attribute(*id, "key")
                .or_else(|| doc.attribute(*id, "name"))
                .or_else(|| doc.name(*id))
                .unwrap_or("?")
                .to_string(),
            Match::Attribute { name, .. } => format!("@{name}"),
        })
        .collect()
}

#[test]
fn absolute_and_descendant_paths() {
    let doc = sample();
    let hits = select(&doc, "/configuration/appSettings/add");
    assert_eq!(names(&doc, &hits), ["mode", "retries", "timeout"]);
    let hits = select(&doc, "//add");
    assert_eq!(names(&doc, &hits), ["mode", "retries", "timeout", "main"]);
}

#[test]
fn relative_paths_start_at_the_context_element() {
    let doc = sample();
    let hits = select(&doc, "appSettings/add[1]");
    assert_eq!(names(&doc, &hits), ["mode"]);
    let hits = select(&doc, ".");
    assert_eq!(names(&doc, &hits), ["configuration"]);
}

#[test]
fn attribute_predicates() {
    let doc = sample();
    let hits = select(&doc, "//add[@key='retries']");
    assert_eq!(names(&doc, &hits), ["retries"]);
    let hits = select(&doc, "//add[@key!='retries' and @value]");
    assert_eq!(names(&doc, &hits), ["mode", "timeout"]);
    let hits = select(&doc, "//add[@value > 5]");
    assert_eq!(names(&doc, &hits), ["timeout"]);
}

#[test]
fn attribute_selection() {
    let doc = sample();
    let hits = select(&doc, "//add[@key='mode']/@value");
    assert_eq!(hits.len(), 1);
    match &hits[0] {
        Match::Attribute { element, name } => {
            assert_eq!(name, "value");
            assert_eq!(doc.attribute(*element, name), Some("debug"));
        }
        other => panic!("expected attribute, got {other:?}"),
    }
    let all = select(&doc, "//add[@key='mode']/@*");
    assert_eq!(names(&doc, &all), ["@key", "@value"]);
}

#[test]
fn positional_functions() {
    let doc = sample();
    assert_eq!(names(&doc, &select(&doc, "//appSettings/add[last()]")), ["timeout"]);
    assert_eq!(
        names(&doc, &select(&doc, "//appSettings/add[position() > 1]")),
        ["retries", "timeout"]
    );
    assert_eq!(
        names(&doc, &select(&doc, "*[count(add) = 3]")),
        ["appSettings"]
    );
}

#[test]
fn string_functions() {
    let doc = sample();
    let hits = select(&doc, "//add[starts-with(@key, 'ti') or contains(@connectionString, 'dev')]");
    assert_eq!(names(&doc, &hits), ["timeout", "main"]);
    let hits = select(&doc, "//add[not(@name)]");
    assert_eq!(hits.len(), 3);
}

#[test]
fn unions_are_in_document_order_without_duplicates() {
    let doc = sample();
    let hits = select(&doc, "//connectionStrings/add | //appSettings/add[1] | //add[@name]");
    assert_eq!(names(&doc, &hits), ["mode", "main"]);
}

#[test]
fn text_and_comment_tests() {
    let doc = sample();
    let text = select(&doc, "notes/text()");
    assert_eq!(text.len(), 1);
    assert_eq!(doc.text_content(text[0].as_node().unwrap()), "first");
    assert_eq!(select(&doc, "comment()").len(), 1);
    assert_eq!(select(&doc, "notes/node()").len(), 2);
    assert_eq!(names(&doc, &select(&doc, "notes/b/..")), ["notes"]);
}

#[test]
fn element_string_value_comparison() {
    let doc = sample();
    assert_eq!(names(&doc, &select(&doc, "*[b = 'bold']")), ["notes"]);
    assert_eq!(names(&doc, &select(&doc, "*[. = 'firstbold']")), ["notes"]);
}

#[test]
fn no_match_is_empty() {
    let doc = sample();
    assert!(select(&doc, "/nothing/here").is_empty());
    assert!(select(&doc, "//add[@key='absent']").is_empty());
}

#[test]
fn prefixed_names_need_bindings() {
    let doc = Document::parse(
        r#"<root xmlns:x="urn:x" xmlns="urn:default"><x:item id="1"/><item id="2"/></root>"#,
    )
    .unwrap();
    let mut namespaces = NamespaceMap::new();
    namespaces.insert("p".to_string(), "urn:x".to_string());
    namespaces.insert("d".to_string(), "urn:default".to_string());
    let root = doc.document_element().unwrap();

    let hits = Query::compile("p:item", &namespaces).unwrap().select(&doc, root);
    assert_eq!(hits.len(), 1);
    assert_eq!(doc.attribute(hits[0].as_node().unwrap(), "id"), Some("1"));

    let hits = Query::compile("d:item", &namespaces).unwrap().select(&doc, root);
    assert_eq!(doc.attribute(hits[0].as_node().unwrap(), "id"), Some("2"));

    // Unprefixed tests only match elements in no namespace.
    assert!(Query::parse("item").unwrap().select(&doc, root).is_empty());
    assert_eq!(Query::compile("p:*", &namespaces).unwrap().select(&doc, root).len(), 1);

    let err = Query::parse("q:item").unwrap_err();
    assert!(err.to_string().contains("q"), "{err}");
}

#[test]
fn namespace_declarations_are_not_attributes() {
    let doc = Document::parse(r#"<root xmlns:x="urn:x" a="1"/>"#).unwrap();
    let root = doc.document_element().unwrap();
    assert_eq!(Query::parse("@*").unwrap().select(&doc, root).len(), 1);
}

#[test]
fn keywords_inside_names_are_not_operators() {
    let doc = Document::parse("<r><order/><android/></r>").unwrap();
    let root = doc.document_element().unwrap();
    assert_eq!(Query::parse("order | android").unwrap().select(&doc, root).len(), 2);
}

#[test]
fn rejects_malformed_queries() {
    for query in ["", "/a[", "a/", "count()", "contains('a')", "'text'", "1 + 1", "a | 'b'"] {
        assert!(Query::parse(query).is_err(), "accepted `{query}`");
    }
}

#[test]
fn display_round_trips_the_source() {
    let query = Query::parse("//add[@key = 'x']").unwrap();
    assert_eq!(query.to_string(), "//add[@key = 'x']");
    assert_eq!(query.as_str(), "//add[@key = 'x']");
}
