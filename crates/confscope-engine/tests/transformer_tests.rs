use std::collections::BTreeSet;
use std::sync::Mutex;

use confscope_engine::{
    render_output_name, ApplyError, ConfigurationError, ManifestVocabulary, ScopeMap,
    TransformError, Transformer,
};
use confscope_xml::{documents_equal, Document, NodeKind, Query};

const MASTER: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<configuration>
  <appSettings>
    <add key="mode" value="debug"/>
    <add key="endpoint" value="http://localhost"/>
    <add key="obsolete" value="yes"/>
  </appSettings>
  <connectionStrings/>
</configuration>"#;

const MANIFEST: &str = r##"<manifest outputFormat="web.{environment}-{region}.config">
  <path>
    <add name="setting" path="/configuration/appSettings/add[@key='{parameter}']/@value"/>
    <add name="entry" path="/configuration/appSettings/add[@key='{parameter}']"/>
  </path>
  <sections name="environment">
    <transform>
      <remove path="#entry" param="obsolete"/>
      <update path="#setting" param="mode" value="shared"/>
    </transform>
    <section name="dev">
      <sections name="region">
        <section name="east"/>
        <section name="west">
          <transform>
            <update path="#setting" param="mode" value="west-dev"/>
          </transform>
        </section>
      </sections>
    </section>
    <section name="prod">
      <transform>
        <update path="#setting" param="mode" value="release"/>
        <add path="/configuration/connectionStrings"><add name="main" connectionString="Server=prod"/></add>
      </transform>
      <sections name="region">
        <section name="east">
          <transform>
            <update path="#setting" param="endpoint" value="https://east.example"/>
          </transform>
        </section>
        <section name="west"/>
      </sections>
    </section>
  </sections>
</manifest>"##;

fn scope(pairs: &[(&str, &str)]) -> ScopeMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn transformer(parallel: bool) -> Transformer {
    Transformer::from_manifest_str(MANIFEST, &ManifestVocabulary::default(), parallel).unwrap()
}

fn setting(doc: &Document, key: &str) -> Option<String> {
    let root = doc.document_element()?;
    let query = Query::parse(&format!("appSettings/add[@key='{key}']")).unwrap();
    let hit = query.select(doc, root).first()?.as_node()?;
    doc.attribute(hit, "value").map(str::to_string)
}

#[test]
fn environment_by_region_yields_four_leaves() {
    let transformer = transformer(false);
    let scopes: Vec<ScopeMap> = transformer
        .leaves()
        .iter()
        .map(|leaf| leaf.scope_map().cloned().unwrap())
        .collect();
    assert_eq!(
        scopes,
        vec![
            scope(&[("environment", "dev"), ("region", "east")]),
            scope(&[("environment", "dev"), ("region", "west")]),
            scope(&[("environment", "prod"), ("region", "east")]),
            scope(&[("environment", "prod"), ("region", "west")]),
        ]
    );

    let names: BTreeSet<String> = scopes
        .iter()
        .map(|s| render_output_name(transformer.output_template(), s))
        .collect();
    assert_eq!(names.len(), 4);
    assert!(names.contains("web.prod-east.config"));
}

#[test]
fn specific_scopes_override_general_ones() {
    let master = Document::parse(MASTER).unwrap();
    let outputs = transformer(false).transform(&master, false).unwrap();
    let find = |env: &str, region: &str| {
        outputs
            .iter()
            .find(|o| o.scope_map == scope(&[("environment", env), ("region", region)]))
            .unwrap()
    };

    assert_eq!(setting(&find("dev", "east").document, "mode").as_deref(), Some("shared"));
    assert_eq!(setting(&find("dev", "west").document, "mode").as_deref(), Some("west-dev"));
    assert_eq!(setting(&find("prod", "west").document, "mode").as_deref(), Some("release"));

    let prod_east = &find("prod", "east").document;
    assert_eq!(setting(prod_east, "endpoint").as_deref(), Some("https://east.example"));
    assert_eq!(setting(prod_east, "obsolete"), None);
    assert_eq!(find("prod", "east").output_name, "web.prod-east.config");

    // The master itself is never touched.
    assert_eq!(setting(&master, "mode").as_deref(), Some("debug"));
    assert_eq!(setting(&master, "obsolete").as_deref(), Some("yes"));
}

#[test]
fn serial_and_parallel_agree() {
    let master = Document::parse(MASTER).unwrap();
    let serial = transformer(false).transform(&master, false).unwrap();
    let parallel = transformer(true).transform(&master, true).unwrap();
    assert_eq!(serial.len(), parallel.len());
    for (a, b) in serial.iter().zip(parallel.iter()) {
        assert_eq!(a.scope_map, b.scope_map);
        assert_eq!(a.output_name, b.output_name);
        assert!(documents_equal(&a.document, &b.document));
    }
}

#[test]
fn sink_sees_every_leaf_in_both_modes() {
    let master = Document::parse(MASTER).unwrap();
    let transformer = transformer(false);
    for parallel in [false, true] {
        let seen = Mutex::new(Vec::new());
        transformer
            .apply(&master, parallel, |template, scope_map, document| {
                assert_eq!(template, "web.{environment}-{region}.config");
                assert!(document.document_element().is_some());
                seen.lock().unwrap().push(render_output_name(template, scope_map));
                Ok(())
            })
            .unwrap();
        let mut seen = seen.into_inner().unwrap();
        seen.sort();
        assert_eq!(
            seen,
            [
                "web.dev-east.config",
                "web.dev-west.config",
                "web.prod-east.config",
                "web.prod-west.config"
            ]
        );
    }
}

#[test]
fn sink_errors_propagate() {
    let master = Document::parse(MASTER).unwrap();
    let err = transformer(false)
        .apply(&master, false, |_, scope_map, _| {
            if scope_map.get("region").map(String::as_str) == Some("west") {
                Err("disk full".into())
            } else {
                Ok(())
            }
        })
        .unwrap_err();
    assert!(matches!(err, TransformError::Sink { ref scope, .. } if scope == "environment=dev, region=west"));
}

#[test]
fn add_fragment_keeps_element_text_and_cdata() {
    let manifest = r#"<manifest outputFormat="out.{e}">
      <sections name="e">
        <section name="only">
          <transform>
            <add path="/r"><item a="1"><child/></item>plain<![CDATA[<not-markup>]]></add>
          </transform>
        </section>
      </sections>
    </manifest>"#;
    let transformer =
        Transformer::from_manifest_str(manifest, &ManifestVocabulary::default(), false).unwrap();
    let master = Document::parse("<r/>").unwrap();
    let outputs = transformer.transform(&master, false).unwrap();
    let doc = &outputs[0].document;
    let root = doc.document_element().unwrap();
    let kinds: Vec<&NodeKind> = doc.children(root).iter().map(|id| doc.kind(*id)).collect();
    assert!(matches!(kinds[0], NodeKind::Element { name, .. } if name == "item"));
    assert!(matches!(kinds[1], NodeKind::Text(text) if text == "plain"));
    assert!(matches!(kinds[2], NodeKind::CData(text) if text == "<not-markup>"));
    assert_eq!(
        doc.inner_xml(root).unwrap(),
        r#"<item a="1"><child/></item>plain<![CDATA[<not-markup>]]>"#
    );
}

#[test]
fn update_element_keeps_sibling_order() {
    let manifest = r#"<manifest outputFormat="out.{e}">
      <sections name="e">
        <section name="only">
          <transform>
            <update path="/r/b"><x/><y/></update>
          </transform>
        </section>
      </sections>
    </manifest>"#;
    let transformer =
        Transformer::from_manifest_str(manifest, &ManifestVocabulary::default(), false).unwrap();
    let master = Document::parse("<r><a/><b/><c/></r>").unwrap();
    let doc = &transformer.transform(&master, false).unwrap()[0].document;
    let root = doc.document_element().unwrap();
    assert_eq!(doc.inner_xml(root).unwrap(), "<a/><x/><y/><c/>");
}

#[test]
fn apply_errors_name_the_scope_and_command() {
    let manifest = r#"<manifest outputFormat="out.{e}">
      <sections name="e">
        <section name="bad">
          <transform><add path="/r/@id" name="x" value="y"/></transform>
        </section>
      </sections>
    </manifest>"#;
    let transformer =
        Transformer::from_manifest_str(manifest, &ManifestVocabulary::default(), false).unwrap();
    let master = Document::parse(r#"<r id="1"/>"#).unwrap();
    let err = transformer.transform(&master, true).unwrap_err();
    match err {
        TransformError::Apply { scope, source } => {
            assert_eq!(scope, "e=bad");
            assert!(matches!(source, ApplyError::InvalidTarget { .. }));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn literal_manifests_reject_parameters() {
    let manifest = r#"<manifest outputFormat="out.{e}">
      <sections name="e">
        <section name="a">
          <transform><remove path="//x" param="p"/></transform>
        </section>
      </sections>
    </manifest>"#;
    let err = Transformer::from_manifest_str(manifest, &ManifestVocabulary::default(), false)
        .unwrap_err();
    assert!(matches!(err.root(), ConfigurationError::UnexpectedParameter { .. }));
    assert!(err.to_string().contains("<remove"), "{err}");
}

#[test]
fn duplicate_aliases_fail_at_construction() {
    let manifest = r#"<manifest outputFormat="out.{e}">
      <path><add name="a" path="//a"/><add name="a" path="//b"/></path>
      <sections name="e"><section name="a"/></sections>
    </manifest>"#;
    let err = Transformer::from_manifest_str(manifest, &ManifestVocabulary::default(), true)
        .unwrap_err();
    assert!(matches!(err.root(), ConfigurationError::DuplicateAlias { .. }));
}

#[test]
fn nested_repeat_of_a_dimension_is_rejected() {
    let manifest = r#"<manifest outputFormat="out.{e}">
      <sections name="e">
        <section name="a"><sections name="e"><section name="b"/></sections></section>
      </sections>
    </manifest>"#;
    let err = Transformer::from_manifest_str(manifest, &ManifestVocabulary::default(), false)
        .unwrap_err();
    assert!(matches!(err.root(), ConfigurationError::DuplicateDimension { .. }));
}

#[test]
fn custom_vocabulary() {
    let vocabulary =
        ManifestVocabulary::from_json_str(r#"{"sections_element": "dimension", "section_element": "value"}"#)
            .unwrap();
    let manifest = r#"<manifest outputFormat="{tier}.xml">
      <dimension name="tier"><value name="gold"/><value name="silver"/></dimension>
    </manifest>"#;
    let transformer = Transformer::from_manifest_str(manifest, &vocabulary, false).unwrap();
    assert_eq!(transformer.leaves().len(), 2);
}

#[test]
fn sibling_top_level_dimensions_each_produce_leaves() {
    let manifest = r#"<manifest outputFormat="{a}{b}">
      <sections name="a"><section name="1"/><section name="2"/></sections>
      <sections name="b"><section name="x"/></sections>
    </manifest>"#;
    for parallel in [false, true] {
        let transformer =
            Transformer::from_manifest_str(manifest, &ManifestVocabulary::default(), parallel)
                .unwrap();
        let names: Vec<String> = transformer
            .leaves()
            .iter()
            .map(|leaf| render_output_name(transformer.output_template(), leaf.scope_map().unwrap()))
            .collect();
        assert_eq!(names, ["1{b}", "2{b}", "{a}x"]);
    }
}
