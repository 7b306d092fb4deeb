use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const MASTER: &str = r#"<configuration>
  <appSettings>
    <add key="mode" value="debug"/>
  </appSettings>
</configuration>"#;

const MANIFEST: &str = r##"<manifest outputFormat="app.{environment}.config">
  <path>
    <add name="mode" path="/configuration/appSettings/add[@key='mode']/@value"/>
  </path>
  <sections name="environment">
    <section name="dev"/>
    <section name="prod">
      <transform><update path="#mode" value="release"/></transform>
    </section>
  </sections>
</manifest>"##;

fn confscope_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_confscope"))
}

fn write_inputs(dir: &Path) -> (PathBuf, PathBuf) {
    let master = dir.join("app.config");
    let manifest = dir.join("app.manifest.xml");
    fs::write(&master, MASTER).unwrap();
    fs::write(&manifest, MANIFEST).unwrap();
    (master, manifest)
}

fn run(args: &[&Path], extra: &[&str]) -> Output {
    Command::new(confscope_bin())
        .args(args)
        .args(extra)
        .env_remove("CONFSCOPE_PARALLEL")
        .env_remove("RUST_LOG")
        .output()
        .expect("run confscope")
}

#[test]
fn writes_one_file_per_scope_then_reports_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let (master, manifest) = write_inputs(dir.path());
    let out = dir.path().join("out");

    let first = run(&[&master, &manifest, &out], &["--parallel", "true"]);
    assert!(first.status.success(), "{}", String::from_utf8_lossy(&first.stderr));
    let stdout = String::from_utf8_lossy(&first.stdout);
    assert!(stdout.contains("2 written, 0 unchanged"), "{stdout}");

    let prod = fs::read_to_string(out.join("app.prod.config")).unwrap();
    assert!(prod.contains(r#"value="release""#), "{prod}");
    let dev = fs::read_to_string(out.join("app.dev.config")).unwrap();
    assert!(dev.contains(r#"value="debug""#), "{dev}");

    let second = run(&[&master, &manifest, &out], &[]);
    assert!(second.status.success());
    let stdout = String::from_utf8_lossy(&second.stdout);
    assert!(stdout.contains("0 written, 2 unchanged"), "{stdout}");
}

#[test]
fn output_dir_defaults_to_the_master_directory() {
    let dir = tempfile::tempdir().unwrap();
    let (master, manifest) = write_inputs(dir.path());
    let result = run(&[&master, &manifest], &[]);
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));
    assert!(dir.path().join("app.dev.config").is_file());
    assert!(dir.path().join("app.prod.config").is_file());
}

#[test]
fn config_file_renames_the_vocabulary() {
    let dir = tempfile::tempdir().unwrap();
    let master = dir.path().join("app.config");
    let manifest = dir.path().join("app.manifest.xml");
    let config = dir.path().join("confscope.json");
    fs::write(&master, MASTER).unwrap();
    fs::write(
        &manifest,
        r#"<manifest outputFormat="app.{tier}.config">
             <dimension name="tier"><value name="gold"/></dimension>
           </manifest>"#,
    )
    .unwrap();
    fs::write(
        &config,
        r#"{ "vocabulary": { "sections_element": "dimension", "section_element": "value" } }"#,
    )
    .unwrap();

    let config_arg = config.to_string_lossy().to_string();
    let result = run(&[&master, &manifest], &["--config", &config_arg]);
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));
    assert!(dir.path().join("app.gold.config").is_file());
}

#[test]
fn failures_exit_with_one_and_explain() {
    let dir = tempfile::tempdir().unwrap();
    let (master, _) = write_inputs(dir.path());
    let manifest = dir.path().join("bad.manifest.xml");
    fs::write(
        &manifest,
        r##"<manifest outputFormat="x.{e}"><sections name="e"><section name="a">
              <transform><remove path="#missing"/></transform>
            </section></sections></manifest>"##,
    )
    .unwrap();

    let result = run(&[&master, &manifest], &[]);
    assert_eq!(result.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("unknown alias `missing`"), "{stderr}");
}

#[test]
fn usage_errors_exit_with_two() {
    let result = Command::new(confscope_bin()).output().unwrap();
    assert_eq!(result.status.code(), Some(2));
}
