use std::{fs, path::Path};

use serde_json::{json, Value};
use tempfile::TempDir;
use temperature_import::{import::INDEX_FILE_NAME, logging, run, Config, ImportError};

const BREMEN: &str = "\
EUROPEAN CLIMATE ASSESSMENT & DATASET (ECA&D), file created on: 28-10-2019

FILE FORMAT (MISSING VALUE CODE IS -9999):
01-06 STAID: Station identifier
08-13 SOUID: Source identifier
15-22 DATE : Date YYYYMMDD
24-28 TG   : mean temperature in 0.1 &#176;C
30-34 Q_TG : Quality code for TG (0='valid'; 1='suspect'; 9='missing')

STAID, SOUID,    DATE,   TG, Q_TG
   42,   102,20200101,  100,    0
   42,   102,20200102,  350,    1
   42,   102,20200103,-9999,    9
   42,   102,20200104,  200,    0
";

const WIEN: &str = "\
STAID, SOUID,    DATE,   TG, Q_TG
   16,   111,20200101,  -50,    0
";

const STRAY: &str = "1, 1, 20200101, 100, 0\n";

const EMPTY: &str = "\
STAID, SOUID,    DATE,   TG, Q_TG
   17,   112,20200101,-9999,    9
   17,   112,20200102,   12,    1
";

fn setup(files: &[(&str, &[u8])]) -> (TempDir, Config) {
    logging::init_test();

    let dir = TempDir::new().unwrap();
    let input_dir = dir.path().join("data");
    fs::create_dir(&input_dir).unwrap();
    for (name, content) in files {
        fs::write(input_dir.join(name), content).unwrap();
    }

    let config = Config {
        input_dir,
        output_dir: dir.path().join("resources").join("temperature"),
    };
    (dir, config)
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn writes_index_and_region_files() {
    let (_dir, config) = setup(&[
        ("Wien.txt", WIEN.as_bytes()),
        ("Bremen.txt", BREMEN.as_bytes()),
        ("Empty.txt", EMPTY.as_bytes()),
        ("README.md", STRAY.as_bytes()),
        ("Frankfurt.TXT", STRAY.as_bytes()),
        (".txt", STRAY.as_bytes()),
    ]);

    let summary = run(&config).unwrap();
    assert_eq!(summary.regions().len(), 2);
    assert_eq!(summary.skipped(), ["Empty"]);

    let index = read_json(&config.output_dir.join(INDEX_FILE_NAME));
    assert_eq!(
        index,
        json!([
            { "region": "Bremen", "meanTemp": 15.0 },
            { "region": "Wien", "meanTemp": -5.0 },
        ])
    );

    let bremen = read_json(&config.output_dir.join("Bremen.json"));
    assert_eq!(
        bremen,
        json!({
            "region": "Bremen",
            "mean": 15.0,
            "datapoints": [
                { "date": "20200101", "temp": 10.0 },
                { "date": "20200104", "temp": 20.0 },
            ]
        })
    );

    assert!(config.output_dir.join("Wien.json").is_file());
    assert!(!config.output_dir.join("Empty.json").exists());
    assert!(!config.output_dir.join("README.json").exists());
    assert!(!config.output_dir.join("Frankfurt.json").exists());
}

#[test]
fn region_file_layout() {
    let (_dir, config) = setup(&[("Wien.txt", WIEN.as_bytes())]);
    run(&config).unwrap();

    let wien = fs::read_to_string(config.output_dir.join("Wien.json")).unwrap();
    assert_eq!(
        wien,
        r#"{
    "region": "Wien",
    "mean": -5.0,
    "datapoints": [
        {
            "date": "20200101",
            "temp": -5.0
        }
    ]
}"#
    );
}

#[test]
fn empty_directory_writes_empty_index() {
    let (_dir, config) = setup(&[]);

    let summary = run(&config).unwrap();
    assert!(summary.regions().is_empty());

    let index = read_json(&config.output_dir.join(INDEX_FILE_NAME));
    assert_eq!(index, json!([]));
}

#[test]
fn invalid_utf8_is_decoded_lossily() {
    let mut content = b"Station: M\xfcnchen\n".to_vec();
    content.extend_from_slice(b"1, 1, 20200101, 100, 0\n1, 1, 20200102, \xff300, 0\n");
    let (_dir, config) = setup(&[("Muenchen.txt", content.as_slice())]);

    let summary = run(&config).unwrap();
    assert_eq!(summary.regions().len(), 1);
    assert_eq!(summary.regions()[0].mean(), 10.0);
    assert_eq!(summary.regions()[0].datapoints().len(), 1);
}

#[test]
fn rerun_is_identical() {
    let (_dir, config) = setup(&[("Bremen.txt", BREMEN.as_bytes())]);

    run(&config).unwrap();
    let first = fs::read(config.output_dir.join("Bremen.json")).unwrap();
    run(&config).unwrap();
    let second = fs::read(config.output_dir.join("Bremen.json")).unwrap();

    assert_eq!(first, second);
}

#[test]
fn missing_input_directory() {
    let (dir, mut config) = setup(&[]);
    config.input_dir = dir.path().join("does-not-exist");

    let err = run(&config).unwrap_err();
    assert!(matches!(err, ImportError::ReadDir { .. }));
    assert!(!config.output_dir.exists());
}

#[test]
fn index_is_not_written_when_a_region_fails() {
    let (_dir, config) = setup(&[
        ("Bremen.txt", BREMEN.as_bytes()),
        ("Wien.txt", WIEN.as_bytes()),
    ]);
    // A directory in the way of the region file
    fs::create_dir_all(config.output_dir.join("Wien.json")).unwrap();

    let err = run(&config).unwrap_err();
    assert!(matches!(err, ImportError::Write { .. }));
    assert!(!config.output_dir.join(INDEX_FILE_NAME).exists());
}
