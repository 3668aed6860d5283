use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    std::fs::write(path, contents).expect("write file");
}

fn data_root() -> TempDir {
    let temp = TempDir::new().expect("tempdir");
    let cfg = "Direct-3Zone-DD-Lunch/zone_1/cfg_a";
    write(
        temp.path(),
        &format!("{cfg}/run_1/lift_logbook.csv"),
        "time,floor\n0,1\n5,3\n",
    );
    write(
        temp.path(),
        &format!("{cfg}/run_1/605_timeline_logbook_L3.csv"),
        "time,queue_length\n0,2\n",
    );
    write(
        temp.path(),
        &format!("{cfg}/run_2/passenger_logbook.csv"),
        "wait_time\n12.5\n",
    );
    temp
}

fn simlog(root: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("simlog"));
    cmd.env_remove("SIMLOG_LOAD_CONCURRENCY")
        .arg("--quiet")
        .arg("--data-root")
        .arg(root);
    cmd
}

#[test]
fn tree_prints_zones_as_json() {
    let root = data_root();
    let output = simlog(root.path())
        .args(["tree", "Direct-3Zone-DD-Lunch"])
        .output()
        .expect("run simlog");
    assert!(output.status.success());

    let tree: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(tree["url"], "Direct-3Zone-DD-Lunch");
    assert_eq!(
        tree["zones"]["zone_1"]["configs"]["cfg_a"]["run_1"]["liftLogbooks"][0],
        "lift_logbook.csv"
    );
}

#[test]
fn pack_prints_datasets_per_run() {
    let root = data_root();
    let output = simlog(root.path())
        .args(["pack", "Direct-3Zone-DD-Lunch/zone_1/cfg_a"])
        .output()
        .expect("run simlog");
    assert!(output.status.success());

    let pack: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(pack["liftLogbooks"]["run_1"]["rowCount"], 2);
    assert_eq!(pack["timelineLogbooks"]["run_1"]["L3"]["columns"][1], "queue_length");
    assert_eq!(pack["passengerLogbooks"]["run_2"]["rows"][0][0], 12.5);
    assert_eq!(pack["warnings"], serde_json::json!([]));
}

#[test]
fn pack_with_no_coerce_keeps_text() {
    let root = data_root();
    let output = simlog(root.path())
        .args(["--no-coerce", "pack", "Direct-3Zone-DD-Lunch/zone_1/cfg_a"])
        .output()
        .expect("run simlog");
    let pack: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(pack["passengerLogbooks"]["run_2"]["rows"][0][0], "12.5");
}

#[test]
fn tree_of_missing_path_fails() {
    let root = data_root();
    simlog(root.path())
        .args(["tree", "no-such-option"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no-such-option"));
}

#[test]
fn schema_lists_response_types() {
    Command::new(assert_cmd::cargo::cargo_bin!("simlog"))
        .arg("schema")
        .assert()
        .success()
        .stdout(predicate::str::contains("SimDataPack"))
        .stdout(predicate::str::contains("DirectoryTree"));
}
