//! End-to-end smoke test driving the built `pathnote` binary against a real
//! temporary directory. Exercises add/list/move/rename/delete/compact/doctor/
//! compile/search/types in sequence and checks exit codes and output shapes,
//! mirroring the client-binary tests in the rsync corpus this crate borrows
//! its CLI conventions from.

use std::process::Output;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::tempdir;

fn pathnote(dir: &std::path::Path, args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("pathnote").unwrap();
    cmd.arg("--directory").arg(dir).args(args);
    cmd
}

fn stdout_of(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).expect("stdout is UTF-8")
}

/// `add` prints `<id> <path> <slug>` on success; pull the id out of it.
fn add(dir: &std::path::Path, title: &str, extra: &[&str]) -> String {
    let mut args = vec!["add", title];
    args.extend_from_slice(extra);
    let output = pathnote(dir, &args).output().unwrap();
    assert!(output.status.success(), "add {title:?} failed: {output:?}");
    stdout_of(&output)
        .split_whitespace()
        .next()
        .expect("add prints an id")
        .to_string()
}

#[test]
fn full_lifecycle_round_trip() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();

    let chapter_one = add(dir, "Chapter One", &[]);
    let chapter_two = add(dir, "Chapter Two", &[]);
    let scene = add(dir, "Opening Scene", &["--parent", &chapter_one]);

    // list --json reflects the nesting.
    let output = pathnote(dir, &["list", "--json"]).output().unwrap();
    assert!(output.status.success());
    let tree: Value = serde_json::from_str(&stdout_of(&output)).expect("valid JSON");
    let roots = tree.as_array().unwrap();
    assert_eq!(roots.len(), 2);
    assert_eq!(roots[0]["id"], chapter_one);
    assert_eq!(roots[0]["children"][0]["id"], scene);
    assert_eq!(roots[1]["id"], chapter_two);

    // rename updates the title shown in list.
    pathnote(dir, &["rename", &chapter_two, "Chapter Two: Revised"])
        .assert()
        .success()
        .stdout(predicate::str::contains("renamed"));

    // move re-parents the scene under chapter two.
    pathnote(dir, &["move", &scene, &chapter_two])
        .assert()
        .success()
        .stdout(predicate::str::contains("moved"));

    let output = pathnote(dir, &["list", "--json"]).output().unwrap();
    let tree: Value = serde_json::from_str(&stdout_of(&output)).unwrap();
    let roots = tree.as_array().unwrap();
    assert!(roots[0]["children"].as_array().unwrap().is_empty());
    assert_eq!(roots[1]["children"][0]["id"], scene);

    // types: attach a doctype, write its body, read it back, then detach it.
    pathnote(dir, &["types", "add", &scene, "characters"])
        .assert()
        .success();
    pathnote(dir, &["types", "write", &scene, "characters"])
        .write_stdin("Alice, Bob\n")
        .assert()
        .success();
    pathnote(dir, &["types", "read", &scene, "characters"])
        .assert()
        .success()
        .stdout("Alice, Bob\n");
    pathnote(dir, &["types", "list", &scene])
        .assert()
        .success()
        .stdout(predicate::str::contains("characters"));
    pathnote(dir, &["types", "remove", &scene, "characters"])
        .assert()
        .success();

    // compile concatenates draft bodies across the chapter two subtree.
    pathnote(dir, &["types", "write", &chapter_two, "draft"])
        .write_stdin("Revised opening.\n")
        .assert()
        .success();
    pathnote(dir, &["types", "write", &scene, "draft"])
        .write_stdin("The scene begins.\n")
        .assert()
        .success();
    let output = pathnote(dir, &["compile", "draft", "--subtree", &chapter_two])
        .output()
        .unwrap();
    assert!(output.status.success());
    let compiled = stdout_of(&output);
    assert!(compiled.contains("Revised opening."));
    assert!(compiled.contains("The scene begins."));

    // search finds the text we just wrote.
    pathnote(dir, &["search", "scene begins"])
        .assert()
        .success()
        .stdout(predicate::str::contains(scene.as_str()));

    // doctor reports a clean outline.
    pathnote(dir, &["doctor"])
        .assert()
        .success()
        .stdout(predicate::str::contains("valid"));

    // compact renumbers the two root siblings without changing their order.
    pathnote(dir, &["compact"])
        .assert()
        .success()
        .stdout(predicate::str::contains("renumbered"));

    // delete --promote lifts the scene up when chapter two is removed.
    pathnote(dir, &["delete", &chapter_two, "--promote"])
        .assert()
        .success()
        .stdout(predicate::str::contains("promoted"));

    let output = pathnote(dir, &["list", "--json"]).output().unwrap();
    let tree: Value = serde_json::from_str(&stdout_of(&output)).unwrap();
    let ids: Vec<&str> = tree
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&scene.as_str()));
    assert!(!ids.contains(&chapter_two.as_str()));
}

#[test]
fn unknown_id_exits_with_domain_error_code() {
    let tmp = tempdir().unwrap();
    pathnote(tmp.path(), &["rename", "nosuchid", "New Title"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn doctor_detects_and_repairs_missing_doctype() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    let id = add(dir, "Lonely Node", &[]);

    // `notes` is a reserved doctype and the CLI refuses to detach it, so the
    // missing-doctype violation is manufactured by removing the file behind
    // the engine's back, the same way a user's stray `rm` would.
    let notes_file = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .find(|p| {
            p.file_name()
                .and_then(|f| f.to_str())
                .is_some_and(|f| f.contains(&format!("_{id}_notes_")))
        })
        .expect("notes file exists");
    std::fs::remove_file(notes_file).unwrap();

    pathnote(dir, &["doctor"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("missing"));

    pathnote(dir, &["doctor", "--repair"])
        .assert()
        .success()
        .stdout(predicate::str::contains("repaired"));

    pathnote(dir, &["doctor"])
        .assert()
        .success()
        .stdout(predicate::str::contains("valid"));
}
