use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn parse_jsonl(stdout: &[u8]) -> Vec<Value> {
    let s = String::from_utf8_lossy(stdout);
    s.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str::<Value>(l).expect("valid jsonl line"))
        .collect()
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn marginalia(root: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("marginalia"));
    cmd.arg("--root")
        .arg(root)
        .env("MARGINALIA_AUTHOR", "alice")
        .env_remove("MARGINALIA_FORMAT")
        .env_remove("MARGINALIA_LOG");
    cmd
}

/// Add a comment on the first occurrence of `text` and return its id
fn add_comment(root: &Path, file: &str, text: &str, message: &str) -> String {
    let assert = marginalia(root)
        .args(["comment", "add", file, "--match", text, "-m", message])
        .assert()
        .success();
    let items = parse_jsonl(&assert.get_output().stdout);
    assert_eq!(items.len(), 1);
    items[0]["id"].as_str().expect("comment id").to_string()
}

fn list_comments(root: &Path, file: &str, extra: &[&str]) -> Vec<Value> {
    let assert = marginalia(root)
        .args(["comment", "list", file])
        .args(extra)
        .assert()
        .success();
    parse_jsonl(&assert.get_output().stdout)
}

#[test]
fn add_comment_persists_block_in_document() {
    let temp = tempdir().unwrap();
    write_file(&temp.path().join("doc.md"), "Hello world\n");

    let id = add_comment(temp.path(), "doc.md", "world", "needs a planet name");

    let text = fs::read_to_string(temp.path().join("doc.md")).unwrap();
    assert!(text.starts_with("Hello world\n"));
    assert!(text.contains("<!-- marginalia:comments"));
    assert!(text.trim_end().ends_with("-->"));

    let items = list_comments(temp.path(), "doc.md", &[]);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], id.as_str());
    assert_eq!(items[0]["kind"], "comment");
    assert_eq!(items[0]["path"], "doc.md");
    assert_eq!(items[0]["excerpt"], "needs a planet name");
    assert_eq!(items[0]["data"]["author"], "alice");
    assert_eq!(items[0]["data"]["anchor"]["text"], "world");
    assert_eq!(items[0]["range"]["start"]["line"], 0);
    assert_eq!(items[0]["range"]["start"]["character"], 6);
    assert_eq!(items[0]["range"]["end"]["character"], 11);
}

#[test]
fn add_comment_with_explicit_positions() {
    let temp = tempdir().unwrap();
    write_file(&temp.path().join("doc.md"), "first line\nsecond line\n");

    marginalia(temp.path())
        .args([
            "comment", "add", "doc.md", "--from", "1:0", "--to", "1:6", "-m", "which one?",
        ])
        .assert()
        .success();

    let items = list_comments(temp.path(), "doc.md", &[]);
    assert_eq!(items[0]["data"]["anchor"]["text"], "second");
    assert_eq!(items[0]["data"]["anchor"]["startLine"], 1);
}

#[test]
fn deleted_anchor_text_becomes_orphaned() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("doc.md");
    write_file(&path, "Hello world\n");
    add_comment(temp.path(), "doc.md", "world", "note");

    // delete the anchored word from the body; the block still quotes it
    let text = fs::read_to_string(&path).unwrap();
    fs::write(&path, text.replacen("Hello world", "Hello ", 1)).unwrap();

    let assert = marginalia(temp.path())
        .args(["reconcile", "doc.md"])
        .assert()
        .success();
    let items = parse_jsonl(&assert.get_output().stdout);
    assert_eq!(items[0]["kind"], "document");
    assert_eq!(items[0]["data"]["orphaned"], 1);
    assert_eq!(items[0]["data"]["saved"], true);

    let orphaned = list_comments(temp.path(), "doc.md", &["--orphaned"]);
    assert_eq!(orphaned.len(), 1);
    assert_eq!(orphaned[0]["data"]["orphaned"], true);
    assert_eq!(orphaned[0]["data"]["anchor"]["text"], "world");

    // a second pass has nothing to save
    let assert = marginalia(temp.path())
        .args(["reconcile", "doc.md"])
        .assert()
        .success();
    let items = parse_jsonl(&assert.get_output().stdout);
    assert_eq!(items[0]["data"]["saved"], false);
}

#[test]
fn moved_anchor_text_is_relocated() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("doc.md");
    write_file(&path, "Hello world\n");
    add_comment(temp.path(), "doc.md", "world", "note");

    let text = fs::read_to_string(&path).unwrap();
    fs::write(&path, format!("# Intro\n\n{}", text)).unwrap();

    let assert = marginalia(temp.path())
        .args(["reconcile", "doc.md"])
        .assert()
        .success();
    let items = parse_jsonl(&assert.get_output().stdout);
    assert_eq!(items[0]["data"]["relocated"], 1);

    let items = list_comments(temp.path(), "doc.md", &[]);
    assert_eq!(items[0]["range"]["start"]["line"], 2);
    assert_eq!(items[0]["range"]["start"]["character"], 6);
    assert!(items[0]["data"].get("orphaned").is_none());
}

#[test]
fn reanchor_moves_orphaned_comment() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("doc.md");
    write_file(&path, "Hello world\n");
    let id = add_comment(temp.path(), "doc.md", "world", "note");

    let text = fs::read_to_string(&path).unwrap();
    fs::write(&path, text.replacen("Hello world", "Hello planet", 1)).unwrap();
    marginalia(temp.path())
        .args(["reconcile", "doc.md"])
        .assert()
        .success();

    marginalia(temp.path())
        .args(["comment", "reanchor", "doc.md", &id, "--match", "planet"])
        .assert()
        .success();

    let items = list_comments(temp.path(), "doc.md", &[]);
    assert_eq!(items[0]["data"]["anchor"]["text"], "planet");
    assert!(items[0]["data"].get("orphaned").is_none());
    assert!(items[0]["data"]["updatedAt"].is_string());
}

#[test]
fn reply_edit_and_delete() {
    let temp = tempdir().unwrap();
    write_file(&temp.path().join("doc.md"), "Hello world\n");
    let id = add_comment(temp.path(), "doc.md", "world", "note");

    let assert = marginalia(temp.path())
        .args(["--author", "bob", "comment", "reply", "doc.md", &id, "-m", "agreed"])
        .assert()
        .success();
    let items = parse_jsonl(&assert.get_output().stdout);
    assert_eq!(items[0]["kind"], "reply");
    assert_eq!(items[0]["data"]["commentId"], id.as_str());
    let reply_id = items[0]["id"].as_str().unwrap().to_string();

    marginalia(temp.path())
        .args(["comment", "edit-reply", "doc.md", &id, &reply_id, "-m", "fully agreed"])
        .assert()
        .success();

    let items = list_comments(temp.path(), "doc.md", &[]);
    let replies = items[0]["data"]["replies"].as_array().unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["content"], "fully agreed");
    assert_eq!(replies[0]["author"], "bob");

    marginalia(temp.path())
        .args(["comment", "delete-reply", "doc.md", &id, &reply_id])
        .assert()
        .success();
    let items = list_comments(temp.path(), "doc.md", &[]);
    assert!(items[0]["data"].get("replies").is_none());
}

#[test]
fn edit_resolve_and_delete_comment() {
    let temp = tempdir().unwrap();
    write_file(&temp.path().join("doc.md"), "alpha beta gamma\n");
    let first = add_comment(temp.path(), "doc.md", "alpha", "one");
    let second = add_comment(temp.path(), "doc.md", "gamma", "two");

    marginalia(temp.path())
        .args(["comment", "edit", "doc.md", &first, "-m", "one, revised"])
        .assert()
        .success();
    marginalia(temp.path())
        .args(["comment", "resolve", "doc.md", &second])
        .assert()
        .success();

    let open = list_comments(temp.path(), "doc.md", &["--hide-resolved"]);
    assert_eq!(open.len(), 1);
    assert_eq!(open[0]["excerpt"], "one, revised");

    marginalia(temp.path())
        .args(["comment", "reopen", "doc.md", &second])
        .assert()
        .success();
    assert_eq!(list_comments(temp.path(), "doc.md", &["--hide-resolved"]).len(), 2);

    marginalia(temp.path())
        .args(["comment", "delete", "doc.md", &first])
        .assert()
        .success();
    let items = list_comments(temp.path(), "doc.md", &[]);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], second.as_str());
}

#[test]
fn unknown_comment_id_fails() {
    let temp = tempdir().unwrap();
    write_file(&temp.path().join("doc.md"), "Hello world\n");
    add_comment(temp.path(), "doc.md", "world", "note");

    marginalia(temp.path())
        .args([
            "comment",
            "delete",
            "doc.md",
            "00000000-0000-4000-8000-000000000000",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("comment not found"));
}

#[test]
fn blank_message_and_missing_text_fail_without_writing() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("doc.md");
    write_file(&path, "Hello world\n");

    marginalia(temp.path())
        .args(["comment", "add", "doc.md", "--match", "world", "-m", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("comment content is empty"));

    marginalia(temp.path())
        .args(["comment", "add", "doc.md", "--match", "planet", "-m", "note"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Text not found"));

    assert_eq!(fs::read_to_string(&path).unwrap(), "Hello world\n");
}

#[test]
fn comment_text_with_html_terminator_round_trips() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("doc.md");
    write_file(&path, "Use a --> arrow here\n");
    add_comment(temp.path(), "doc.md", "a --> arrow", "looks like <!-- marginalia:comments --> to me");

    let text = fs::read_to_string(&path).unwrap();
    // the body arrow plus the block terminator, nothing else
    assert_eq!(text.matches("-->").count(), 2);

    let items = list_comments(temp.path(), "doc.md", &[]);
    assert_eq!(items[0]["data"]["anchor"]["text"], "a --> arrow");
    assert_eq!(items[0]["excerpt"], "looks like <!-- marginalia:comments --> to me");
}

#[test]
fn preview_highlights_comment_on_stdout() {
    let temp = tempdir().unwrap();
    write_file(&temp.path().join("doc.md"), "# Title\n\nHello *big* world\n");
    let id = add_comment(temp.path(), "doc.md", "world", "note");

    marginalia(temp.path())
        .args(["preview", "doc.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<h1>Title</h1>"))
        .stdout(predicate::str::contains(format!(
            "<mark class=\"marginalia-highlight\" data-comment-id=\"{}\">world</mark>",
            id
        )));
}

#[test]
fn preview_writes_output_file() {
    let temp = tempdir().unwrap();
    write_file(&temp.path().join("doc.md"), "Hello world\n");
    add_comment(temp.path(), "doc.md", "world", "note");
    let out = temp.path().join("out.html");

    let assert = marginalia(temp.path())
        .args(["preview", "doc.md", "--highlight-class", "hl", "--output"])
        .arg(&out)
        .assert()
        .success();
    let items = parse_jsonl(&assert.get_output().stdout);
    assert_eq!(items[0]["kind"], "preview");
    assert_eq!(items[0]["path"], "doc.md");

    let html = fs::read_to_string(&out).unwrap();
    assert!(html.contains("<mark class=\"hl\""));
}

#[test]
fn scan_lists_commented_documents() {
    let temp = tempdir().unwrap();
    write_file(&temp.path().join("b.md"), "Beta text\n");
    write_file(&temp.path().join("a/notes.md"), "Alpha text\n");
    write_file(&temp.path().join("plain.md"), "Nothing here\n");
    add_comment(temp.path(), "b.md", "Beta", "one");
    add_comment(temp.path(), "a/notes.md", "Alpha", "two");

    let assert = marginalia(temp.path()).arg("scan").assert().success();
    let items = parse_jsonl(&assert.get_output().stdout);

    let paths: Vec<_> = items
        .iter()
        .map(|v| v["path"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(paths, vec!["a/notes.md", "b.md"]);
    assert_eq!(items[0]["data"]["comments"], 1);
}

#[test]
fn markdown_format_lists_comments() {
    let temp = tempdir().unwrap();
    write_file(&temp.path().join("doc.md"), "Hello world\n");
    add_comment(temp.path(), "doc.md", "world", "note");

    marginalia(temp.path())
        .args(["--format", "md", "comment", "list", "doc.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("## Comments"))
        .stdout(predicate::str::contains("### `doc.md` (0:6-0:11)"))
        .stdout(predicate::str::contains("**alice**"));
}

#[test]
fn malformed_block_lists_nothing() {
    let temp = tempdir().unwrap();
    write_file(
        &temp.path().join("doc.md"),
        "Hello\n\n<!-- marginalia:comments\n{ not json\n-->\n",
    );

    let items = list_comments(temp.path(), "doc.md", &[]);
    assert!(items.is_empty());
}

#[test]
fn author_with_html_terminator_keeps_comments() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("doc.md");
    write_file(&path, "Hello world\n");

    marginalia(temp.path())
        .args(["--author", "eve -->", "comment", "add", "doc.md", "--match", "world", "-m", "first"])
        .assert()
        .success();
    add_comment(temp.path(), "doc.md", "Hello", "second");

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("Hello world\n"));
    assert_eq!(text.matches("<!-- marginalia:comments").count(), 1);
    assert_eq!(text.matches("-->").count(), 1);

    let items = list_comments(temp.path(), "doc.md", &[]);
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["data"]["author"], "eve -->");
}
