use serde_json::{json, Value};
mod test_util; use test_util::spawn_bridge;

fn sorted(v: &Value) -> Vec<String> {
    let mut out: Vec<String> = v.as_array().expect("array").iter().filter_map(|s| s.as_str().map(String::from)).collect();
    out.sort();
    out
}

#[test]
fn completes_root_dir() {
    let conn = spawn_bridge(&[]).expect("spawn");
    let (status, resp) = conn.post("/api/autocomplete", r#"{"text":"ls /tm","cwd":"/"}"#).unwrap();
    assert_eq!(status, 200);
    assert!(sorted(&resp).contains(&"tmp/".to_string()), "{resp}");
}

#[test]
fn empty_text_yields_nothing() {
    let conn = spawn_bridge(&[]).expect("spawn");
    assert_eq!(conn.post("/api/autocomplete", r#"{"text":"","cwd":"/tmp"}"#).unwrap(), (200, json!([])));
    assert_eq!(conn.post("/api/autocomplete", "{}").unwrap(), (200, json!([])));
}

#[test]
fn relative_prefix_against_cwd() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir(dir.path().join("docs")).unwrap();
    std::fs::write(dir.path().join("data.csv"), b"1,2").unwrap();
    std::fs::write(dir.path().join("notes"), b"").unwrap();
    let conn = spawn_bridge(&[]).expect("spawn");
    let body = json!({"text": "cat d", "cwd": dir.path().to_str().unwrap()}).to_string();
    let (status, resp) = conn.post("/api/autocomplete", &body).unwrap();
    assert_eq!(status, 200);
    assert_eq!(sorted(&resp), vec!["data.csv", "docs/"]);
}

#[test]
fn missing_dir_yields_nothing() {
    let conn = spawn_bridge(&[]).expect("spawn");
    let (status, resp) = conn.post("/api/autocomplete", r#"{"text":"ls /no/such/dir/x","cwd":"/"}"#).unwrap();
    assert_eq!(status, 200);
    assert_eq!(resp, json!([]));
}

#[test]
fn home_relative_tokens() {
    let dir = tempfile::tempdir().expect("tempdir");
    let home = dir.path().join("alice");
    std::fs::create_dir(&home).unwrap();
    std::fs::write(home.join("notes.txt"), b"").unwrap();
    std::fs::create_dir(home.join("novels")).unwrap();
    let conn = spawn_bridge(&[("HOME", home.to_str().unwrap())]).expect("spawn");

    let (status, resp) = conn.post("/api/autocomplete", r#"{"text":"cd ~","cwd":"/tmp"}"#).unwrap();
    assert_eq!(status, 200);
    assert_eq!(sorted(&resp), vec!["alice/"]);

    let (_, resp) = conn.post("/api/autocomplete", r#"{"text":"cat ~/no","cwd":"/tmp"}"#).unwrap();
    assert_eq!(sorted(&resp), vec!["notes.txt", "novels/"]);
}
