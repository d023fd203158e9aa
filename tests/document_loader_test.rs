use std::fs;

use care_assistant::tools::{ReadFolderTool, Tool};
use care_assistant::{count_documents, load_documents};
use serde_json::json;
use tempfile::TempDir;

#[test]
fn test_each_text_file_becomes_one_entry() {
    let docs = TempDir::new().unwrap();
    fs::write(docs.path().join("a.txt"), "alpha").unwrap();
    fs::write(docs.path().join("b.md"), "# beta\n\nsecond file").unwrap();

    let documents = load_documents(docs.path());

    let a_key = docs.path().join("a.txt").to_string_lossy().into_owned();
    let b_key = docs.path().join("b.md").to_string_lossy().into_owned();
    assert_eq!(documents.len(), 2);
    assert_eq!(documents[&a_key], "alpha");
    assert_eq!(documents[&b_key], "# beta\n\nsecond file");
}

#[test]
fn test_missing_folder_yields_empty_map() {
    let docs = TempDir::new().unwrap();
    let documents = load_documents(docs.path().join("does-not-exist"));
    assert!(documents.is_empty());
}

#[test]
fn test_binary_file_is_skipped() {
    let docs = TempDir::new().unwrap();
    for i in 0..3 {
        fs::write(docs.path().join(format!("note{i}.txt")), format!("note {i}")).unwrap();
    }
    fs::write(docs.path().join("photo.bin"), [0xff, 0xfe, 0x00, 0x9f, 0x92]).unwrap();

    let documents = load_documents(docs.path());
    assert_eq!(documents.len(), 3);
    assert!(documents.keys().all(|key| key.ends_with(".txt")));
    // The binary file is still on disk, so it still counts.
    assert_eq!(count_documents(docs.path()), 4);
}

#[test]
fn test_nested_folders_are_walked() {
    let docs = TempDir::new().unwrap();
    let nested = docs.path().join("routines").join("bedtime");
    fs::create_dir_all(&nested).unwrap();
    fs::write(docs.path().join("top.txt"), "top").unwrap();
    fs::write(nested.join("deep.txt"), "deep").unwrap();
    fs::write(docs.path().join(".hidden"), "hidden").unwrap();

    let documents = load_documents(docs.path());

    let deep_key = nested.join("deep.txt").to_string_lossy().into_owned();
    assert_eq!(documents.len(), 3);
    assert_eq!(documents[&deep_key], "deep");
}

#[test]
fn test_documents_reflect_folder_changes() {
    let docs = TempDir::new().unwrap();
    fs::write(docs.path().join("first.txt"), "one").unwrap();
    assert_eq!(load_documents(docs.path()).len(), 1);

    fs::write(docs.path().join("second.txt"), "two").unwrap();
    assert_eq!(load_documents(docs.path()).len(), 2);
}

#[cfg(unix)]
#[test]
fn test_symlinks_to_files_are_read_but_linked_dirs_are_not_walked() {
    use std::os::unix::fs::symlink;

    let outside = TempDir::new().unwrap();
    fs::write(outside.path().join("shared.txt"), "shared").unwrap();

    let docs = TempDir::new().unwrap();
    fs::write(docs.path().join("own.txt"), "own").unwrap();
    symlink(outside.path().join("shared.txt"), docs.path().join("linked.txt")).unwrap();
    symlink(outside.path(), docs.path().join("linked_dir")).unwrap();

    let documents = load_documents(docs.path());

    let linked_key = docs.path().join("linked.txt").to_string_lossy().into_owned();
    assert_eq!(documents.len(), 2);
    assert_eq!(documents[&linked_key], "shared");
}

#[tokio::test]
async fn test_read_file_tool_uses_requested_folder() {
    let default_docs = TempDir::new().unwrap();
    fs::write(default_docs.path().join("default.txt"), "default").unwrap();
    let other_docs = TempDir::new().unwrap();
    fs::write(other_docs.path().join("other.txt"), "other").unwrap();

    let tool = ReadFolderTool::new(default_docs.path());

    let output = tool.execute(json!({})).await.unwrap();
    let key = default_docs.path().join("default.txt").to_string_lossy().into_owned();
    assert_eq!(output, json!({ key: "default" }));

    let output = tool
        .execute(json!({ "folder_path": other_docs.path().to_string_lossy() }))
        .await
        .unwrap();
    let key = other_docs.path().join("other.txt").to_string_lossy().into_owned();
    assert_eq!(output, json!({ key: "other" }));
}
