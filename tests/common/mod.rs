use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use pocketchat::storage::{KeyValueStore, SledStore};

/// Open a sled store in a fresh temporary directory
///
/// Keep the returned `TempDir` alive for as long as the store is used.
#[allow(dead_code)]
pub fn create_temp_store() -> (Arc<dyn KeyValueStore>, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let store = SledStore::open(tmp.path().join("store")).expect("failed to open sled store");
    (Arc::new(store), tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Body of a data stream response that replies with `deltas`
#[allow(dead_code)]
pub fn data_stream_body(deltas: &[&str]) -> String {
    let mut body = String::from("f:{\"messageId\":\"msg-test\"}\n");
    for delta in deltas {
        body.push_str(&format!("0:{}\n", serde_json::to_string(delta).expect("json string")));
    }
    body.push_str("e:{\"finishReason\":\"stop\",\"isContinued\":false}\n");
    body.push_str("d:{\"finishReason\":\"stop\",\"usage\":{\"promptTokens\":1,\"completionTokens\":1}}\n");
    body
}
