//! File staging, announcement, upload, and cross-node download.

use std::time::Duration;

use parley_core::MessageKind;

use crate::*;

/// A stages a local file and announces it; B records the file message
/// and can download the bytes from A by fileId.
#[tokio::test]
async fn send_file_and_download_from_peer() {
    let a = spawn_node("file-a").await;
    let b = spawn_node("file-b").await;

    let a_id = a.node.profile().await.id;
    let b_record = a
        .node
        .connect_to_peer("127.0.0.1", b.port())
        .await
        .expect("handshake");

    let source = a.data_dir.join("report.txt");
    std::fs::write(&source, b"quarterly numbers").expect("write source");

    let sent = a
        .node
        .send_file(&b_record.id, &source)
        .await
        .expect("announcement");
    assert_eq!(sent.kind, MessageKind::File);
    let descriptor = sent.file_info.clone().expect("file info");
    assert_eq!(descriptor.original_name, "report.txt");
    assert_eq!(descriptor.size, 17);

    wait_until("B to record the file message", Duration::from_secs(5), || {
        !b.node.history(&a_id).is_empty()
    })
    .await;

    let inbox = b.node.history(&a_id);
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].id, sent.id);
    let received = inbox[0].file_info.as_ref().expect("file info");
    assert_eq!(received.download_url, descriptor.download_url);

    // B pulls the bytes from A's directory service.
    let resp = reqwest::get(&received.download_url)
        .await
        .expect("download request");
    assert!(resp.status().is_success());
    let disposition = resp
        .headers()
        .get("content-disposition")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.contains("report.txt"), "got: {disposition}");
    let bytes = resp.bytes().await.expect("download body");
    assert_eq!(&bytes[..], b"quarterly numbers");

    a.stop().await;
    b.stop().await;
}

/// The multipart upload endpoint stages bytes and answers a descriptor
/// whose downloadUrl resolves, by full id and by prefix.
#[tokio::test]
async fn upload_then_download_by_prefix() {
    let a = spawn_node("upload-a").await;

    let part = reqwest::multipart::Part::bytes(b"uploaded bytes".to_vec())
        .file_name("notes.md");
    let form = reqwest::multipart::Form::new().part("file", part);

    let descriptor: serde_json::Value = reqwest::Client::new()
        .post(format!("http://127.0.0.1:{}/upload", a.port()))
        .multipart(form)
        .send()
        .await
        .expect("upload request")
        .json()
        .await
        .expect("upload body");

    assert_eq!(descriptor["originalName"], "notes.md");
    assert_eq!(descriptor["size"], 14);
    let file_id = descriptor["fileId"].as_str().expect("fileId");

    let full = reqwest::get(format!(
        "http://127.0.0.1:{}/download/{}",
        a.port(),
        file_id
    ))
    .await
    .expect("download");
    assert!(full.status().is_success());
    assert_eq!(&full.bytes().await.expect("body")[..], b"uploaded bytes");

    let prefix = &file_id[..file_id.len() - 2];
    let by_prefix = reqwest::get(format!(
        "http://127.0.0.1:{}/download/{}",
        a.port(),
        prefix
    ))
    .await
    .expect("download by prefix");
    assert!(by_prefix.status().is_success());

    a.stop().await;
}

/// Unknown file ids answer a structured 404.
#[tokio::test]
async fn download_unknown_id_is_404() {
    let a = spawn_node("missing-file").await;

    let resp = reqwest::get(format!(
        "http://127.0.0.1:{}/download/1700000000000-424242",
        a.port()
    ))
    .await
    .expect("request");
    assert_eq!(resp.status().as_u16(), 404);
    let body: serde_json::Value = resp.json().await.expect("error body");
    assert!(body["error"].is_string());

    a.stop().await;
}
