//! HTTP adapter tests against a server bound to an ephemeral port.

mod common;

use base64::Engine;
use bill_viewer::config::Config;
use common::{pdf_with_pages, FixturePage};
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

async fn spawn_server(candidates: Vec<PathBuf>) -> String {
    let mut config = Config::minimal();
    config.sources.candidates = candidates;
    let app = bill_viewer::server::router(&config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn create_session(client: &reqwest::Client, base: &str) -> String {
    let resp = client
        .post(format!("{}/sessions", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_ok() {
    let base = spawn_server(vec![]).await;
    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn folder_listing_pages_and_download() {
    let tmp = TempDir::new().unwrap();
    let bytes = pdf_with_pages(&[FixturePage::Text("Water bill"), FixturePage::Blank]);
    fs::write(tmp.path().join("Water.pdf"), &bytes).unwrap();
    fs::write(tmp.path().join("notes.txt"), "x").unwrap();

    let base = spawn_server(vec![tmp.path().join("missing"), tmp.path().to_path_buf()]).await;
    let client = reqwest::Client::new();
    let id = create_session(&client, &base).await;

    let catalog: Value = client
        .get(format!("{}/sessions/{}/documents", base, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(catalog["source_kind"], "local_absolute");
    assert_eq!(catalog["documents"].as_array().unwrap().len(), 1);
    assert_eq!(catalog["documents"][0]["name"], "Water.pdf");

    let doc: Value = client
        .get(format!("{}/sessions/{}/documents/Water.pdf/pages", base, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let pages = doc["pages"].as_array().unwrap();
    assert_eq!(pages.len(), 2);
    assert!(pages[0]["text"].as_str().unwrap().contains("Water bill"));
    assert_eq!(pages[1]["extractable"], false);

    let resp = client
        .get(format!("{}/sessions/{}/documents/Water.pdf/download", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "application/pdf");
    assert!(resp.headers()["content-disposition"]
        .to_str()
        .unwrap()
        .contains("Water.pdf"));
    assert_eq!(resp.bytes().await.unwrap().as_ref(), bytes.as_slice());
}

#[tokio::test]
async fn upload_flow_and_session_isolation() {
    let tmp = TempDir::new().unwrap();
    let base = spawn_server(vec![tmp.path().join("bills")]).await;
    let client = reqwest::Client::new();
    let first = create_session(&client, &base).await;
    let second = create_session(&client, &base).await;

    let resp = client
        .get(format!("{}/sessions/{}/documents", base, first))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "source_not_found");

    let pdf = pdf_with_pages(&[
        FixturePage::Text("first page"),
        FixturePage::Text("second page"),
    ]);
    let encoded = base64::engine::general_purpose::STANDARD.encode(&pdf);
    let resp = client
        .post(format!("{}/sessions/{}/uploads", base, first))
        .json(&json!({ "files": [{ "name": "bill1.pdf", "content_base64": encoded }] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let catalog: Value = resp.json().await.unwrap();
    assert_eq!(catalog["source_kind"], "ephemeral_upload");
    assert!(catalog["source_path"].is_null());
    assert_eq!(catalog["documents"][0]["name"], "bill1.pdf");

    let doc: Value = client
        .get(format!("{}/sessions/{}/documents/bill1.pdf/pages", base, first))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(doc["pages"].as_array().unwrap().len(), 2);

    // The other session does not see the upload.
    let resp = client
        .get(format!("{}/sessions/{}/documents/bill1.pdf/pages", base, second))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    let resp = client
        .delete(format!("{}/sessions/{}", base, first))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);
    let resp = client
        .get(format!("{}/sessions/{}/documents", base, first))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn error_statuses_are_distinct() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("bad.pdf"), b"garbage").unwrap();
    let base = spawn_server(vec![tmp.path().to_path_buf()]).await;
    let client = reqwest::Client::new();
    let id = create_session(&client, &base).await;

    let resp = client
        .get(format!("{}/sessions/{}/documents/bad.pdf/pages", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "document_open_failure");

    let resp = client
        .get(format!("{}/sessions/{}/documents/missing.pdf/download", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = client
        .post(format!("{}/sessions/{}/uploads", base, id))
        .json(&json!({ "files": [{ "name": "x.pdf", "content_base64": "***" }] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .get(format!("{}/sessions/not-a-uuid/documents", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn refresh_picks_up_new_files() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("a.pdf"), b"%PDF").unwrap();
    let base = spawn_server(vec![tmp.path().to_path_buf()]).await;
    let client = reqwest::Client::new();
    let id = create_session(&client, &base).await;

    let catalog: Value = client
        .get(format!("{}/sessions/{}/documents", base, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(catalog["documents"].as_array().unwrap().len(), 1);

    fs::write(tmp.path().join("b.pdf"), b"%PDF").unwrap();
    let catalog: Value = client
        .post(format!("{}/sessions/{}/refresh", base, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(catalog["documents"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn download_keeps_non_ascii_file_name() {
    let tmp = TempDir::new().unwrap();
    let base = spawn_server(vec![tmp.path().join("bills")]).await;
    let client = reqwest::Client::new();
    let id = create_session(&client, &base).await;

    let pdf = pdf_with_pages(&[FixturePage::Text("Montant 42")]);
    let encoded = base64::engine::general_purpose::STANDARD.encode(&pdf);
    let resp = client
        .post(format!("{}/sessions/{}/uploads", base, id))
        .json(&json!({ "files": [{ "name": "Facture-été.pdf", "content_base64": encoded }] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .get(format!(
            "{}/sessions/{}/documents/Facture-été.pdf/download",
            base, id
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let disposition = resp.headers()["content-disposition"].to_str().unwrap();
    assert!(disposition.contains("filename=\"Facture-_t_.pdf\""));
    assert!(disposition.contains("filename*=UTF-8''Facture-%C3%A9t%C3%A9.pdf"));
    assert_eq!(resp.bytes().await.unwrap().as_ref(), pdf.as_slice());
}
