//! HTTP API integration tests against the simulated backend

use std::net::SocketAddr;
use std::path::Path;
use std::time::{Duration, Instant};

use multicap::application::CaptureService;
use multicap::domain::audio::{write_header, AudioStreamDescriptor, WavHeader, WAV_HEADER_SIZE};
use multicap::infrastructure::SimulatedBackend;
use multicap::web::{self, AppState};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct TestServer {
    base: String,
    backend: SimulatedBackend,
    client: reqwest::Client,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    async fn start(backend: SimulatedBackend, dir: &Path) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        let state = AppState::new(CaptureService::new(backend.clone(), dir));

        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(web::serve(listener, state, async move {
            let _ = rx.await;
        }));

        Self {
            base: format!("http://{}", addr),
            backend,
            client: reqwest::Client::new(),
            shutdown: Some(tx),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    async fn post_json(&self, path: &str, body: Value) -> reqwest::Response {
        self.client.post(self.url(path)).json(&body).send().await.unwrap()
    }

    async fn post(&self, path: &str) -> reqwest::Response {
        self.client.post(self.url(path)).send().await.unwrap()
    }

    async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server did not stop")
            .unwrap()
            .unwrap();
    }
}

async fn error_of(response: reqwest::Response) -> String {
    let body: Value = response.json().await.unwrap();
    body["error"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn lists_devices_with_type() {
    let dir = tempfile::tempdir().unwrap();
    let backend = SimulatedBackend::with_devices(["Mic", "Line In"]);
    backend.add_loopback("Speakers");
    let server = TestServer::start(backend, dir.path()).await;

    let response = server.get("/api/devices").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body,
        json!([
            {"index": 0, "name": "Mic", "type": "capture"},
            {"index": 1, "name": "Line In", "type": "capture"},
            {"index": 2, "name": "Speakers", "type": "loopback"}
        ])
    );

    server.shutdown().await;
}

#[tokio::test]
async fn enumeration_failure_is_500() {
    let dir = tempfile::tempdir().unwrap();
    let backend = SimulatedBackend::with_devices(["Mic"]);
    backend.fail_enumeration();
    let server = TestServer::start(backend, dir.path()).await;

    let response = server.get("/api/devices").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(error_of(response).await.contains("enumerate"));

    server.shutdown().await;
}

#[tokio::test]
async fn start_status_stop_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let backend = SimulatedBackend::with_devices(["Mic", "Line In"]);
    let server = TestServer::start(backend, dir.path()).await;

    let status: Value = server.get("/api/status").await.json().await.unwrap();
    assert_eq!(status, json!({"isRecording": false, "devices": []}));

    let response = server.post_json("/api/start", json!({"deviceIndices": [1, 0]})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "recording started");
    assert_eq!(body["files"].as_array().unwrap().len(), 2);

    let status: Value = server.get("/api/status").await.json().await.unwrap();
    assert_eq!(status, json!({"isRecording": true, "devices": ["Line In", "Mic"]}));

    assert!(server.backend.feed("Mic", &[5; 512]));
    assert!(server.backend.feed("Mic", &[5; 256]));
    assert!(server.backend.feed("Mic", &[5; 1024]));

    let response = server.post("/api/stop").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "recording stopped");
    let mic = body["files"]
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["device"] == "Mic")
        .unwrap();
    assert_eq!(mic["size"], 1792 + 44);

    let status: Value = server.get("/api/status").await.json().await.unwrap();
    assert_eq!(status["isRecording"], false);

    server.shutdown().await;
}

#[tokio::test]
async fn start_rejections_are_400() {
    let dir = tempfile::tempdir().unwrap();
    let backend = SimulatedBackend::with_devices(["Mic"]);
    let server = TestServer::start(backend, dir.path()).await;

    let response = server.post_json("/api/start", json!({"deviceIndices": []})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_of(response).await, "No devices selected");

    let response = server.post_json("/api/start", json!({"deviceIndices": [3]})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(error_of(response).await.contains("Invalid device index"));

    let response = server.post_json("/api/start", json!({"devices": [0]})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = server
        .client
        .post(server.url("/api/start"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = server.post_json("/api/start", json!({"deviceIndices": [0]})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = server.post_json("/api/start", json!({"deviceIndices": [0]})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_of(response).await, "Already recording");

    server.post("/api/stop").await;
    let response = server.post("/api/stop").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_of(response).await, "Not currently recording");

    server.shutdown().await;
}

#[tokio::test]
async fn stream_failure_is_500_and_rolled_back() {
    let dir = tempfile::tempdir().unwrap();
    let backend = SimulatedBackend::with_devices(["Mic", "Broken"]);
    backend.fail_open("Broken");
    let server = TestServer::start(backend, dir.path()).await;

    let response = server.post_json("/api/start", json!({"deviceIndices": [0, 1]})).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(error_of(response).await.contains("Broken"));

    let status: Value = server.get("/api/status").await.json().await.unwrap();
    assert_eq!(status["isRecording"], false);
    let recordings: Value = server.get("/api/recordings").await.json().await.unwrap();
    assert_eq!(recordings, json!([]));

    server.shutdown().await;
}

#[tokio::test]
async fn recordings_can_be_listed_and_downloaded() {
    let dir = tempfile::tempdir().unwrap();
    let backend = SimulatedBackend::with_devices(["Mic"]);
    let server = TestServer::start(backend, dir.path()).await;

    server.post_json("/api/start", json!({"deviceIndices": [0]})).await;
    server.backend.feed("Mic", &[9; 882]);
    server.post("/api/stop").await;

    let recordings: Value = server.get("/api/recordings").await.json().await.unwrap();
    let list = recordings.as_array().unwrap();
    assert_eq!(list.len(), 1);
    let name = list[0]["name"].as_str().unwrap().to_string();
    assert!(name.ends_with("_Mic.wav"));
    assert_eq!(list[0]["size"], 882 + 44);
    assert!(list[0]["time"].as_str().unwrap().contains(':'));
    assert!((list[0]["duration"].as_f64().unwrap() - 0.01).abs() < 1e-9);

    let response = server.get(&format!("/recordings/{}", name)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "audio/wav");
    assert_eq!(response.headers()["content-length"], (882 + 44).to_string().as_str());
    assert!(response.headers()["content-disposition"]
        .to_str()
        .unwrap()
        .starts_with("attachment"));

    let bytes = response.bytes().await.unwrap();
    assert_eq!(bytes.len(), 882 + 44);
    let header = WavHeader::decode(&bytes[..WAV_HEADER_SIZE]).unwrap();
    assert_eq!(header.payload_size, 882);

    server.shutdown().await;
}

#[tokio::test]
async fn large_download_is_streamed_whole() {
    let dir = tempfile::tempdir().unwrap();
    let payload_size = 6 * 1024 * 1024 + 2;
    let payload: Vec<u8> = (0..payload_size).map(|i| (i % 251) as u8).collect();

    let mut file = Vec::with_capacity(WAV_HEADER_SIZE + payload.len());
    let header = WavHeader::new(AudioStreamDescriptor::CAPTURE, payload_size as u32);
    write_header(&mut file, &header).unwrap();
    file.extend_from_slice(&payload);
    std::fs::write(dir.path().join("long_Mic.wav"), &file).unwrap();

    let server = TestServer::start(SimulatedBackend::with_devices(["Mic"]), dir.path()).await;

    let response = server.get("/recordings/long_Mic.wav").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.content_length(), Some(file.len() as u64));

    let bytes = response.bytes().await.unwrap();
    assert_eq!(bytes.len(), file.len());
    assert!(bytes[..] == file[..]);

    server.shutdown().await;
}

#[tokio::test(flavor = "current_thread")]
async fn status_during_slow_start_keeps_server_responsive() {
    let dir = tempfile::tempdir().unwrap();
    let backend = SimulatedBackend::with_devices(["Mic"]);
    backend.delay_open(Duration::from_millis(800));
    let server = TestServer::start(backend, dir.path()).await;

    let start = {
        let request = server
            .client
            .post(server.url("/api/start"))
            .json(&json!({"deviceIndices": [0]}));
        tokio::spawn(async move { request.send().await.unwrap() })
    };
    tokio::time::sleep(Duration::from_millis(150)).await;

    // Waits on the session lock held by the start above
    let status = {
        let request = server.client.get(server.url("/api/status"));
        tokio::spawn(async move { request.send().await.unwrap() })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let began = Instant::now();
    let response = server.get("/api/recordings").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        began.elapsed() < Duration::from_millis(400),
        "listing took {:?}",
        began.elapsed()
    );

    assert_eq!(start.await.unwrap().status(), StatusCode::OK);
    let status: Value = status.await.unwrap().json().await.unwrap();
    assert_eq!(status["isRecording"], true);

    server.post("/api/stop").await;
    server.shutdown().await;
}

#[tokio::test]
async fn download_rejects_bad_names() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("secret.txt"), "x").unwrap();
    let recordings = dir.path().join("recordings");
    let server = TestServer::start(SimulatedBackend::with_devices(["Mic"]), &recordings).await;

    let response = server.get("/recordings/..%2Fsecret.txt").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = server.get("/recordings/.hidden.wav").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = server.get("/recordings/missing.wav").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(error_of(response).await.contains("missing.wav"));

    server.shutdown().await;
}

#[tokio::test]
async fn shutdown_finalizes_active_session() {
    let dir = tempfile::tempdir().unwrap();
    let backend = SimulatedBackend::with_devices(["Mic"]);
    let server = TestServer::start(backend.clone(), dir.path()).await;

    server.post_json("/api/start", json!({"deviceIndices": [0]})).await;
    backend.feed("Mic", &[1; 1000]);
    server.shutdown().await;

    assert!(!backend.is_running("Mic"));
    let file = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .next()
        .unwrap();
    let bytes = std::fs::read(&file).unwrap();
    let header = WavHeader::decode(&bytes[..WAV_HEADER_SIZE]).unwrap();
    assert_eq!(header.payload_size, 1000);
    assert_eq!(header.total_size(), 1036);
}
