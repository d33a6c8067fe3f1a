use super::*;
use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use shared::domain::EntryId;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
struct RecordedField {
    name: String,
    file_name: Option<String>,
    value: Vec<u8>,
}

#[derive(Clone, Default)]
struct ServerState {
    fields: Arc<Mutex<Vec<RecordedField>>>,
    report_ready: bool,
}

async fn record_fields(state: &ServerState, mut multipart: Multipart) -> Vec<RecordedField> {
    let mut recorded = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let value = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        recorded.push(RecordedField {
            name,
            file_name,
            value,
        });
    }
    state.fields.lock().await.extend(recorded.clone());
    recorded
}

async fn handle_upload(
    State(state): State<ServerState>,
    multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    let fields = record_fields(&state, multipart).await;
    let file_name = fields
        .iter()
        .find(|field| field.name == "file")
        .and_then(|field| field.file_name.clone())
        .unwrap_or_default();

    if !file_name.ends_with(".jpg") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Недопустимый формат файла" })),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "count": 2,
            "output_path": format!("static/uploads/result_{file_name}"),
            "history": {
                "id": "0b7e",
                "timestamp": "2025-04-01 10:00:00",
                "filename": file_name,
                "truck_count": 2,
                "output_path": format!("static/uploads/result_{file_name}")
            }
        })),
    )
}

async fn handle_rtsp(State(state): State<ServerState>, multipart: Multipart) -> Json<Value> {
    record_fields(&state, multipart).await;
    Json(json!({ "count": 1, "output_path": "" }))
}

async fn handle_history() -> Json<Value> {
    Json(json!([
        { "id": "0b7e", "timestamp": "2025-04-01 10:05:00", "filename": "RTSP_STREAM", "truck_count": 1, "output_path": "" },
        { "id": 1, "timestamp": "2025-04-01 10:00:00", "filename": "yard.jpg", "truck_count": 2, "output_path": "static/uploads/result_yard.jpg" }
    ]))
}

async fn handle_report(State(state): State<ServerState>) -> impl IntoResponse {
    if state.report_ready {
        (
            StatusCode::OK,
            [(
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"trucks.xlsx\"",
            )],
            b"PK\x03\x04".to_vec(),
        )
            .into_response()
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Отчет не создан" })),
        )
            .into_response()
    }
}

async fn spawn_counter_server(report_ready: bool) -> anyhow::Result<(String, ServerState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = ServerState {
        fields: Arc::new(Mutex::new(Vec::new())),
        report_ready,
    };
    let app = Router::new()
        .route("/upload", post(handle_upload))
        .route("/process_rtsp", post(handle_rtsp))
        .route("/history", get(handle_history))
        .route("/download_report", get(handle_report))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

async fn spawn_broken_server() -> anyhow::Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new()
        .route(
            "/history",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model exploded") }),
        )
        .route("/process_rtsp", post(|| async { "<html>not json</html>" }));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

#[tokio::test]
async fn upload_sends_file_and_extra_fields_as_multipart() {
    let (server_url, state) = spawn_counter_server(false).await.expect("spawn server");
    let backend = HttpBackend::new(&server_url, None).expect("backend");

    let mut form = UploadForm::new("yard.jpg", b"jpeg-bytes".to_vec());
    form.mime_type = Some("image/jpeg".into());
    form.extra_fields.push(("camera".into(), "north-gate".into()));

    let response = backend.upload(form).await.expect("upload");

    assert_eq!(response.count, Some(2));
    assert_eq!(
        response.output_path.as_deref(),
        Some("static/uploads/result_yard.jpg")
    );
    assert_eq!(
        response.history.map(|entry| entry.id),
        Some(EntryId::from("0b7e"))
    );

    let fields = state.fields.lock().await.clone();
    assert_eq!(
        fields,
        vec![
            RecordedField {
                name: "file".into(),
                file_name: Some("yard.jpg".into()),
                value: b"jpeg-bytes".to_vec(),
            },
            RecordedField {
                name: "camera".into(),
                file_name: None,
                value: b"north-gate".to_vec(),
            },
        ]
    );
}

#[tokio::test]
async fn upload_error_body_is_decoded_despite_bad_request_status() {
    let (server_url, _state) = spawn_counter_server(false).await.expect("spawn server");
    let backend = HttpBackend::new(&server_url, None).expect("backend");

    let response = backend
        .upload(UploadForm::new("notes.txt", b"text".to_vec()))
        .await
        .expect("upload");

    assert_eq!(response.error_message(), Some("Недопустимый формат файла"));
}

#[tokio::test]
async fn rtsp_posts_stream_url_and_treats_empty_path_as_missing() {
    let (server_url, state) = spawn_counter_server(false).await.expect("spawn server");
    let backend = HttpBackend::new(&server_url, None).expect("backend");

    let response = backend
        .process_rtsp(RtspForm::new("rtsp://10.0.0.5:554/live"))
        .await
        .expect("rtsp");

    assert_eq!(response.count, Some(1));
    assert_eq!(response.output_path, None);
    let fields = state.fields.lock().await.clone();
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].name, "rtsp_url");
    assert_eq!(fields[0].value, b"rtsp://10.0.0.5:554/live");
}

#[tokio::test]
async fn history_preserves_server_order_and_mixed_ids() {
    let (server_url, _state) = spawn_counter_server(false).await.expect("spawn server");
    let backend = HttpBackend::new(&format!("{server_url}/"), None).expect("backend");

    let entries = backend.history().await.expect("history");

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].id, EntryId::from("0b7e"));
    assert_eq!(entries[0].output_path, None);
    assert_eq!(entries[1].id, EntryId::Number(1));
    assert_eq!(
        entries[1].output_path.as_deref(),
        Some("static/uploads/result_yard.jpg")
    );
}

#[tokio::test]
async fn report_is_downloaded_with_attachment_name() {
    let (server_url, _state) = spawn_counter_server(true).await.expect("spawn server");
    let backend = HttpBackend::new(&server_url, None).expect("backend");

    let response = backend.download_report().await.expect("report");

    assert_eq!(
        response,
        ReportResponse::File(Report {
            file_name: "trucks.xlsx".into(),
            bytes: b"PK\x03\x04".to_vec(),
        })
    );
}

#[tokio::test]
async fn missing_report_returns_error_body() {
    let (server_url, _state) = spawn_counter_server(false).await.expect("spawn server");
    let backend = HttpBackend::new(&server_url, None).expect("backend");

    let response = backend.download_report().await.expect("report");

    assert_eq!(
        response,
        ReportResponse::Error(ApiError::new("Отчет не создан"))
    );
}

#[tokio::test]
async fn non_json_error_status_is_reported_as_status() {
    let server_url = spawn_broken_server().await.expect("spawn server");
    let backend = HttpBackend::new(&server_url, None).expect("backend");

    let err = backend.history().await.expect_err("history should fail");

    assert!(matches!(
        err,
        ClientError::Status {
            endpoint: HISTORY_PATH,
            status: 500
        }
    ));
}

#[tokio::test]
async fn non_json_success_body_is_a_decode_error() {
    let server_url = spawn_broken_server().await.expect("spawn server");
    let backend = HttpBackend::new(&server_url, None).expect("backend");

    let err = backend
        .process_rtsp(RtspForm::new("rtsp://camera/stream"))
        .await
        .expect_err("rtsp should fail");

    assert!(matches!(err, ClientError::Decode { .. }));
    assert_eq!(err.endpoint(), Some(PROCESS_RTSP_PATH));
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let backend = HttpBackend::new(&format!("http://{addr}"), None).expect("backend");

    let err = backend.history().await.expect_err("history should fail");

    assert!(matches!(err, ClientError::Transport { .. }));
}

#[test]
fn base_url_keeps_path_prefix() {
    let base = parse_base_url("http://counter.local:5000/app").expect("base url");

    assert_eq!(
        base.join(HISTORY_PATH).expect("join").as_str(),
        "http://counter.local:5000/app/history"
    );
    assert!(matches!(
        parse_base_url("not a url"),
        Err(ClientError::InvalidBaseUrl { .. })
    ));
}

async fn spawn_report_server(disposition: &'static str) -> anyhow::Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new().route(
        "/download_report",
        get(move || async move {
            (
                [(header::CONTENT_DISPOSITION, disposition)],
                b"PK\x03\x04".to_vec(),
            )
        }),
    );
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

#[tokio::test]
async fn report_name_with_parent_dirs_falls_back_to_default() {
    let server_url = spawn_report_server("attachment; filename=\"../../home/user/.bashrc\"")
        .await
        .expect("spawn server");
    let backend = HttpBackend::new(&server_url, None).expect("backend");

    let response = backend.download_report().await.expect("report");

    let ReportResponse::File(report) = response else {
        panic!("expected a report file, got {response:?}");
    };
    assert_eq!(report.file_name, "report.xlsx");
    assert_eq!(report.bytes, b"PK\x03\x04");
}

#[test]
fn attachment_names_must_be_bare_file_names() {
    assert_eq!(
        attachment_file_name("attachment; filename=\"trucks.xlsx\""),
        Some("trucks.xlsx".to_string())
    );
    assert_eq!(
        attachment_file_name("attachment; filename=report_2025.xlsx"),
        Some("report_2025.xlsx".to_string())
    );
    for hostile in [
        "attachment; filename=\"../../home/user/.bashrc\"",
        "attachment; filename=\"/etc/passwd\"",
        "attachment; filename=\"..\\\\evil.xlsx\"",
        "attachment; filename=\"C:evil.xlsx\"",
        "attachment; filename=\"..\"",
        "attachment; filename=\".profile\"",
        "attachment; filename=\"\"",
        "attachment",
    ] {
        assert_eq!(attachment_file_name(hostile), None, "{hostile}");
    }
}

#[tokio::test]
async fn invalid_mime_type_fails_before_sending() {
    let (server_url, state) = spawn_counter_server(false).await.expect("spawn server");
    let backend = HttpBackend::new(&server_url, None).expect("backend");
    let mut form = UploadForm::new("yard.jpg", b"jpeg".to_vec());
    form.mime_type = Some("not a mime".into());

    let err = backend.upload(form).await.expect_err("upload should fail");

    assert!(matches!(
        err,
        ClientError::InvalidMimeType { ref mime_type, .. } if mime_type == "not a mime"
    ));
    assert_eq!(err.endpoint(), None);
    assert!(state.fields.lock().await.is_empty());
}
