//! Integration tests: the full capture → encode → send → receive → render
//! cycle against a stub inference server on localhost UDP.

use std::time::{Duration, Instant};

use framecast_core::stream::render::class_color;
use framecast_core::{
    BoxRenderer, CastError, CycleReport, ImageSequenceSource, InferenceClient, Prediction,
    PredictionReply, ReplyStatus, TestPatternSource, TransportConfig,
};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

// ── Helpers ──────────────────────────────────────────────────────

/// Bind a server socket that answers every datagram with `reply`
/// (or stays silent when `reply` is `None`).
async fn stub_server(reply: Option<Vec<u8>>) -> (u16, JoinHandle<usize>) {
    let sock = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = sock.local_addr().unwrap().port();
    let handle = tokio::spawn(async move {
        let mut buf = vec![0u8; 65_536];
        let mut seen = 0;
        loop {
            let Ok((_, from)) = sock.recv_from(&mut buf).await else {
                return seen;
            };
            seen += 1;
            if let Some(reply) = &reply {
                let _ = sock.send_to(reply, from).await;
            }
        }
    });
    (port, handle)
}

fn person_reply() -> Vec<u8> {
    PredictionReply {
        predictions: vec![Prediction {
            x: 0.5,
            y: 0.5,
            width: 0.5,
            height: 0.5,
            class_name: "person".into(),
            confidence: 0.9,
        }],
    }
    .to_bytes()
}

fn config(port: u16, timeout: Duration) -> TransportConfig {
    TransportConfig::builder("127.0.0.1", port)
        .receive_timeout(timeout)
        .build()
        .unwrap()
}

async fn collect(
    client: &mut InferenceClient<TestPatternSource, BoxRenderer>,
) -> Result<Vec<CycleReport>, CastError> {
    let mut reports = Vec::new();
    client
        .run(CancellationToken::new(), |report, _| reports.push(report))
        .await?;
    Ok(reports)
}

// ── Round trips ──────────────────────────────────────────────────

#[tokio::test]
async fn test_full_pipeline_annotates_frames() {
    let (port, server) = stub_server(Some(person_reply())).await;
    let source = TestPatternSource::new(64, 48).with_limit(3);
    let mut client = InferenceClient::new(
        config(port, Duration::from_millis(500)),
        source,
        BoxRenderer::new(),
    );

    let reports = assert_ok!(collect(&mut client).await);
    assert_eq!(reports.len(), 3);
    for report in &reports {
        assert_eq!(report.reply, ReplyStatus::Received);
        assert_eq!(report.predictions.len(), 1);
        let sent = report.sent.unwrap();
        assert!(sent.bytes > 0 && sent.bytes <= 65_507);
        assert_eq!((sent.width, sent.height), (64, 48));
        // Left edge of the box at x = 0.25 * 64.
        assert_eq!(*report.frame.image().get_pixel(16, 24), class_color("person"));
    }

    let metrics = client.metrics();
    let telemetry = metrics.telemetry.as_ref().unwrap();
    assert_eq!(telemetry.frames_sent_total, 3);
    assert_eq!(telemetry.current_quality, 80);
    assert!(telemetry.avg_compression_ratio > 0.0);
    assert_eq!(
        metrics.prediction_summary.as_deref(),
        Some("Found 1 objects: 1 person")
    );
    assert_eq!(metrics.to_map()["frames_sent_total"], "3");

    client.stop();
    assert!(!client.is_running());
    server.abort();
}

#[tokio::test]
async fn test_non_json_reply_yields_no_predictions() {
    let (port, server) = stub_server(Some(b"ACK".to_vec())).await;
    let mut client = InferenceClient::new(
        config(port, Duration::from_millis(500)),
        TestPatternSource::new(32, 32).with_limit(2),
        BoxRenderer::new(),
    );

    let reports = assert_ok!(collect(&mut client).await);
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.reply == ReplyStatus::Received));
    assert!(reports.iter().all(|r| r.predictions.is_empty()));
    assert_eq!(
        client.metrics().prediction_summary.as_deref(),
        Some("No predictions")
    );
    server.abort();
}

// ── Degraded paths ───────────────────────────────────────────────

#[tokio::test]
async fn test_silent_server_times_out_and_continues() {
    let (port, server) = stub_server(None).await;
    let mut client = InferenceClient::new(
        config(port, Duration::from_millis(20)),
        TestPatternSource::new(32, 32).with_limit(3),
        BoxRenderer::new(),
    );

    let reports = assert_ok!(collect(&mut client).await);
    assert_eq!(reports.len(), 3);
    assert!(reports.iter().all(|r| r.reply == ReplyStatus::TimedOut));
    assert!(reports.iter().all(|r| r.sent.is_some()));

    let metrics = client.metrics();
    assert_eq!(metrics.telemetry.unwrap().frames_sent_total, 3);
    assert!(metrics.prediction_summary.is_none());
    assert!(client.latest_predictions().is_none());
    server.abort();
}

#[tokio::test]
async fn test_unfittable_frames_are_skipped() {
    let (port, server) = stub_server(Some(person_reply())).await;
    let cfg = TransportConfig::builder("127.0.0.1", port)
        .max_datagram_size(16)
        .receive_timeout(Duration::from_millis(20))
        .build()
        .unwrap();
    let mut client = InferenceClient::new(
        cfg,
        TestPatternSource::new(64, 64).with_limit(2),
        BoxRenderer::new(),
    );

    let reports = assert_ok!(collect(&mut client).await);
    assert_eq!(reports.len(), 2);
    for report in &reports {
        assert!(report.sent.is_none());
        assert_eq!(report.reply, ReplyStatus::Skipped);
        assert!(report.predictions.is_empty());
    }
    assert!(client.metrics().telemetry.is_none());
    assert_eq!(client.telemetry().frames_sent_total(), 0);
    server.abort();
}

#[tokio::test]
async fn test_source_failure_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("frame.jpg"), b"not an image").unwrap();
    let (port, server) = stub_server(Some(person_reply())).await;

    let source = ImageSequenceSource::open(dir.path()).unwrap();
    let mut client = InferenceClient::new(
        config(port, Duration::from_millis(20)),
        source,
        BoxRenderer::new(),
    );

    let err = assert_err!(client.run(CancellationToken::new(), |_, _| {}).await);
    assert!(matches!(err, CastError::Source(_)));
    client.stop();
    server.abort();
}

// ── Lifecycle and pacing ─────────────────────────────────────────

#[tokio::test]
async fn test_start_stop_are_idempotent() {
    let (port, server) = stub_server(None).await;
    let mut client = InferenceClient::new(
        config(port, Duration::from_millis(10)),
        TestPatternSource::new(8, 8),
        BoxRenderer::new(),
    );

    assert_ok!(client.start().await);
    let local = client.transport().local_addr();
    assert_ok!(client.start().await);
    assert_eq!(client.transport().local_addr(), local);

    client.stop();
    client.stop();
    assert!(!client.transport().is_connected());
    assert!(matches!(
        client.process_frame().await,
        Err(CastError::NotConnected)
    ));
    server.abort();
}

#[tokio::test]
async fn test_target_fps_paces_cycles() {
    let (port, server) = stub_server(Some(person_reply())).await;
    let mut client = InferenceClient::new(
        config(port, Duration::from_millis(200)),
        TestPatternSource::new(16, 16).with_limit(3),
        BoxRenderer::new(),
    )
    .with_target_fps(20);

    let started = Instant::now();
    let cycles = assert_ok!(client.run(CancellationToken::new(), |_, _| {}).await);
    assert_eq!(cycles, 3);
    assert!(started.elapsed() >= Duration::from_millis(100));
    server.abort();
}

#[tokio::test]
async fn test_cancel_stops_unbounded_source() {
    let (port, server) = stub_server(Some(person_reply())).await;
    let mut client = InferenceClient::new(
        config(port, Duration::from_millis(200)),
        TestPatternSource::new(16, 16),
        BoxRenderer::new(),
    )
    .with_target_fps(100);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let cycles = assert_ok!(
        client
            .run(cancel, move |_, _| {
                trigger.cancel();
            })
            .await
    );
    assert_eq!(cycles, 1);
    assert_eq!(client.source().produced(), 1);
    server.abort();
}
