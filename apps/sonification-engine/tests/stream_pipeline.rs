//! Stream Pipeline Integration Tests
//!
//! Tests the full data flow from tick injection through the flush cadence
//! to snapshot broadcast, coordinate mapping, and playback.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use parking_lot::Mutex;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use sonification_engine::{
    AudioCommand, ChannelAudioGraph, HubIndexObserver, IndexObserver, IngestService,
    PlaybackCursor, PlaybackSettings, SeriesBuffer, SharedPoints, SnapshotHub, SphereMapper,
    SpatialAudioEngine, Tick, MAX_RADIUS,
};

fn make_tick(secs: i64, close: f64, volume: f64) -> Tick {
    Tick {
        time: DateTime::from_timestamp(secs, 0).unwrap(),
        open: close - 0.5,
        high: close + 0.5,
        low: close - 1.0,
        close,
        volume,
        fluctuation_rate: 0.1,
    }
}

// =============================================================================
// Coalescing Scenarios
// =============================================================================

#[test]
fn same_second_ticks_coalesce_into_one_bucket() {
    let (mut buffer, sender) = SeriesBuffer::with_capacity(100);

    sender.send(make_tick(1, 100.0, 10.0));
    sender.send(make_tick(1, 102.0, 5.0));
    sender.send(make_tick(2, 98.0, 7.0));

    let snapshot = buffer.flush(None);

    assert_eq!(snapshot.len(), 2);
    let first = snapshot.get(0).unwrap();
    assert!((first.close - 102.0).abs() < f64::EPSILON);
    assert!((first.volume - 15.0).abs() < f64::EPSILON);
    let second = snapshot.get(1).unwrap();
    assert!((second.close - 98.0).abs() < f64::EPSILON);
    assert!((second.volume - 7.0).abs() < f64::EPSILON);
}

#[test]
fn snapshot_to_points_is_one_to_one_and_bounded() {
    let (mut buffer, sender) = SeriesBuffer::with_capacity(100);
    for secs in 0..50 {
        sender.send(make_tick(secs, 100.0 + f64::from(secs as i32), f64::from(secs as i32)));
    }

    let snapshot = buffer.flush(None);
    let points = SphereMapper::default().map(&snapshot);

    assert_eq!(points.len(), snapshot.len());
    for point in &points {
        assert!(point.magnitude() <= MAX_RADIUS + 1e-9);
        assert!(point.freq > 0.0);
    }
}

// =============================================================================
// Flush Cadence and Broadcast
// =============================================================================

#[tokio::test(start_paused = true)]
async fn ingest_publishes_on_cadence_and_tracks_the_cursor() {
    let (buffer, sender) = SeriesBuffer::with_capacity(100);
    let hub = Arc::new(SnapshotHub::with_defaults());
    let cursor = Arc::new(PlaybackCursor::new());
    let points: SharedPoints = Arc::new(Mutex::new(Vec::new()));

    let mut snapshots_rx = hub.snapshots_rx();
    let shutdown = CancellationToken::new();
    let ingest = IngestService::new(
        buffer,
        Arc::clone(&hub),
        Arc::clone(&cursor),
        Arc::clone(&points),
        Duration::from_secs(1),
    );
    let handle = tokio::spawn(ingest.run(shutdown.clone()));

    sender.send(make_tick(1, 100.0, 10.0));
    sender.send(make_tick(2, 105.0, 5.0));
    cursor.set(Some(1));

    // Receive flushes until the ticks have landed.
    let snapshot = loop {
        let snapshot = timeout(Duration::from_secs(5), snapshots_rx.recv())
            .await
            .unwrap()
            .unwrap();
        if !snapshot.is_empty() {
            break snapshot;
        }
    };

    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.active_index(), Some(1));
    assert_eq!(points.lock().len(), 2);

    shutdown.cancel();
    handle.await.unwrap();
}

// =============================================================================
// End-to-End Playback
// =============================================================================

#[tokio::test(start_paused = true)]
async fn flushed_series_plays_through_the_audio_graph() {
    // Ticks in, snapshot out, points mapped, sequence heard.
    let (mut buffer, sender) = SeriesBuffer::with_capacity(100);
    for secs in 0..4 {
        sender.send(make_tick(secs, 100.0 + 2.0 * f64::from(secs as i32), 5.0));
    }
    let snapshot = buffer.flush(None);
    let points = SphereMapper::default().map(&snapshot);
    assert_eq!(points.len(), 4);

    let hub = Arc::new(SnapshotHub::with_defaults());
    let cursor = Arc::new(PlaybackCursor::new());
    let observer = Arc::new(HubIndexObserver::new(Arc::clone(&hub), Arc::clone(&cursor)));
    let mut indices_rx = hub.indices_rx();

    let (graph, mut commands_rx) = ChannelAudioGraph::unbounded();
    let engine = SpatialAudioEngine::new(
        graph,
        observer as Arc<dyn IndexObserver>,
        PlaybackSettings::default(),
    );

    engine.play(points).unwrap();

    // The cursor follows the sounding index while the session runs.
    let first = timeout(Duration::from_secs(5), indices_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.index, Some(0));

    while engine.is_playing() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(cursor.get(), None);

    let mut notes = 0;
    while let Ok(command) = commands_rx.try_recv() {
        if matches!(command, AudioCommand::TriggerNote { .. }) {
            notes += 1;
        }
    }
    assert_eq!(notes, 4);
}
