use std::time::Duration;

use bytes::Bytes;
use dashproxy::{
    mpd::RepresentationAddress,
    proxy::{OUTPUT_MANIFEST, REFRESH_INTERVAL},
    storage::memory::MemoryStorage,
    DashProxy, HttpClient, ProxyConfig, ProxyError, ProxyStorage, RefreshOutcome, Storage,
};
use reqwest::StatusCode;

use crate::{
    common::{
        config, init_test_tracing, mount_file, number_mpd, scripted_proxy, setup_mock_server,
        timeline_mpd, ScriptedTransport, MPD_URL,
    },
    AssertWrapper,
};

#[tokio::test]
async fn test_vod_end_to_end() -> anyhow::Result<()> {
    init_test_tracing();

    let body = number_mpd(None);
    let (mpd_url, server) = setup_mock_server(&body).await;
    for number in 1..=3 {
        mount_file(&server, &format!("/v0_{number}.m4s"), "fresh", 1).await;
    }

    let storage = MemoryStorage::new();
    storage.write("v0_2.m4s", Bytes::from_static(b"stale")).await?;

    let config = ProxyConfig::new(mpd_url.parse()?, "out");
    let mut proxy = DashProxy::new(config, HttpClient::default(), storage.clone());
    proxy.run().await?;

    assert_eq!(proxy.refresh_count(), 1);
    assert_eq!(proxy.downloaders().len(), 1);
    assert_eq!(
        storage.paths(),
        vec!["manifest.mpd", "v0_1.m4s", "v0_2.m4s", "v0_3.m4s"]
    );
    assert_eq!(storage.get("v0_2.m4s").assert_success(), "fresh");
    assert_eq!(storage.get(OUTPUT_MANIFEST).assert_success(), body.as_str());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_vod_single_cycle() -> anyhow::Result<()> {
    let (mut proxy, transport, storage) = scripted_proxy(config());
    transport.push_manifest(StatusCode::OK, &number_mpd(None));
    for number in 1..=3 {
        transport.add_file(&format!("https://example.com/live/v0_{number}.m4s"), "data");
    }

    proxy.run().await?;

    assert_eq!(transport.request_count(MPD_URL), 1);
    assert_eq!(transport.requests().len(), 4);
    assert_eq!(storage.write_count(OUTPUT_MANIFEST), 1);
    assert_eq!(proxy.refresh_count(), 1);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_live_refreshes_every_interval() -> anyhow::Result<()> {
    let (mut proxy, transport, storage) = scripted_proxy(config());
    // The declared update period does not change the schedule
    transport.push_manifest(StatusCode::OK, &number_mpd(Some("PT1H")));

    let result = tokio::time::timeout(REFRESH_INTERVAL * 2 + REFRESH_INTERVAL / 2, proxy.run()).await;
    assert!(result.is_err(), "a live proxy never stops by itself");

    assert_eq!(transport.request_count(MPD_URL), 3);
    assert_eq!(storage.write_count(OUTPUT_MANIFEST), 3);
    assert_eq!(proxy.refresh_count(), 3);
    // One downloader for the single representation, reused by each refresh
    assert_eq!(proxy.downloaders().len(), 1);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_manifest_fetch_is_retried() -> anyhow::Result<()> {
    let (mut proxy, transport, storage) = scripted_proxy(config());
    transport.push_manifest(StatusCode::SERVICE_UNAVAILABLE, "");
    transport.push_manifest(StatusCode::NOT_FOUND, "");
    transport.push_manifest(StatusCode::OK, &number_mpd(None));

    let started = tokio::time::Instant::now();
    proxy.run().await?;

    assert_eq!(transport.request_count(MPD_URL), 3);
    assert!(started.elapsed() >= Duration::from_secs(20));
    // Failed attempts are not refreshes
    assert_eq!(proxy.refresh_count(), 1);
    assert_eq!(storage.write_count(OUTPUT_MANIFEST), 1);

    Ok(())
}

#[tokio::test]
async fn test_mime_type_filter() -> anyhow::Result<()> {
    let config = ProxyConfig {
        mime_type: "video/mp4".to_string(),
        ..config()
    };
    let (mut proxy, transport, _storage) = scripted_proxy(config);

    let outcome = proxy.handle_manifest(&timeline_mpd()).await?;
    assert_eq!(outcome, RefreshOutcome::Live);

    let requests = transport.requests();
    assert_eq!(requests.len(), 4);
    assert!(requests.iter().all(|r| r.contains("/v0/")));
    assert!(!requests.iter().any(|r| r.contains("a0")));

    assert_eq!(proxy.downloaders().len(), 1);
    assert!(proxy
        .downloaders()
        .contains_key(&RepresentationAddress::new(0, 0, 0)));

    Ok(())
}

#[tokio::test]
async fn test_mime_type_filter_is_exact() -> anyhow::Result<()> {
    let config = ProxyConfig {
        mime_type: "VIDEO/MP4".to_string(),
        ..config()
    };
    let (mut proxy, transport, storage) = scripted_proxy(config);

    proxy.handle_manifest(&timeline_mpd()).await?;
    assert!(transport.requests().is_empty());
    assert!(proxy.downloaders().is_empty());
    // The snapshot is written even when nothing is selected
    assert_eq!(storage.paths(), vec![OUTPUT_MANIFEST]);

    Ok(())
}

#[tokio::test]
async fn test_downloaders_are_reused() -> anyhow::Result<()> {
    let (mut proxy, transport, _storage) = scripted_proxy(config());
    let body = timeline_mpd();

    proxy.handle_manifest(&body).await?;
    proxy.handle_manifest(&body).await?;

    let addr = RepresentationAddress::new(0, 0, 0);
    proxy.ensure_downloader(addr);
    proxy.ensure_downloader(addr);
    assert_eq!(proxy.downloaders().len(), 2);

    let downloader = &proxy.downloaders()[&addr];
    assert!(downloader.initialization_downloaded());
    assert_eq!(downloader.base_url(), "https://example.com/live/");

    // Both initialization requests fail, and neither is repeated
    assert_eq!(
        transport.request_count("https://example.com/live/v0/init.mp4"),
        1
    );
    assert_eq!(
        transport.request_count("https://example.com/live/a0/init.mp4"),
        1
    );
    // Timeline segments that failed are requested again on the next refresh
    assert_eq!(transport.request_count("https://example.com/live/v0/0.m4s"), 2);

    Ok(())
}

#[tokio::test]
async fn test_snapshot_keeps_manifest_shape() -> anyhow::Result<()> {
    let config = ProxyConfig {
        save_individual_manifests: true,
        ..config()
    };
    let (mut proxy, transport, storage) = scripted_proxy(config);
    transport.add_file("https://example.com/live/v0/0.m4s", "t0");

    let body = timeline_mpd();
    proxy.handle_manifest(&body).await?;
    proxy.handle_manifest(&body).await?;

    let snapshot = storage.get(OUTPUT_MANIFEST).assert_success();
    assert_eq!(snapshot, body.as_str());
    assert_eq!(String::from_utf8_lossy(&snapshot).matches("<S ").count(), 3);

    assert_eq!(storage.get("manifest.1.mpd").assert_success(), body.as_str());
    assert_eq!(storage.get("manifest.2.mpd").assert_success(), body.as_str());
    assert!(storage.get("manifest.3.mpd").is_none());
    assert_eq!(storage.get("v0/0.m4s").assert_success(), "t0");

    Ok(())
}

#[tokio::test]
async fn test_base_url_from_manifest() -> anyhow::Result<()> {
    let (mut proxy, transport, _storage) = scripted_proxy(config());
    let body = r#"<MPD mediaPresentationDuration="PT4S">
  <Location>https://cdn.example.com/moved/manifest.mpd</Location>
  <BaseURL>media/</BaseURL>
  <Period>
    <AdaptationSet mimeType="audio/mp4">
      <Representation id="a0" bandwidth="64000">
        <SegmentTemplate media="$RepresentationID$-$Number$.m4a" duration="4"/>
      </Representation>
    </AdaptationSet>
  </Period>
</MPD>"#;

    let outcome = proxy.handle_manifest(body).await?;
    assert_eq!(outcome, RefreshOutcome::Vod);
    assert_eq!(
        transport.requests(),
        vec!["https://cdn.example.com/moved/media/a0-1.m4a".to_string()]
    );

    Ok(())
}

#[tokio::test]
async fn test_structural_errors_are_fatal() -> anyhow::Result<()> {
    let (mut proxy, transport, storage) = scripted_proxy(config());

    let result = proxy
        .handle_manifest(r#"<MPD mediaPresentationDuration="PT4S"></MPD>"#)
        .await;
    assert!(matches!(result, Err(ProxyError::NoPeriod)));
    assert!(storage.paths().is_empty());

    proxy.handle_manifest("<MPD><Period>").await.assert_error();

    transport.push_manifest(StatusCode::OK, "<MPD><Period></MPD>");
    proxy.run().await.assert_error();
    assert!(storage.paths().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_later_periods_are_ignored() -> anyhow::Result<()> {
    let (mut proxy, transport, _storage) = scripted_proxy(config());
    let body = r#"<MPD mediaPresentationDuration="PT2S">
  <Period>
    <AdaptationSet>
      <Representation id="first" bandwidth="1">
        <SegmentTemplate media="$RepresentationID$_$Number$.m4s" duration="2"/>
      </Representation>
    </AdaptationSet>
  </Period>
  <Period>
    <AdaptationSet>
      <Representation id="second" bandwidth="1">
        <SegmentTemplate media="$RepresentationID$_$Number$.m4s" duration="2"/>
      </Representation>
    </AdaptationSet>
  </Period>
</MPD>"#;

    proxy.handle_manifest(body).await?;
    assert_eq!(
        transport.requests(),
        vec!["https://example.com/live/first_1.m4s".to_string()]
    );

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_run_over_memory_storage() -> anyhow::Result<()> {
    let transport = ScriptedTransport::new();
    transport.push_manifest(StatusCode::OK, &number_mpd(None));
    for number in 1..=3 {
        transport.add_file(&format!("https://example.com/live/v0_{number}.m4s"), "data");
    }

    let mut proxy = DashProxy::new(config(), transport.clone(), ProxyStorage::memory());
    proxy.run().await?;

    let ProxyStorage::Memory(storage) = proxy.storage() else {
        panic!("expected in-memory storage");
    };
    assert_eq!(
        storage.paths(),
        vec!["manifest.mpd", "v0_1.m4s", "v0_2.m4s", "v0_3.m4s"]
    );
    assert_eq!(storage.get("v0_3.m4s").assert_success(), "data");
    assert!(proxy.storage().location_hint().is_none());

    Ok(())
}

#[tokio::test]
async fn test_media_paths_stay_inside_output() -> anyhow::Result<()> {
    let (mut proxy, transport, storage) = scripted_proxy(config());
    let body = r#"<MPD mediaPresentationDuration="PT4S">
  <Period>
    <AdaptationSet mimeType="video/mp4">
      <Representation id="cdn" bandwidth="1">
        <SegmentTemplate media="https://cdn.example.org/media/seg_$Number$.m4s?token=abc" duration="4"/>
      </Representation>
      <Representation id="up" bandwidth="1">
        <SegmentTemplate media="../../$RepresentationID$/$Number$.m4s" duration="4"/>
      </Representation>
    </AdaptationSet>
  </Period>
</MPD>"#;
    transport.add_file("https://cdn.example.org/media/seg_1.m4s?token=abc", "cdn");
    transport.add_file("https://example.com/live/../../up/1.m4s", "up");

    proxy.handle_manifest(body).await?;

    // Absolute media is requested as written, relative media under the base URL
    assert_eq!(
        transport.requests(),
        vec![
            "https://cdn.example.org/media/seg_1.m4s?token=abc".to_string(),
            "https://example.com/live/../../up/1.m4s".to_string(),
        ]
    );
    // Host, query and parent components never reach the storage path
    assert_eq!(
        storage.paths(),
        vec![OUTPUT_MANIFEST, "media/seg_1.m4s", "up/1.m4s"]
    );
    assert_eq!(storage.get("media/seg_1.m4s").assert_success(), "cdn");
    assert_eq!(storage.get("up/1.m4s").assert_success(), "up");

    Ok(())
}

#[tokio::test]
async fn test_snapshot_is_byte_exact() -> anyhow::Result<()> {
    let config = ProxyConfig {
        mime_type: "text/plain".to_string(),
        ..config()
    };
    let (mut proxy, _transport, storage) = scripted_proxy(config);

    // Not valid UTF-8 inside a comment
    let mut body = b"<!-- \xff\xfe -->\n".to_vec();
    body.extend_from_slice(timeline_mpd().as_bytes());

    let outcome = proxy.handle_manifest(&body).await?;
    assert_eq!(outcome, RefreshOutcome::Live);
    assert_eq!(storage.get(OUTPUT_MANIFEST).assert_success(), body);

    Ok(())
}
