mod common;

use common::{cid, client_for, fast_config, mount_blob, mount_status, slow};
use signvault::{BatchReport, GatewayClient, RetrievalOutcome, StorageError};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer};

#[tokio::test]
async fn test_one_missing_blob_does_not_abort_batch() {
    let server = MockServer::start().await;
    mount_blob(&server, "bafya", b"alpha").await;
    mount_status(&server, "bafyb", 404).await;
    mount_blob(&server, "bafyc", b"charlie").await;

    let client = client_for(&server);
    let ids = vec![cid("bafya"), cid("bafyb"), cid("bafyc")];
    let outcomes = client.retrieve_batch(&ids, None).await.unwrap();

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[&ids[0]], RetrievalOutcome::Bytes(b"alpha".to_vec()));
    assert!(matches!(
        outcomes[&ids[1]],
        RetrievalOutcome::Failure(StorageError::NotFound(_))
    ));
    assert_eq!(outcomes[&ids[2]], RetrievalOutcome::Bytes(b"charlie".to_vec()));
    assert_eq!(outcomes.failed(), 1);
}

#[tokio::test]
async fn test_mixed_failures_are_classified_per_item() {
    let server = MockServer::start().await;
    mount_blob(&server, "bafyok", b"ok").await;
    mount_status(&server, "bafy500", 500).await;
    mount_status(&server, "bafy429", 429).await;

    let client = client_for(&server);
    let ids = vec![cid("bafyok"), cid("bafy500"), cid("bafy429")];
    let outcomes = client.retrieve_batch(&ids, None).await.unwrap();

    assert!(outcomes[&ids[0]].is_success());
    assert!(matches!(
        outcomes[&ids[1]],
        RetrievalOutcome::Failure(StorageError::Upstream {
            status: Some(500),
            ..
        })
    ));
    assert!(matches!(
        outcomes[&ids[2]],
        RetrievalOutcome::Failure(StorageError::RateLimited(_))
    ));
}

#[tokio::test]
async fn test_batch_to_destination_dir() {
    let server = MockServer::start().await;
    mount_blob(&server, "bafyimg1", b"image one").await;
    mount_blob(&server, "bafyimg2", b"image two").await;
    mount_status(&server, "bafyimg3", 404).await;

    let dir = TempDir::new().unwrap();
    let out = dir.path().join("output").join("images");

    let client = client_for(&server);
    let ids = vec![cid("bafyimg1"), cid("bafyimg2"), cid("bafyimg3")];
    let outcomes = client.retrieve_batch(&ids, Some(&out)).await.unwrap();

    assert_eq!(
        outcomes[&ids[0]],
        RetrievalOutcome::SavedTo(out.join("bafyimg1"))
    );
    assert_eq!(std::fs::read(out.join("bafyimg2")).unwrap(), b"image two");
    assert!(!out.join("bafyimg3").exists());
    assert_eq!(std::fs::read_dir(&out).unwrap().count(), 2);
}

#[tokio::test]
async fn test_duplicate_identifiers_collapse() {
    let server = MockServer::start().await;
    mount_blob(&server, "bafydup", b"dup").await;

    let client = client_for(&server);
    let ids = vec![cid("bafydup"), cid("bafydup"), cid("bafydup")];
    let outcomes = client.retrieve_batch(&ids, None).await.unwrap();

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[&ids[0]], RetrievalOutcome::Bytes(b"dup".to_vec()));
    // each duplicate is still fetched independently
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_in_flight_never_exceeds_capacity() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex("^/ipfs/.+$"))
        .respond_with(slow(b"payload", 100))
        .mount(&server)
        .await;

    let client = GatewayClient::new(signvault::ClientConfig {
        max_concurrent_requests: 3,
        ..fast_config(&server)
    })
    .unwrap();

    let ids: Vec<_> = (0..12).map(|i| cid(&format!("bafyload{}", i))).collect();
    let outcomes = client.retrieve_batch(&ids, None).await.unwrap();

    assert_eq!(outcomes.succeeded(), 12);
    assert!(client.gate().peak_in_flight() <= 3);
    assert!(client.gate().peak_in_flight() >= 1);
    assert_eq!(client.gate().in_flight(), 0);
}

#[tokio::test]
async fn test_concurrent_batches_share_one_gate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex("^/ipfs/.+$"))
        .respond_with(slow(b"payload", 50))
        .mount(&server)
        .await;

    let client = GatewayClient::new(signvault::ClientConfig {
        max_concurrent_requests: 2,
        ..fast_config(&server)
    })
    .unwrap();

    let first: Vec<_> = (0..6).map(|i| cid(&format!("bafyfirst{}", i))).collect();
    let second: Vec<_> = (0..6).map(|i| cid(&format!("bafysecond{}", i))).collect();

    let other = client.clone();
    let (a, b) = tokio::join!(
        client.retrieve_batch(&first, None),
        other.retrieve_batch(&second, None)
    );

    assert_eq!(a.unwrap().succeeded(), 6);
    assert_eq!(b.unwrap().succeeded(), 6);
    assert!(client.gate().peak_in_flight() <= 2);
}

#[tokio::test]
async fn test_batch_respects_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex("^/ipfs/.+$"))
        .respond_with(slow(b"x", 0))
        .mount(&server)
        .await;

    let client = GatewayClient::new(signvault::ClientConfig {
        rate_limit_per_window: 4,
        rate_window_ms: 200,
        ..fast_config(&server)
    })
    .unwrap();

    // 12 requests at 4 per 200ms need at least two full window waits.
    let ids: Vec<_> = (0..12).map(|i| cid(&format!("bafyrate{}", i))).collect();
    let start = Instant::now();
    let outcomes = client.retrieve_batch(&ids, None).await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(outcomes.succeeded(), 12);
    assert!(elapsed >= Duration::from_millis(300), "elapsed {:?}", elapsed);
}

#[tokio::test]
async fn test_client_reused_across_batches() {
    let server = MockServer::start().await;
    mount_blob(&server, "bafyreuse", b"again").await;

    let client = client_for(&server);
    for _ in 0..3 {
        let outcomes = client
            .retrieve_batch(&[cid("bafyreuse")], None)
            .await
            .unwrap();
        assert_eq!(outcomes.succeeded(), 1);
    }
    assert_eq!(client.gate().in_flight(), 0);
}
