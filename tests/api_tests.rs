//! Read-store API tests
//!
//! Drives the axum router against a data directory of SAM files, and runs a
//! real server for the client and fetcher.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use readgraph::client::api::ReadStoreClient;
use readgraph::client::fetcher::{FetchConfig, FetchEvent, RangeRequest, ReadFetcher};
use readgraph::core::api::{ReadsetQuery, SearchReadsParams};
use readgraph::readstore::{ReadStore, StoreConfig};
use readgraph::web::server::create_router;
use readgraph::{PaginationMode, QueryType};

const SAM: &str = "@HD\tVN:1.6\tSO:coordinate
@SQ\tSN:chr1\tLN:1000
@SQ\tSN:chr2\tLN:500
@RG\tID:rg1\tSM:NA12878
r1\t0\tchr1\t11\t60\t10M\t*\t0\t0\tACGTACGTAC\tIIIIIIIIII
r2\t16\tchr1\t15\t60\t10M\t*\t0\t0\tACGTACGTAC\tIIIIIIIIII
r3\t0\tchr1\t21\t60\t5M2D5M\t*\t0\t0\tACGTAACGTA\tIIIIIIIIII
r4\t0\tchr1\t31\t60\t10M\t*\t0\t0\tACGTACGTAC\t*
r5\t16\tchr1\t101\t60\t4M\t*\t0\t0\tACGT\tIIII
r6\t0\tchr2\t1\t60\t4M\t*\t0\t0\tACGT\tIIII
";

const SNPS: &str = "name\tchr\tposition\nrs7412\tchr1\t25\n";

fn data_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let dataset = dir.path().join("platinum");
    std::fs::create_dir(&dataset).unwrap();
    std::fs::write(dataset.join("NA12878.sam"), SAM).unwrap();
    std::fs::write(dir.path().join("snps.tsv"), SNPS).unwrap();
    dir
}

fn open_store(dir: &Path) -> ReadStore {
    let config = StoreConfig::new(dir)
        .with_page_size(2)
        .with_snp_table(dir.join("snps.tsv"));
    ReadStore::open(&config).unwrap()
}

fn router(dir: &Path) -> Router {
    create_router(Arc::new(open_store(dir)), false).unwrap()
}

async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn readset_id(router: &Router) -> String {
    let (_, body) = get_json(router, "/api/readsets").await;
    body["readsets"][0]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_counts_readsets() {
    let dir = data_dir();
    let (status, body) = get_json(&router(dir.path()), "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["readsets"], 1);
}

#[tokio::test]
async fn test_readsets_by_dataset_and_id() {
    let dir = data_dir();
    let router = router(dir.path());

    let (_, body) = get_json(&router, "/api/readsets?datasetId=platinum").await;
    assert_eq!(body["readsets"][0]["name"], "NA12878");
    assert!(body.get("fileData").is_none());

    let (_, body) = get_json(&router, "/api/readsets?datasetId=other").await;
    assert_eq!(body["readsets"].as_array().unwrap().len(), 0);

    let id = readset_id(&router).await;
    let (status, body) = get_json(&router, &format!("/api/readsets?readsetId={id}&backend=LOCAL")).await;
    assert_eq!(status, StatusCode::OK);
    let sequences = &body["fileData"][0]["refSequences"];
    assert_eq!(sequences[0]["name"], "chr1");
    assert_eq!(sequences[0]["length"], 1000);
    assert_eq!(sequences[1]["name"], "chr2");
}

#[tokio::test]
async fn test_reads_follow_page_tokens() {
    let dir = data_dir();
    let router = router(dir.path());
    let id = readset_id(&router).await;

    let mut names = Vec::new();
    let mut pages = 0;
    let mut token: Option<String> = None;
    loop {
        let mut uri = format!(
            "/api/reads?readsetIds={id}&sequenceName=chr1&sequenceStart=0&sequenceEnd=1000&type=reads"
        );
        if let Some(token) = &token {
            uri.push_str(&format!("&pageToken={token}"));
        }
        let (status, body) = get_json(&router, &uri).await;
        assert_eq!(status, StatusCode::OK);
        pages += 1;
        for read in body["reads"].as_array().unwrap() {
            names.push(read["name"].as_str().unwrap().to_string());
        }
        match body.get("nextPageToken").and_then(Value::as_str) {
            Some(next) => token = Some(next.to_string()),
            None => break,
        }
    }

    assert_eq!(pages, 3);
    assert_eq!(names, vec!["r1", "r2", "r3", "r4", "r5"]);
}

#[tokio::test]
async fn test_reads_accept_target_and_bare_sequence_name() {
    let dir = data_dir();
    let router = router(dir.path());
    let id = readset_id(&router).await;

    let uri = format!("/api/reads?readsetIds={id}&target=1&sequenceStart=95&sequenceEnd=200");
    let (status, body) = get_json(&router, &uri).await;
    assert_eq!(status, StatusCode::OK);
    let reads = body["reads"].as_array().unwrap();
    assert_eq!(reads.len(), 1);
    assert_eq!(reads[0]["name"], "r5");
    assert_eq!(reads[0]["position"], 100);
}

#[tokio::test]
async fn test_coverage() {
    let dir = data_dir();
    let router = router(dir.path());
    let id = readset_id(&router).await;

    let uri = format!(
        "/api/reads?readsetIds={id}&sequenceName=chr1&sequenceStart=10&sequenceEnd=20&type=coverage"
    );
    let (status, body) = get_json(&router, &uri).await;
    assert_eq!(status, StatusCode::OK);
    let coverage = body["coverage"].as_array().unwrap();
    assert_eq!(coverage.len(), 10);
    assert_eq!(coverage[0]["position"], 10);
    assert_eq!(coverage[0]["depth"], 1);
    assert_eq!(coverage[4]["position"], 14);
    assert_eq!(coverage[4]["depth"], 2);
    assert!(body.get("nextPageToken").is_some_and(Value::is_null));
}

#[tokio::test]
async fn test_bad_requests() {
    let dir = data_dir();
    let router = router(dir.path());
    let id = readset_id(&router).await;

    let uri = format!(
        "/api/reads?readsetIds={id}&sequenceName=chr1&sequenceStart=0&sequenceEnd=1000&pageToken=zz"
    );
    let (status, body) = get_json(&router, &uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "invalid_page_token");
    assert!(body["details"].is_null());

    let uri = format!("/api/reads?readsetIds={id}&sequenceName=chr1&sequenceStart=500&sequenceEnd=10");
    let (status, body) = get_json(&router, &uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "validation_error");

    let (status, _) = get_json(&router, "/api/readsets?readsetId=missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_snp_lookup() {
    let dir = data_dir();
    let router = router(dir.path());

    let (status, body) = get_json(&router, "/api/snps?snp=RS7412").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["chr"], "chr1");
    assert_eq!(body["position"], 25);
    assert_eq!(body["link"], "http://www.snpedia.com/index.php/rs7412");

    let (_, body) = get_json(&router, "/api/snps?snp=rs1").await;
    assert_eq!(body["position"], -1);
}

#[tokio::test]
async fn test_security_headers() {
    let dir = data_dir();
    let response = router(dir.path())
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
}

/// Serve the store on an ephemeral port and return its base URL
async fn spawn_server(dir: &Path) -> String {
    let app = router(dir);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_client_against_server() {
    let dir = data_dir();
    let url = spawn_server(dir.path()).await;
    let client = ReadStoreClient::new(&url, Duration::from_secs(5)).unwrap();

    assert_eq!(client.health().await.unwrap().readsets, 1);

    let readsets = client.readsets(&ReadsetQuery::default()).await.unwrap();
    let id = readsets.readsets[0].id.clone();

    let params = SearchReadsParams::new(&[id.clone()], "chr1", 0, 1000);
    let page = client.reads(&params).await.unwrap();
    assert_eq!(page.reads.len(), 2);
    assert!(page.next_page_token.is_some());

    let coverage = client.coverage(&SearchReadsParams::new(&[id], "chr1", 100, 104)).await.unwrap();
    assert_eq!(coverage.coverage.len(), 4);

    let snp = client.snp("rs7412").await.unwrap();
    assert!(snp.is_found());

    let err = client
        .reads(&SearchReadsParams::new(&["missing".to_string()], "chr1", 0, 10))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Unknown readset"));
}

#[tokio::test]
async fn test_fetcher_lays_out_all_pages() {
    let dir = data_dir();
    let url = spawn_server(dir.path()).await;
    let client = ReadStoreClient::new(&url, Duration::from_secs(5)).unwrap();
    let id = client.readsets(&ReadsetQuery::default()).await.unwrap().readsets[0]
        .id
        .clone();

    for pagination in [PaginationMode::Accumulate, PaginationMode::Incremental] {
        let config = FetchConfig {
            debounce: Duration::ZERO,
            pagination,
            ..FetchConfig::default()
        };
        let (fetcher, mut events) = ReadFetcher::spawn(client.clone(), config);
        fetcher.request(RangeRequest {
            readset_ids: vec![id.clone()],
            sequence_name: "chr1".to_string(),
            start: 0,
            end: 1000,
            query_type: QueryType::Reads,
        });

        let layout = loop {
            match events.recv().await.unwrap() {
                FetchEvent::Layout {
                    layout,
                    complete: true,
                    ..
                } => break layout,
                FetchEvent::Notification(n) => panic!("unexpected notification: {}", n.message),
                _ => {}
            }
        };

        assert_eq!(layout.reads.len(), 5);
        // r1 [10,20), r2 [14,24), r3 [20,32), r4 [30,40), r5 [100,104)
        let tracks: Vec<usize> = layout.reads.iter().map(|r| r.track).collect();
        assert_eq!(tracks, vec![0, 1, 0, 1, 0]);
        assert_eq!(layout.track_count, 2);
        assert!(layout.reads[1].reverse);

        fetcher.shutdown().await;
    }
}
