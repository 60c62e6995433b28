// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::http::test_server::serve_once;

#[test]
fn parse_datasetlist_reads_access_type() {
    let body = json!([
        {"dataset": "/RelValTTbar/CMSSW_14_0_0-v1/GEN-SIM", "dataset_access_type": "VALID"},
        {"dataset": "/Other/Run2024A-v1/RAW"}
    ]);
    let records = parse_datasetlist(body).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].access_type, "VALID");
    assert_eq!(records[1].access_type, "");
}

#[yare::parameterized(
    scalar_runs = { json!([{"run_num": 12345}, {"run_num": 12346}]), vec![12345, 12346] },
    list_runs = { json!([{"run_num": [1, 2, 3]}]), vec![1, 2, 3] },
    no_runs = { json!([]), vec![] },
)]
fn parse_runs_accepts_both_shapes(body: Value, expected: Vec<u64>) {
    assert_eq!(parse_runs(body).unwrap(), expected);
}

#[test]
fn parse_runs_rejects_object() {
    assert!(matches!(
        parse_runs(json!({"run_num": 1})),
        Err(CatalogError::UnexpectedResponse(_))
    ));
}

#[tokio::test]
async fn list_posts_dataset_query() {
    let (url, server) = serve_once(
        200,
        r#"[{"dataset":"/A/B-v1/RAW","dataset_access_type":"VALID"}]"#,
    )
    .await;
    let catalog = RestDatasetCatalog::new(HttpConfig::new(url)).unwrap();

    let records = catalog.list(&["/A/B-v1/RAW".to_string()]).await.unwrap();
    assert_eq!(records[0].name, "/A/B-v1/RAW");

    let request = server.await.unwrap();
    assert!(
        request.starts_with("POST /dbs/prod/global/DBSReader/datasetlist "),
        "got: {request}"
    );
    assert!(request.contains(r#""dataset_access_type":"*""#));
}

#[tokio::test]
async fn runs_queries_dataset() {
    let (url, server) = serve_once(200, r#"[{"run_num":12345}]"#).await;
    let catalog = RestDatasetCatalog::new(HttpConfig::new(url)).unwrap();

    let runs = catalog.runs("/A/B-v1/RAW").await.unwrap();
    assert_eq!(runs, vec![12345]);

    let request = server.await.unwrap();
    assert!(
        request.starts_with("GET /dbs/prod/global/DBSReader/runs?dataset=%2FA%2FB-v1%2FRAW "),
        "got: {request}"
    );
}

#[tokio::test]
async fn empty_inputs_skip_requests() {
    let catalog = RestDatasetCatalog::new(HttpConfig::new("http://127.0.0.1:9")).unwrap();
    assert!(catalog.list(&[]).await.unwrap().is_empty());
    assert!(catalog.runs("").await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_body_is_empty_list() {
    let (url, _server) = serve_once(200, "").await;
    let catalog = RestDatasetCatalog::new(HttpConfig::new(url)).unwrap();
    assert!(catalog
        .list(&["/A/B-v1/RAW".to_string()])
        .await
        .unwrap()
        .is_empty());
}
