//! HTTP index clients against a canned local server.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use ontocheck::config::IndexConfig;
use ontocheck::index::{AnnotatorClient, HttpContext, IndexClient, IndexError, SearchClient};

/// Serve one request with `status` and `body`, sending the raw request back.
fn serve_once(status: &str, body: &str, delay: Duration) -> (String, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        let _ = tx.send(String::from_utf8_lossy(&request).to_string());
        thread::sleep(delay);
        let _ = stream.write_all(response.as_bytes());
    });

    (url, rx)
}

fn index_config(api_key: Option<&str>, timeout_ms: u64) -> IndexConfig {
    IndexConfig {
        api_key: api_key.map(str::to_string),
        timeout_ms,
        ..IndexConfig::default()
    }
}

#[test]
fn test_annotator_counts_annotations() {
    let (url, requests) = serve_once("200 OK", r#"[{"id":1},{"id":2}]"#, Duration::ZERO);
    let client = AnnotatorClient::new(
        HttpContext::new().unwrap(),
        format!("{}/annotator", url),
        &index_config(Some("secret"), 5_000),
    );

    assert_eq!(client.query("Heart\tLung", "ACR").unwrap(), 2);

    let request = requests.recv().unwrap();
    assert!(request.starts_with("GET /annotator?"));
    assert!(request.contains("text=Heart+Lung"));
    assert!(request.contains("ontologies=ACR"));
    assert!(request.contains("whole_word_only=true"));
    assert!(request
        .to_lowercase()
        .contains("authorization: apikey token=secret"));
}

#[test]
fn test_search_reads_num_found() {
    let (url, requests) = serve_once(
        "200 OK",
        r#"{"responseHeader":{"status":0},"response":{"numFound":7,"start":0,"docs":[]}}"#,
        Duration::ZERO,
    );
    let client = SearchClient::new(
        HttpContext::new().unwrap(),
        format!("{}/solr/terms/", url),
        &index_config(None, 5_000),
    );

    assert_eq!(client.query("Heart Lung", "ACR").unwrap(), 7);

    let request = requests.recv().unwrap();
    assert!(request.starts_with("GET /solr/terms/select?"));
    assert!(request.contains("rows=0"));
    assert!(request.contains("submissionAcronym"));
}

#[test]
fn test_server_error_is_unavailable() {
    let (url, _requests) = serve_once("503 Service Unavailable", "{}", Duration::ZERO);
    let client = SearchClient::new(HttpContext::new().unwrap(), url, &index_config(None, 5_000));

    let err = client.query("Heart", "ACR").unwrap_err();
    assert!(matches!(err, IndexError::Unavailable(_)));
    assert_eq!(err.kind(), "unavailable");
}

#[test]
fn test_malformed_body_is_decode_error() {
    let (url, _requests) = serve_once("200 OK", "not json", Duration::ZERO);
    let client = AnnotatorClient::new(HttpContext::new().unwrap(), url, &index_config(None, 5_000));

    let err = client.query("Heart", "ACR").unwrap_err();
    assert_eq!(err.kind(), "decode");
}

#[test]
fn test_slow_index_times_out() {
    let (url, _requests) = serve_once("200 OK", "[]", Duration::from_millis(1_500));
    let client = AnnotatorClient::new(HttpContext::new().unwrap(), url, &index_config(None, 200));

    let err = client.query("Heart", "ACR").unwrap_err();
    assert!(matches!(err, IndexError::Timeout));
}
