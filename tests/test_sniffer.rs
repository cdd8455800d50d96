use dockwatch::http::exchange::{ApiAction, ExchangeState};
use dockwatch::http::sniffer::RequestSniffer;

fn create_request(body: &str) -> Vec<u8> {
    format!(
        "POST /v1.43/containers/create HTTP/1.1\r\nHost: docker\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    )
    .into_bytes()
}

fn pull_request(query: &str) -> Vec<u8> {
    format!(
        "POST /v1.43/images/create{} HTTP/1.1\r\nHost: docker\r\nContent-Length: 0\r\n\r\n",
        query
    )
    .into_bytes()
}

#[test]
fn test_container_create_in_one_chunk() {
    let mut sniffer = RequestSniffer::new(1);
    let mut state = ExchangeState::new();

    sniffer.inspect(&create_request(r#"{"Image":"redis:latest"}"#), &mut state);

    assert_eq!(state.pending(), Some(ApiAction::ContainerCreate));
    assert_eq!(state.image(), "redis:latest");
}

#[test]
fn test_container_create_body_split_across_chunks() {
    let mut sniffer = RequestSniffer::new(1);
    let mut state = ExchangeState::new();

    let request = create_request(r#"{"Image":"postgres:16","Tty":false}"#);
    let (first, second) = request.split_at(request.len() - 10);

    sniffer.inspect(first, &mut state);
    assert_eq!(state.pending(), Some(ApiAction::ContainerCreate));
    assert_eq!(state.image(), "", "image must not appear before the body completes");

    sniffer.inspect(second, &mut state);
    assert_eq!(state.image(), "postgres:16");
}

#[test]
fn test_container_create_body_in_many_fragments() {
    let mut sniffer = RequestSniffer::new(1);
    let mut state = ExchangeState::new();

    let body = r#"{"Image":"alpine:3.20","Cmd":["sh"]}"#;
    let request = create_request(body);
    let head_len = request.len() - body.len();

    sniffer.inspect(&request[..head_len], &mut state);
    for chunk in request[head_len..].chunks(5) {
        sniffer.inspect(chunk, &mut state);
    }

    assert_eq!(state.image(), "alpine:3.20");
}

#[test]
fn test_create_body_without_image_field() {
    let mut sniffer = RequestSniffer::new(1);
    let mut state = ExchangeState::new();

    sniffer.inspect(&create_request(r#"{"Tty":true}"#), &mut state);

    assert_eq!(state.pending(), Some(ApiAction::ContainerCreate));
    assert_eq!(state.image(), "");
}

#[test]
fn test_create_body_invalid_json() {
    let mut sniffer = RequestSniffer::new(1);
    let mut state = ExchangeState::new();

    sniffer.inspect(&create_request("not json at all"), &mut state);

    assert_eq!(state.pending(), Some(ApiAction::ContainerCreate));
    assert_eq!(state.image(), "");
}

#[test]
fn test_image_pull_from_query() {
    let mut sniffer = RequestSniffer::new(1);
    let mut state = ExchangeState::new();

    sniffer.inspect(&pull_request("?fromImage=redis&tag=latest"), &mut state);

    assert_eq!(state.pending(), Some(ApiAction::ImagePull));
    assert_eq!(state.image(), "redis:latest");
}

#[test]
fn test_image_pull_missing_tag() {
    let mut sniffer = RequestSniffer::new(1);
    let mut state = ExchangeState::new();

    sniffer.inspect(&pull_request("?fromImage=busybox"), &mut state);

    assert_eq!(state.image(), "busybox:");
}

#[test]
fn test_image_pull_without_query() {
    let mut sniffer = RequestSniffer::new(1);
    let mut state = ExchangeState::new();

    sniffer.inspect(&pull_request(""), &mut state);

    assert_eq!(state.pending(), Some(ApiAction::ImagePull));
    assert_eq!(state.image(), ":");
}

#[test]
fn test_image_pull_percent_decoding() {
    let mut sniffer = RequestSniffer::new(1);
    let mut state = ExchangeState::new();

    sniffer.inspect(
        &pull_request("?fromImage=ghcr.io%2Fowner%2Fapp&tag=1.0"),
        &mut state,
    );

    assert_eq!(state.image(), "ghcr.io/owner/app:1.0");
}

#[test]
fn test_image_pull_first_value_wins() {
    let mut sniffer = RequestSniffer::new(1);
    let mut state = ExchangeState::new();

    sniffer.inspect(&pull_request("?fromImage=first&fromImage=second&tag=a&tag=b"), &mut state);

    assert_eq!(state.image(), "first:a");
}

#[test]
fn test_get_request_is_ignored() {
    let mut sniffer = RequestSniffer::new(1);
    let mut state = ExchangeState::new();

    sniffer.inspect(b"GET /v1.43/containers/json HTTP/1.1\r\nHost: docker\r\n\r\n", &mut state);

    assert_eq!(state.pending(), None);
}

#[test]
fn test_unrelated_post_is_ignored() {
    let mut sniffer = RequestSniffer::new(1);
    let mut state = ExchangeState::new();

    sniffer.inspect(
        b"POST /v1.43/containers/abc123/start HTTP/1.1\r\nHost: docker\r\nContent-Length: 0\r\n\r\n",
        &mut state,
    );

    assert_eq!(state.pending(), None);
}

#[test]
fn test_non_http_bytes_are_ignored() {
    let mut sniffer = RequestSniffer::new(1);
    let mut state = ExchangeState::new();

    sniffer.inspect(&[0x00, 0x17, 0xff, 0x42], &mut state);

    assert_eq!(state.pending(), None);
}

#[test]
fn test_head_split_across_chunks_is_not_classified() {
    let mut sniffer = RequestSniffer::new(1);
    let mut state = ExchangeState::new();

    // The head only parses when it arrives at the start of one read
    sniffer.inspect(b"POST /v1.43/containers/create HTTP/1.1\r\nHost: do", &mut state);
    sniffer.inspect(b"cker\r\nContent-Length: 2\r\n\r\n{}", &mut state);

    assert_eq!(state.pending(), None);
}

#[test]
fn test_pull_replaces_unanswered_create() {
    let mut sniffer = RequestSniffer::new(1);
    let mut state = ExchangeState::new();

    let request = create_request(r#"{"Image":"redis:latest"}"#);
    let split = request.len() - 8;
    sniffer.inspect(&request[..split], &mut state);
    assert_eq!(state.pending(), Some(ApiAction::ContainerCreate));

    // New classified request before the create body finished
    sniffer.inspect(&pull_request("?fromImage=nginx&tag=1.27"), &mut state);
    assert_eq!(state.pending(), Some(ApiAction::ImagePull));
    assert_eq!(state.image(), "nginx:1.27");

    // Leftover create body bytes must not disturb the new classification
    sniffer.inspect(&request[split..], &mut state);
    assert_eq!(state.pending(), Some(ApiAction::ImagePull));
    assert_eq!(state.image(), "nginx:1.27");
}

#[test]
fn test_second_create_replaces_first() {
    let mut sniffer = RequestSniffer::new(1);
    let mut state = ExchangeState::new();

    sniffer.inspect(&create_request(r#"{"Image":"redis:latest"}"#), &mut state);
    sniffer.inspect(&create_request(r#"{"Image":"nginx:1.27"}"#), &mut state);

    assert_eq!(state.pending(), Some(ApiAction::ContainerCreate));
    assert_eq!(state.image(), "nginx:1.27");
}

#[test]
fn test_oversized_declared_body_skips_extraction() {
    let mut sniffer = RequestSniffer::new(1);
    let mut state = ExchangeState::new();

    let head = format!(
        "POST /v1.43/containers/create HTTP/1.1\r\nHost: docker\r\nContent-Length: {}\r\n\r\n",
        2 * 1024 * 1024
    );
    sniffer.inspect(head.as_bytes(), &mut state);
    sniffer.inspect(&vec![b'x'; 4096], &mut state);

    // Still counted as a create, just without an image
    assert_eq!(state.pending(), Some(ApiAction::ContainerCreate));
    assert_eq!(state.image(), "");
}

#[test]
fn test_runaway_accumulation_is_capped() {
    let mut sniffer = RequestSniffer::new(1);
    let mut state = ExchangeState::new();

    // Declared length admissible on its own, but the padded head pushes the
    // complete request past the buffer limit, so completion never comes
    let head = format!(
        "POST /v1.43/containers/create HTTP/1.1\r\nHost: docker\r\nX-Pad: {}\r\nContent-Length: {}\r\n\r\n",
        "a".repeat(8192),
        1024 * 1024
    );
    sniffer.inspect(head.as_bytes(), &mut state);

    let filler = vec![b'{'; 4096];
    for _ in 0..300 {
        sniffer.inspect(&filler, &mut state);
    }

    assert_eq!(state.pending(), Some(ApiAction::ContainerCreate));
    assert_eq!(state.image(), "");
}
