use httpd_reactor::http::response::{Response, ResponseBuilder, StatusCode};
use httpd_reactor::http::writer::ResponseWriter;

fn head_and_body(bytes: &[u8]) -> (String, Vec<u8>) {
    let split = bytes
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("no header terminator");
    (
        String::from_utf8(bytes[..split].to_vec()).unwrap(),
        bytes[split + 4..].to_vec(),
    )
}

#[test]
fn test_status_codes_and_reasons() {
    assert_eq!(StatusCode::Ok.as_u16(), 200);
    assert_eq!(StatusCode::ServiceUnavailable.as_u16(), 503);
    assert_eq!(StatusCode::MethodNotAllowed.reason_phrase(), "Method Not Allowed");
    assert_eq!(StatusCode::NoContent.reason_phrase(), "No Content");
}

#[test]
fn test_builder_adds_content_length() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .body(b"This is the body".to_vec())
        .build();

    assert_eq!(response.headers.get("Content-Length").unwrap(), "16");
    assert!(!response.should_disconnect());
}

#[test]
fn test_builder_keeps_explicit_content_length_any_case() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .header("content-length", "999")
        .body(b"test".to_vec())
        .build();

    assert_eq!(response.headers.len(), 1);
    assert_eq!(response.headers.get("content-length").unwrap(), "999");
}

#[test]
fn test_helpers() {
    assert_eq!(Response::ok("hi").body, b"hi".to_vec());
    assert_eq!(Response::not_found().status, StatusCode::NotFound);
    assert_eq!(Response::internal_error().status, StatusCode::InternalServerError);

    let bad = Response::bad_request();
    assert_eq!(bad.status, StatusCode::BadRequest);
    assert!(bad.should_disconnect());
}

#[test]
fn test_serialize_layout() {
    let response = ResponseBuilder::new(StatusCode::Created)
        .header("Content-Type", "text/plain")
        .body(b"made".to_vec())
        .build();

    let bytes = response.serialize();
    let (head, body) = head_and_body(&bytes);

    assert!(head.starts_with("HTTP/1.1 201 Created\r\n"));
    assert!(head.contains("Content-Type: text/plain"));
    assert!(head.contains("Content-Length: 4"));
    assert!(!head.contains("Connection"));
    assert_eq!(body, b"made");
}

#[test]
fn test_serialize_disconnect_adds_connection_close() {
    let response = ResponseBuilder::new(StatusCode::Ok).disconnect(true).build();
    let (head, _) = head_and_body(&response.serialize());
    assert!(head.contains("Connection: close"));

    let explicit = ResponseBuilder::new(StatusCode::Ok)
        .header("Connection", "upgrade")
        .disconnect(true)
        .build();
    let (head, _) = head_and_body(&explicit.serialize());
    assert!(head.contains("Connection: upgrade"));
    assert!(!head.contains("Connection: close"));
}

#[test]
fn test_writer_sends_serialized_bytes() {
    let response = Response::ok("payload");
    let mut out = Vec::new();
    let mut writer = ResponseWriter::new(&response);

    writer.write_to(&mut out).unwrap();

    assert_eq!(out, response.serialize());
    assert_eq!(writer.written(), writer.len());
    assert!(!writer.is_empty());
}
