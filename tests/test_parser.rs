use httpd_reactor::http::parser::{ParseError, RequestParser, parse_http_request};
use httpd_reactor::http::request::Method;

#[test]
fn test_parse_post_request_with_body() {
    let req = b"POST /api HTTP/1.1\r\nHost: localhost\r\nContent-Length: 5\r\n\r\nhello";
    let (parsed, consumed) = parse_http_request(req).unwrap();

    assert_eq!(parsed.method, Method::POST);
    assert_eq!(parsed.path, "/api");
    assert_eq!(parsed.body, b"hello".to_vec());
    assert_eq!(consumed, req.len());
}

#[test]
fn test_parse_reports_consumed_prefix_only() {
    let req = b"GET /one HTTP/1.1\r\n\r\nGET /two HTTP/1.1\r\n\r\n";
    let (parsed, consumed) = parse_http_request(req).unwrap();

    assert_eq!(parsed.path, "/one");
    assert_eq!(&req[consumed..], b"GET /two HTTP/1.1\r\n\r\n");
}

#[test]
fn test_parse_lowercase_content_length() {
    let req = b"PUT /x HTTP/1.1\r\ncontent-length: 2\r\n\r\nok";
    let (parsed, _) = parse_http_request(req).unwrap();

    assert_eq!(parsed.body, b"ok");
}

#[test]
fn test_parse_incomplete_inputs() {
    let cases: [&[u8]; 3] = [
        b"",
        b"GET / HTTP/1.1\r\nHost: example.com\r\n",
        b"POST /api HTTP/1.1\r\nContent-Length: 10\r\n\r\nhello",
    ];

    for case in cases {
        assert!(matches!(parse_http_request(case), Err(ParseError::Incomplete)));
    }
}

#[test]
fn test_parse_rejections() {
    let cases: [(&[u8], ParseError); 5] = [
        (b"INVALID / HTTP/1.1\r\n\r\n", ParseError::InvalidMethod),
        (b"GET / HTTP/1.1\r\nBrokenHeader\r\n\r\n", ParseError::InvalidHeader),
        (b"GET /\r\n\r\n", ParseError::InvalidRequest),
        (b"GET / SPDY/3\r\n\r\n", ParseError::InvalidRequest),
        (
            b"POST / HTTP/1.1\r\nContent-Length: lots\r\n\r\n",
            ParseError::InvalidContentLength,
        ),
    ];

    for (input, expected) in cases {
        assert_eq!(parse_http_request(input).unwrap_err(), expected);
    }
}

#[test]
fn test_accumulator_byte_at_a_time_matches_single_feed() {
    let req = b"POST /submit HTTP/1.1\r\nHost: a\r\nContent-Length: 4\r\n\r\nwxyz";

    let mut whole = RequestParser::new();
    whole.feed(req);

    let mut trickle = RequestParser::new();
    let mut completions = 0;
    for byte in req {
        trickle.feed(&[*byte]);
        if trickle.is_complete() {
            completions += 1;
        }
    }

    assert_eq!(completions, 1);
    let (a, _) = whole.finish().unwrap();
    let (b, _) = trickle.finish().unwrap();
    assert_eq!(a.path, b.path);
    assert_eq!(a.body, b.body);
    assert_eq!(a.headers, b.headers);
}

#[test]
fn test_accumulator_error_is_sticky() {
    let mut parser = RequestParser::new();
    parser.feed(b"GET / HTTP/1.1\r\nnocolon\r\n\r\n");
    assert!(parser.has_error());

    parser.feed(b"GET / HTTP/1.1\r\n\r\n");
    assert!(parser.has_error());
    assert_eq!(parser.error_name(), Some("invalid_header"));
}

#[test]
fn test_accumulator_starts_empty() {
    let mut parser = RequestParser::new();
    assert!(parser.is_empty());
    assert!(!parser.is_complete());
    assert!(!parser.has_error());

    parser.feed(b"G");
    assert!(!parser.is_empty());
}
