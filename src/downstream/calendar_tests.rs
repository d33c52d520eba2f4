//! Tests for `CalendarApi` request construction.

use std::time::Duration;

use super::{BuildError, CalendarApi, ReqwestClient};
use crate::message::QueuedRequest;

fn api(root: &str) -> CalendarApi<ReqwestClient> {
    let client = ReqwestClient::with_timeout(Duration::from_secs(30)).unwrap();
    CalendarApi::new(client, url::Url::parse(root).unwrap())
}

mod build_request {
    use super::*;

    #[test]
    fn appends_path_to_root_url() {
        let message = QueuedRequest::new("POST", "/events", "");

        let request = api("https://cal.example.com/api").build_request(&message).unwrap();

        assert_eq!(request.url.as_str(), "https://cal.example.com/api/events");
    }

    #[test]
    fn avoids_double_slash_with_trailing_root_slash() {
        let message = QueuedRequest::new("GET", "/events", "");

        let request = api("https://cal.example.com/").build_request(&message).unwrap();

        assert_eq!(request.url.as_str(), "https://cal.example.com/events");
    }

    #[test]
    fn inserts_slash_for_relative_path() {
        let message = QueuedRequest::new("GET", "events", "");

        let request = api("https://cal.example.com/api").build_request(&message).unwrap();

        assert_eq!(request.url.as_str(), "https://cal.example.com/api/events");
    }

    #[test]
    fn encodes_params_as_query_string() {
        let message = QueuedRequest::new("GET", "/events", "")
            .with_param("cal", "team")
            .with_param("q", "a b&c");

        let request = api("https://cal.example.com").build_request(&message).unwrap();

        let pairs: Vec<(String, String)> = request
            .url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("cal".to_string(), "team".to_string()),
                ("q".to_string(), "a b&c".to_string()),
            ]
        );
    }

    #[test]
    fn params_replace_root_query() {
        let message = QueuedRequest::new("GET", "/events", "").with_param("cal", "team");

        let request = api("https://cal.example.com/?stale=1")
            .build_request(&message)
            .unwrap();

        assert_eq!(request.url.query(), Some("cal=team"));
    }

    #[test]
    fn no_params_means_no_query() {
        let message = QueuedRequest::new("GET", "/events", "");

        let request = api("https://cal.example.com").build_request(&message).unwrap();

        assert_eq!(request.url.query(), None);
    }

    #[test]
    fn carries_method_and_body() {
        let message = QueuedRequest::new("PATCH", "/events/1", r#"{"title":"x"}"#);

        let request = api("https://cal.example.com").build_request(&message).unwrap();

        assert_eq!(request.method, http::Method::PATCH);
        assert_eq!(request.body.as_deref(), Some(br#"{"title":"x"}"#.as_slice()));
    }

    #[test]
    fn invalid_method_is_rejected() {
        let message = QueuedRequest::new("NOT A METHOD", "/events", "");

        let result = api("https://cal.example.com").build_request(&message);

        assert!(matches!(result, Err(BuildError::InvalidMethod(m)) if m == "NOT A METHOD"));
    }

    #[test]
    fn empty_method_replays_as_get() {
        let message = QueuedRequest::new("", "/events", "");

        let request = api("https://cal.example.com").build_request(&message).unwrap();

        assert_eq!(request.method, http::Method::GET);
    }
}
