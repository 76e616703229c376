use chrono::{TimeZone, Utc};
use mockito::Matcher;
use youtube_sample::{
    client::YouTubeClient,
    error::ApiError,
    oauth::Credentials,
    request::{ChannelsList, SearchList, VideosList},
};

fn client_for(server: &mockito::Server) -> YouTubeClient {
    YouTubeClient::with_base_url(Credentials::bearer("test-token"), server.url())
}

#[test]
fn search_sends_bearer_token_and_query() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/search")
        .match_header("authorization", "Bearer test-token")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("type".into(), "video".into()),
            Matcher::UrlEncoded("channelType".into(), "any".into()),
            Matcher::UrlEncoded("regionCode".into(), "BR".into()),
            Matcher::UrlEncoded("order".into(), "viewCount".into()),
            Matcher::UrlEncoded("maxResults".into(), "10".into()),
            Matcher::UrlEncoded("publishedAfter".into(), "2023-03-01T00:00:00Z".into()),
            Matcher::UrlEncoded("publishedBefore".into(), "2023-03-15T00:00:00Z".into()),
            Matcher::UrlEncoded("part".into(), "snippet".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"items": [{"id": {"videoId": "abc"}, "snippet": {"title": "t"}}]}"#)
        .create();

    let request = SearchList::default().region("BR").published_between(
        Utc.with_ymd_and_hms(2023, 3, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2023, 3, 15, 0, 0, 0).unwrap(),
    );
    let response = client_for(&server).execute(&request).unwrap();

    mock.assert();
    assert_eq!(response["items"][0]["id"]["videoId"], "abc");
}

#[test]
fn channels_and_videos_hit_their_resources() {
    let mut server = mockito::Server::new();
    let channels = server
        .mock("GET", "/channels")
        .match_query(Matcher::UrlEncoded("mine".into(), "true".into()))
        .with_status(200)
        .with_body(r#"{"items": []}"#)
        .create();
    let videos = server
        .mock("GET", "/videos")
        .match_query(Matcher::UrlEncoded("chart".into(), "mostPopular".into()))
        .with_status(200)
        .with_body(r#"{"items": [{"id": "v1"}, {"id": "v2"}]}"#)
        .create();

    let client = client_for(&server);
    let c = client.execute(&ChannelsList::mine()).unwrap();
    let v = client.execute(&VideosList::most_popular("BR")).unwrap();

    channels.assert();
    videos.assert();
    assert_eq!(c["items"].as_array().unwrap().len(), 0);
    assert_eq!(v["items"].as_array().unwrap().len(), 2);
}

#[test]
fn api_errors_surface_status_and_message() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/search")
        .match_query(Matcher::Any)
        .with_status(403)
        .with_body(r#"{"error": {"code": 403, "message": "quotaExceeded"}}"#)
        .create();

    let err = client_for(&server).execute(&SearchList::default()).unwrap_err();
    match err {
        ApiError::Api { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "quotaExceeded");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn non_json_error_body_is_kept_verbatim() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/channels")
        .match_query(Matcher::Any)
        .with_status(502)
        .with_body("Bad Gateway")
        .create();

    let err = client_for(&server).execute(&ChannelsList::mine()).unwrap_err();
    assert!(matches!(err, ApiError::Api { status: 502, ref message } if message == "Bad Gateway"));
}

#[test]
fn invalid_parameters_fail_before_any_request() {
    let mut server = mockito::Server::new();
    let mock = server.mock("GET", Matcher::Any).expect(0).create();

    let err = client_for(&server)
        .execute(&SearchList::default().max_results(500))
        .unwrap_err();

    assert!(matches!(err, ApiError::InvalidParameter { .. }));
    mock.assert();
}
