//! A session wired to the real HTTP capabilities and a fake server.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use vkpoll::{CredentialRequest, LongPollConfig, LongPollSession, SessionContext};
use vkpoll_api::{ApiClient, ApiConfig, HttpSender};
use wiremock::matchers::{body_string, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn polls_the_server_named_by_the_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/method/groups.getLongPollServer"))
        .and(body_string("group_id=7&access_token=secret&v=5.45"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {"server": format!("{}/lp", server.uri()), "key": "k1", "ts": "100"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/lp"))
        .and(query_param("act", "a_check"))
        .and(query_param("key", "k1"))
        .and(query_param("ts", "100"))
        .and(query_param("wait", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ts": "101",
            "updates": [{"type": "message_new", "object": {"id": 1}}]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/lp"))
        .and(query_param("ts", "101"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ts": "102",
            "updates": [{"type": "message_new", "object": {"id": 2}}]
        })))
        .mount(&server)
        .await;

    let client = ApiClient::new(
        ApiConfig::new()
            .with_api_url(server.uri())
            .with_token("secret"),
    )
    .expect("client");
    let context = SessionContext::new(Arc::new(client), CredentialRequest::for_group(7));
    let mut session = LongPollSession::start(
        context,
        Arc::new(HttpSender::new()),
        LongPollConfig::default(),
    );

    let first = session.next().await.expect("first batch");
    assert_eq!(first, vec![json!({"type": "message_new", "object": {"id": 1}})]);
    let second = session.next().await.expect("second batch");
    assert_eq!(second, vec![json!({"type": "message_new", "object": {"id": 2}})]);

    session.shutdown().await;
}
