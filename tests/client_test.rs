use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use email_prep::*;
use serde_json::{Value, json};
use std::cell::RefCell;
use std::collections::VecDeque;

/// Replays canned responses and records every request it sees
#[derive(Default)]
struct FakeService {
    responses: RefCell<VecDeque<Result<Value>>>,
    requests: RefCell<Vec<ApiRequest>>,
}

impl FakeService {
    fn replying(responses: Vec<Result<Value>>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            requests: RefCell::default(),
        }
    }

    fn requests(&self) -> Vec<ApiRequest> {
        self.requests.borrow().clone()
    }
}

impl MailService for FakeService {
    fn execute(&self, request: &ApiRequest) -> Result<Value> {
        self.requests.borrow_mut().push(request.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(MailError::Service("no response queued".into())))
    }
}

fn raw_response(id: &str, message: &[u8]) -> Value {
    json!({
        "id": id,
        "threadId": "t1",
        "snippet": "Hello there",
        "raw": URL_SAFE.encode(message),
    })
}

#[test]
fn test_list_messages() {
    let service = FakeService::replying(vec![Ok(json!({
        "messages": [
            { "id": "m1", "threadId": "t1" },
            { "id": "m2", "threadId": "t2" }
        ],
        "nextPageToken": "page-2",
        "resultSizeEstimate": 2
    }))]);
    let client = MailClient::new(&service, "me");

    let list = client.list_messages().unwrap();

    assert_eq!(list.messages.len(), 2);
    assert_eq!(list.messages[1].id, "m2");
    assert!(list.has_more());
    assert_eq!(
        service.requests(),
        [ApiRequest::ListMessages {
            user_id: "me".into()
        }]
    );
}

#[test]
fn test_list_messages_empty_mailbox() {
    let service = FakeService::replying(vec![Ok(json!({ "resultSizeEstimate": 0 }))]);
    let client = MailClient::new(&service, "me");

    let list = client.list_messages().unwrap();

    assert!(list.is_empty());
    assert!(!list.has_more());
}

#[test]
fn test_get_message_requests_metadata() {
    let service = FakeService::replying(vec![Ok(json!({
        "id": "m1",
        "labelIds": ["INBOX", "UNREAD"],
        "internalDate": "1735732800000",
        "payload": {
            "mimeType": "text/plain",
            "headers": [
                { "name": "Subject", "value": "Quarterly report" },
                { "name": "From", "value": "alice@example.com" }
            ]
        }
    }))]);
    let client = MailClient::new(&service, "me");

    let message = client.get_message("m1").unwrap();

    assert_eq!(message.header("subject"), Some("Quarterly report"));
    assert_eq!(message.header("FROM"), Some("alice@example.com"));
    assert_eq!(message.header("To"), None);
    assert_eq!(message.label_ids, ["INBOX", "UNREAD"]);
    assert_eq!(
        message.received_at().unwrap().to_rfc3339(),
        "2025-01-01T12:00:00+00:00"
    );

    let requests = service.requests();
    assert_eq!(requests[0].method(), "GET");
    assert_eq!(requests[0].path(), "users/me/messages/m1");
    assert_eq!(requests[0].query(), [("format", "metadata".to_string())]);
}

#[test]
fn test_get_mime_message_decodes_raw() {
    let service = FakeService::replying(vec![Ok(raw_response(
        "m1",
        b"Subject: Hi\r\nContent-Type: text/plain\r\n\r\nBody",
    ))]);
    let client = MailClient::new(&service, "me");

    let mime = client.get_mime_message("m1").unwrap();

    assert_eq!(mime.subject().unwrap().as_deref(), Some("Hi"));
    assert_eq!(mime.content().unwrap().as_deref(), Some("Body"));
    assert!(matches!(
        &service.requests()[0],
        ApiRequest::GetMessage {
            format: MessageFormat::Raw,
            ..
        }
    ));
}

#[test]
fn test_get_mime_message_without_raw() {
    let service = FakeService::replying(vec![Ok(json!({ "id": "m1" }))]);
    let client = MailClient::new(&service, "me");

    let err = client.get_mime_message("m1").unwrap_err();

    assert!(matches!(err, MailError::Decode(_)));
}

#[test]
fn test_send_message() {
    let service = FakeService::replying(vec![Ok(json!({
        "id": "sent-1",
        "threadId": "t9",
        "labelIds": ["SENT"]
    }))]);
    let client = MailClient::new(&service, "me");
    let outgoing = create_message("me@example.com", "you@example.com", "Hi", "Body").unwrap();

    let sent = client.send_message(&outgoing).unwrap();

    assert_eq!(sent.id, "sent-1");
    let requests = service.requests();
    assert_eq!(requests[0].method(), "POST");
    assert_eq!(requests[0].path(), "users/me/messages/send");
    assert_eq!(requests[0].body(), Some(json!({ "raw": outgoing.raw })));
}

#[test]
fn test_create_draft() {
    let service = FakeService::replying(vec![Ok(json!({
        "id": "d1",
        "message": { "id": "m7", "threadId": "t7" }
    }))]);
    let client = MailClient::new(&service, "me");
    let outgoing = create_message("me@example.com", "you@example.com", "Draft", "Later").unwrap();

    let draft = client.create_draft(&outgoing).unwrap();

    assert_eq!(draft.id, "d1");
    assert_eq!(draft.message.id, "m7");
    let requests = service.requests();
    assert_eq!(requests[0].path(), "users/me/drafts");
    assert_eq!(
        requests[0].body(),
        Some(json!({ "message": { "raw": outgoing.raw } }))
    );
}

#[test]
fn test_service_failure_is_returned() {
    let service = FakeService::replying(vec![Err(MailError::Service("403 Forbidden".into()))]);
    let client = MailClient::new(&service, "me");

    let err = client.list_messages().unwrap_err();

    assert!(matches!(err, MailError::Service(ref msg) if msg == "403 Forbidden"));
}

#[test]
fn test_malformed_response() {
    let service = FakeService::replying(vec![Ok(json!({ "messages": "not a list" }))]);
    let client = MailClient::new(&service, "me");

    assert!(matches!(
        client.list_messages(),
        Err(MailError::Response(_))
    ));
}

#[test]
fn test_fetch_email_content_preprocesses_body() {
    let raw = b"Content-Type: multipart/alternative; boundary=\"b1\"\r\n\
                \r\n\
                --b1\r\n\
                Content-Type: text/plain\r\n\
                \r\n\
                Thanks   for the update.\r\n\
                \r\n\
                On Monday, Bob wrote:\r\n\
                > old news\r\n\
                \r\n\
                Cheers\r\n\
                --b1\r\n\
                Content-Type: text/html\r\n\
                \r\n\
                <p>ignored</p>\r\n\
                --b1--\r\n";
    let service = FakeService::replying(vec![Ok(raw_response("m1", raw))]);
    let client = MailClient::new(&service, "me");
    let preprocessor = Preprocessor::new(PreprocessOptions::default());

    let content = client.fetch_email_content("m1", &preprocessor).unwrap().unwrap();

    assert!(content.starts_with("Thanks for the update."));
    assert!(content.ends_with("Cheers"));
    assert!(!content.contains("old news"));
    assert!(!content.contains("ignored"));
}

#[test]
fn test_fetch_email_content_without_text_body() {
    let service = FakeService::replying(vec![Ok(raw_response(
        "m1",
        b"Content-Type: image/png\r\n\r\nPNG",
    ))]);
    let client = MailClient::new(&service, "me");
    let preprocessor = Preprocessor::new(PreprocessOptions::default());

    assert_eq!(client.fetch_email_content("m1", &preprocessor).unwrap(), None);
}

#[test]
fn test_message_format_strings() {
    assert_eq!(MessageFormat::Raw.to_string(), "raw");
    assert_eq!(MessageFormat::Metadata.as_str(), "metadata");
    assert_eq!(MessageFormat::default(), MessageFormat::Full);
    assert_eq!(
        serde_json::to_value(MessageFormat::Minimal).unwrap(),
        json!("minimal")
    );
}
