use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use aws_lambda_events::event::sns::SnsEvent;
use serde_json::json;
use user_accounts::config::MailerConfig;
use user_accounts::mailer::{Dispatcher, MailTransport, MailerError, OutgoingMail, SecretSource, SENT};

struct StaticSecret(&'static str);

#[async_trait]
impl SecretSource for StaticSecret {
    async fn secret_string(&self, _name: &str) -> Result<String, MailerError> {
        Ok(self.0.to_string())
    }
}

#[derive(Default)]
struct Outbox(Mutex<Vec<OutgoingMail>>);

#[async_trait]
impl MailTransport for Outbox {
    async fn send(&self, _api_key: &str, mail: &OutgoingMail) -> Result<(), MailerError> {
        self.0.lock().unwrap().push(mail.clone());
        Ok(())
    }
}

fn sns_event(messages: &[String]) -> SnsEvent {
    let records: Vec<_> = messages
        .iter()
        .enumerate()
        .map(|(i, message)| {
            json!({
                "EventVersion": "1.0",
                "EventSubscriptionArn": "arn:aws:sns:us-east-1:123456789012:user-verification:sub",
                "EventSource": "aws:sns",
                "Sns": {
                    "Type": "Notification",
                    "MessageId": format!("msg-{i}"),
                    "TopicArn": "arn:aws:sns:us-east-1:123456789012:user-verification",
                    "Subject": null,
                    "Message": message,
                    "Timestamp": "2024-03-01T10:00:00.000Z",
                    "SignatureVersion": "1",
                    "Signature": "c2lnbmF0dXJl",
                    "SigningCertUrl": "https://sns.us-east-1.amazonaws.com/cert.pem",
                    "UnsubscribeUrl": "https://sns.us-east-1.amazonaws.com/unsubscribe",
                    "MessageAttributes": {}
                }
            })
        })
        .collect();
    serde_json::from_value(json!({ "Records": records })).unwrap()
}

fn dispatcher(outbox: Arc<Outbox>) -> Dispatcher {
    let config = MailerConfig {
        secret_name: "user-accounts/sendgrid".into(),
        verify_endpoint: "https://accounts.example.com/v1/user/verify".into(),
        region: "us-east-1".into(),
        sendgrid_api_url: "http://127.0.0.1:9/unused".into(),
    };
    Dispatcher::new(
        config,
        Arc::new(StaticSecret(
            r#"{"sendgrid_api_key":"SG.test","sender_email":"accounts@example.com"}"#,
        )),
        outbox,
    )
}

#[tokio::test]
async fn published_notification_becomes_one_verification_mail() {
    let outbox = Arc::new(Outbox::default());
    let d = dispatcher(outbox.clone());

    let published = json!({
        "userId": 42,
        "email": "new.user@example.com",
        "verificationToken": "3f1c0c3e-8f5a-4c1e-9b1a-6f2d8e7c9a10",
        "tokenExpirationTime": "2024-03-01T10:10:00Z"
    })
    .to_string();

    let out = d.handle_event(sns_event(&[published])).await.unwrap();
    assert_eq!(out, SENT);

    let sent = outbox.0.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let mail = serde_json::to_value(&sent[0]).unwrap();
    assert_eq!(mail["personalizations"][0]["to"][0]["email"], "new.user@example.com");
    assert_eq!(mail["from"]["email"], "accounts@example.com");
    assert_eq!(mail["subject"], "Verify Your Email Address");
    assert_eq!(
        mail["content"][0]["value"],
        "Hi User,\n\nPlease verify your email address by clicking the link below:\n\
         https://accounts.example.com/v1/user/verify?email=new.user%40example.com&token=3f1c0c3e-8f5a-4c1e-9b1a-6f2d8e7c9a10\
         \n\nThank you!"
    );
}

#[tokio::test]
async fn only_the_first_record_is_dispatched() {
    let outbox = Arc::new(Outbox::default());
    let d = dispatcher(outbox.clone());

    let first = json!({"email": "first@example.com", "verificationToken": "t1"}).to_string();
    let second = json!({"email": "second@example.com", "verificationToken": "t2"}).to_string();
    d.handle_event(sns_event(&[first, second])).await.unwrap();

    let sent = outbox.0.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient(), Some("first@example.com"));
}

#[tokio::test]
async fn undecodable_record_sends_nothing() {
    let outbox = Arc::new(Outbox::default());
    let d = dispatcher(outbox.clone());

    let err = d
        .handle_event(sns_event(&["plain text, not json".to_string()]))
        .await
        .unwrap_err();
    assert!(matches!(err, MailerError::MalformedMessage(_)));
    assert!(outbox.0.lock().unwrap().is_empty());
}
