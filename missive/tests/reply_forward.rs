//! Reply and forward priming against built emails and raw messages.
#![allow(clippy::expect_used, clippy::unwrap_used)]

use missive::{
    DEFAULT_QUOTING_MARKUP, Email, EmailBuilder, EmailError, MimeMessage, RecipientType,
    convert::mime_message_to_email,
};
use pretty_assertions::assert_eq;

fn original() -> Email {
    let mut builder = EmailBuilder::new();
    builder
        .id(Some("<original@example.com>"))
        .unwrap()
        .from_with_name(Some("Alice"), "alice@example.com")
        .unwrap()
        .to("bob@example.com")
        .unwrap()
        .cc("carol@example.com, alice@example.com")
        .unwrap()
        .subject("Hello")
        .unwrap()
        .text(Some("How are you?\nAll well here."))
        .text_html(Some("<p>How are you?</p>"))
        .embed_image("logo", b"GIF89a".to_vec(), "image/gif")
        .unwrap();
    builder.build()
}

fn to_addresses(email: &Email) -> Vec<&str> {
    email
        .recipients_of(RecipientType::To)
        .map(|recipient| recipient.address())
        .collect()
}

#[test]
fn test_reply_subject_not_nested() {
    let mut reply = EmailBuilder::new();
    reply.as_reply_to(&original()).unwrap();
    let reply = reply.build();
    assert_eq!(reply.subject(), Some("Re: Hello"));

    let mut again = EmailBuilder::new();
    again.as_reply_to(&reply).unwrap();
    assert_eq!(again.build().subject(), Some("Re: Hello"));
}

#[test]
fn test_reply_addresses_sender_and_threads() {
    let mut builder = EmailBuilder::new();
    builder.as_reply_to(&original()).unwrap();
    let reply = builder.build();

    assert_eq!(to_addresses(&reply), ["alice@example.com"]);
    assert_eq!(reply.recipients_of(RecipientType::Cc).count(), 0);
    assert_eq!(reply.headers()["In-Reply-To"], "<original@example.com>");
    assert_eq!(reply.headers()["References"], "<original@example.com>");
    assert!(reply.from_recipient().is_none());
}

#[test]
fn test_reply_all_adds_everyone_as_to() {
    let mut builder = EmailBuilder::new();
    builder.as_reply_to_all(&original()).unwrap();
    let reply = builder.build();

    assert_eq!(
        to_addresses(&reply),
        ["alice@example.com", "bob@example.com", "carol@example.com"]
    );
}

#[test]
fn test_reply_quotes_bodies_and_keeps_images() {
    let mut builder = EmailBuilder::new();
    builder
        .text(Some("Fine, thanks.\n"))
        .text_html(Some("<p>Fine, thanks.</p>"))
        .as_reply_to_with_template(&original(), false, "<div class=\"quote\">%s</div>")
        .unwrap();
    let reply = builder.build();

    assert_eq!(
        reply.text(),
        Some("Fine, thanks.\n> How are you?\n> All well here.")
    );
    assert_eq!(
        reply.text_html(),
        Some("<p>Fine, thanks.</p><div class=\"quote\"><p>How are you?</p></div>")
    );
    assert_eq!(reply.embedded_images()[0].name(), Some("logo"));
}

#[test]
fn test_reply_to_raw_message_uses_default_markup() {
    let raw = MimeMessage::from(
        "Message-ID: <raw@example.com>\r\n\
         From: alice@example.com\r\n\
         Reply-To: list@example.com\r\n\
         Subject: RE: Plans\r\n\
         Content-Type: text/html; charset=utf-8\r\n\
         \r\n\
         <p>Plans</p>",
    );

    let mut builder = EmailBuilder::new();
    builder.as_reply_to(&raw).unwrap();
    let reply = builder.build();

    assert_eq!(reply.subject(), Some("RE: Plans"));
    assert_eq!(to_addresses(&reply), ["list@example.com"]);
    assert_eq!(reply.text(), None);
    assert_eq!(
        reply.text_html().unwrap(),
        DEFAULT_QUOTING_MARKUP.replace("%s", "<p>Plans</p>")
    );
}

#[test]
fn test_reply_to_unparseable_message_fails() {
    let mut builder = EmailBuilder::new();
    builder.subject("Keep me").unwrap();

    let err = builder
        .as_reply_to(&MimeMessage::from("\r\nno headers"))
        .unwrap_err();
    assert!(matches!(err, EmailError::ReplyFailed(_)));
    assert!(err.to_string().starts_with("Unable to parse message to produce a reply for"));
    assert_eq!(builder.build().subject(), Some("Keep me"));
}

#[test]
fn test_forward_subject_nests() {
    let mut forward = EmailBuilder::new();
    forward.as_forward_of(&original()).unwrap();
    let forward = forward.build();
    assert_eq!(forward.subject(), Some("Fwd: Hello"));

    let mut again = EmailBuilder::new();
    again.as_forward_of(&forward).unwrap();
    assert_eq!(again.build().subject(), Some("Fwd: Fwd: Hello"));
}

#[test]
fn test_forward_carries_original_message() {
    let mut builder = EmailBuilder::new();
    builder
        .to("dave@example.com")
        .unwrap()
        .text(Some("FYI"))
        .as_forward_of(&original())
        .unwrap();
    let forward = builder.build();

    let carried = forward.email_to_forward().unwrap();
    assert_eq!(carried.subject().unwrap().as_deref(), Some("Hello"));

    let rendered = forward.to_mime_message().unwrap();
    let parsed = mime_message_to_email(&rendered).unwrap();
    assert_eq!(parsed.subject(), Some("Fwd: Hello"));
    assert_eq!(parsed.text(), Some("FYI"));

    let inner = mime_message_to_email(parsed.email_to_forward().unwrap()).unwrap();
    assert_eq!(inner.subject(), Some("Hello"));
    assert_eq!(inner.text(), Some("How are you?\nAll well here."));
}

#[test]
fn test_forward_without_subject() {
    let raw = MimeMessage::from("From: a@example.com\r\n\r\nbody");

    let mut builder = EmailBuilder::new();
    builder.as_forward_of(&raw).unwrap();
    assert_eq!(builder.build().subject(), Some("Fwd: "));
}

#[test]
fn test_reply_to_delivery_failure_notice() {
    let bounce = MimeMessage::from(
        "Return-Path: <>\r\n\
         From: MAILER-DAEMON@x.com\r\n\
         Subject: Undelivered\r\n\
         Content-Type: text/plain\r\n\
         \r\n\
         Delivery to bob@example.com failed",
    );

    let mut builder = EmailBuilder::new();
    builder.as_reply_to(&bounce).unwrap();
    let reply = builder.build();

    assert_eq!(reply.subject(), Some("Re: Undelivered"));
    assert_eq!(to_addresses(&reply), ["MAILER-DAEMON@x.com"]);
    assert_eq!(reply.text(), Some("> Delivery to bob@example.com failed"));
}

#[test]
fn test_reply_to_local_only_sender() {
    let raw = MimeMessage::from("From: MAILER-DAEMON\r\nSubject: Notice\r\n\r\nbody");

    let mut builder = EmailBuilder::new();
    builder.as_reply_to_all(&raw).unwrap();
    assert_eq!(to_addresses(&builder.build()), ["MAILER-DAEMON"]);
}
