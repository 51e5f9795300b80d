//! The immutable email produced by [`EmailBuilder::build`].

use std::collections::HashMap;

use missive_common::{AttachmentResource, Recipient, RecipientList, RecipientType};

use crate::{
    ConvertError, EmailBuilder,
    convert::{self, MimeMessage},
    dkim::DkimConfig,
};

/// A fully composed email.
///
/// Every collection is owned by the email itself, so later changes to the
/// builder that produced it are never observed here.
#[derive(Debug, Clone)]
pub struct Email {
    pub(crate) id: Option<String>,
    pub(crate) from: Option<Recipient>,
    pub(crate) reply_to: Option<Recipient>,
    pub(crate) bounce_to: Option<Recipient>,
    pub(crate) subject: Option<String>,
    pub(crate) text: Option<String>,
    pub(crate) text_html: Option<String>,
    pub(crate) recipients: RecipientList,
    pub(crate) embedded_images: Vec<AttachmentResource>,
    pub(crate) attachments: Vec<AttachmentResource>,
    pub(crate) headers: HashMap<String, String>,
    pub(crate) dkim: Option<DkimConfig>,
    pub(crate) use_disposition_notification_to: bool,
    pub(crate) disposition_notification_to: Option<Recipient>,
    pub(crate) use_return_receipt_to: bool,
    pub(crate) return_receipt_to: Option<Recipient>,
    pub(crate) email_to_forward: Option<MimeMessage>,
}

impl Email {
    /// Shortcut for [`EmailBuilder::new`].
    #[must_use]
    pub fn builder() -> EmailBuilder {
        EmailBuilder::new()
    }

    /// Renders this email as an RFC 5322 message.
    ///
    /// # Errors
    ///
    /// See [`convert::email_to_mime_message`].
    pub fn to_mime_message(&self) -> Result<MimeMessage, ConvertError> {
        convert::email_to_mime_message(self)
    }

    /// The message id, only present when set explicitly.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    #[must_use]
    pub const fn from_recipient(&self) -> Option<&Recipient> {
        self.from.as_ref()
    }

    #[must_use]
    pub const fn reply_to_recipient(&self) -> Option<&Recipient> {
        self.reply_to.as_ref()
    }

    /// The Return-Path / envelope sender bounces are sent to.
    #[must_use]
    pub const fn bounce_to_recipient(&self) -> Option<&Recipient> {
        self.bounce_to.as_ref()
    }

    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    #[must_use]
    pub fn text_html(&self) -> Option<&str> {
        self.text_html.as_deref()
    }

    #[must_use]
    pub const fn recipients(&self) -> &RecipientList {
        &self.recipients
    }

    pub fn recipients_of(&self, kind: RecipientType) -> impl Iterator<Item = &Recipient> {
        self.recipients.of_kind(kind)
    }

    #[must_use]
    pub fn embedded_images(&self) -> &[AttachmentResource] {
        &self.embedded_images
    }

    #[must_use]
    pub fn attachments(&self) -> &[AttachmentResource] {
        &self.attachments
    }

    #[must_use]
    pub const fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    #[must_use]
    pub const fn dkim(&self) -> Option<&DkimConfig> {
        self.dkim.as_ref()
    }

    #[must_use]
    pub const fn use_disposition_notification_to(&self) -> bool {
        self.use_disposition_notification_to
    }

    /// The explicitly requested disposition notification recipient.
    #[must_use]
    pub const fn disposition_notification_to(&self) -> Option<&Recipient> {
        self.disposition_notification_to.as_ref()
    }

    #[must_use]
    pub const fn use_return_receipt_to(&self) -> bool {
        self.use_return_receipt_to
    }

    /// The explicitly requested return receipt recipient.
    #[must_use]
    pub const fn return_receipt_to(&self) -> Option<&Recipient> {
        self.return_receipt_to.as_ref()
    }

    /// The original message this email forwards, if any.
    #[must_use]
    pub const fn email_to_forward(&self) -> Option<&MimeMessage> {
        self.email_to_forward.as_ref()
    }

    /// Where disposition notifications go: the explicit recipient, else
    /// reply-to, else from. `None` when no notification was requested.
    #[must_use]
    pub fn disposition_notification_recipient(&self) -> Option<&Recipient> {
        self.use_disposition_notification_to
            .then(|| self.notification_target(self.disposition_notification_to.as_ref()))
            .flatten()
    }

    /// Where return receipts go, resolved like
    /// [`Email::disposition_notification_recipient`].
    #[must_use]
    pub fn return_receipt_recipient(&self) -> Option<&Recipient> {
        self.use_return_receipt_to
            .then(|| self.notification_target(self.return_receipt_to.as_ref()))
            .flatten()
    }

    fn notification_target<'a>(&'a self, explicit: Option<&'a Recipient>) -> Option<&'a Recipient> {
        explicit
            .or(self.reply_to.as_ref())
            .or(self.from.as_ref())
    }
}
