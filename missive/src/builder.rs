//! The fluent [`EmailBuilder`].
//!
//! Setters take `&mut self` and hand the builder back so calls chain.
//! Setters that validate their input return a [`Result`] instead; they check
//! everything before touching any field, so a failed call leaves the builder
//! exactly as it was.

use std::{borrow::Cow, collections::HashMap, fmt::Display, sync::Arc};

use missive_common::{
    AttachmentResource, ConvertError, DataSource, EmailError, Recipient, RecipientList, RecipientType, Result,
    address_parser::{interpret_recipient, parse_address_list},
    config::{DefaultRecipient, EmailDefaults},
    encoding::{contains_control, encode_text, is_header_name},
    internal,
};
use tracing::debug;

use crate::{
    Email,
    convert::{self, MimeMessage},
    dkim::{DkimConfig, DkimKey},
};

/// HTML quoting markup used by [`EmailBuilder::as_reply_to`] and
/// [`EmailBuilder::as_reply_to_all`]. `%s` is replaced by the original HTML.
pub const DEFAULT_QUOTING_MARKUP: &str = "<blockquote style=\"color: gray; border-left: 1px solid #4f4f4f; padding-left: 1cm\">%s</blockquote>";

/// A message to reply to or forward: either an email built here or a raw
/// message received from elsewhere.
#[derive(Debug, Clone, Copy)]
pub enum Original<'a> {
    Email(&'a Email),
    Message(&'a MimeMessage),
}

impl<'a> Original<'a> {
    fn to_mime_message(self) -> std::result::Result<MimeMessage, ConvertError> {
        match self {
            Self::Email(email) => convert::email_to_mime_message(email),
            Self::Message(message) => Ok(message.clone()),
        }
    }

    fn to_email(self) -> std::result::Result<Cow<'a, Email>, ConvertError> {
        match self {
            Self::Email(email) => Ok(Cow::Borrowed(email)),
            Self::Message(message) => convert::mime_message_to_email(message).map(Cow::Owned),
        }
    }
}

impl<'a> From<&'a Email> for Original<'a> {
    fn from(value: &'a Email) -> Self {
        Self::Email(value)
    }
}

impl<'a> From<&'a MimeMessage> for Original<'a> {
    fn from(value: &'a MimeMessage) -> Self {
        Self::Message(value)
    }
}

/// Accumulates the parts of an email until [`EmailBuilder::build`] is called.
#[derive(Debug, Clone, Default)]
pub struct EmailBuilder {
    id: Option<String>,
    from: Option<Recipient>,
    reply_to: Option<Recipient>,
    bounce_to: Option<Recipient>,
    subject: Option<String>,
    text: Option<String>,
    text_html: Option<String>,
    recipients: RecipientList,
    embedded_images: Vec<AttachmentResource>,
    attachments: Vec<AttachmentResource>,
    headers: HashMap<String, String>,
    dkim: Option<DkimConfig>,
    use_disposition_notification_to: bool,
    disposition_notification_to: Option<Recipient>,
    use_return_receipt_to: bool,
    return_receipt_to: Option<Recipient>,
    email_to_forward: Option<MimeMessage>,
}

/// Resolves a sender style address (`a@x` or `Name <a@x>`).
fn sender(name: Option<&str>, address: &str, field: &'static str) -> Result<Recipient> {
    if address.trim().is_empty() {
        return Err(EmailError::MissingArgument(field));
    }
    interpret_recipient(name, address, None)
}

fn default_sender(default: Option<&DefaultRecipient>, field: &'static str) -> Result<Option<Recipient>> {
    default
        .map(|default| sender(default.name.as_deref(), &default.address, field))
        .transpose()
}

fn prepend(current: Option<String>, prefix: &str) -> String {
    let mut body = prefix.to_string();
    body.push_str(current.as_deref().unwrap_or_default());
    body
}

fn append(current: Option<String>, suffix: &str) -> String {
    let mut body = current.unwrap_or_default();
    body.push_str(suffix);
    body
}

impl EmailBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder seeded with `defaults`.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::MissingArgument`] if a configured address or
    /// subject is empty.
    pub fn with_defaults(defaults: &EmailDefaults) -> Result<Self> {
        let mut builder = Self {
            from: default_sender(defaults.from.as_ref(), "defaultFromAddress")?,
            reply_to: default_sender(defaults.reply_to.as_ref(), "defaultReplyToAddress")?,
            bounce_to: default_sender(defaults.bounce_to.as_ref(), "defaultBounceToAddress")?,
            ..Self::default()
        };

        for (kind, default) in [
            (RecipientType::To, &defaults.to),
            (RecipientType::Cc, &defaults.cc),
            (RecipientType::Bcc, &defaults.bcc),
        ] {
            if let Some(default) = default {
                builder.add_address_list(kind, default.name.as_deref(), &default.address)?;
            }
        }

        if let Some(subject) = &defaults.subject {
            builder.subject(subject)?;
        }

        debug!(
            "Seeded builder from defaults with {} recipients",
            builder.recipients.len()
        );

        Ok(builder)
    }

    /// Sets an explicit Message-ID. The builder never generates one.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::InvalidArgument`] if the id holds a control
    /// character.
    pub fn id(&mut self, id: Option<&str>) -> Result<&mut Self> {
        if id.is_some_and(contains_control) {
            return Err(EmailError::InvalidArgument("id"));
        }

        self.id = id.map(str::to_string);
        Ok(self)
    }

    /// Sets the sender from `a@x` or `Name <a@x>`.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::MissingArgument`] if the address is empty.
    pub fn from(&mut self, address: &str) -> Result<&mut Self> {
        self.from_with_name(None, address)
    }

    /// Sets the sender; an explicit `name` wins over one in `address`.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::MissingArgument`] if the address is empty.
    pub fn from_with_name(&mut self, name: Option<&str>, address: &str) -> Result<&mut Self> {
        self.from = Some(sender(name, address, "fromAddress")?);
        Ok(self)
    }

    pub fn from_recipient(&mut self, recipient: &Recipient) -> &mut Self {
        self.from = Some(recipient.with_kind(None));
        self
    }

    /// # Errors
    ///
    /// Returns [`EmailError::MissingArgument`] if the address is empty.
    pub fn reply_to(&mut self, address: &str) -> Result<&mut Self> {
        self.reply_to_with_name(None, address)
    }

    /// # Errors
    ///
    /// Returns [`EmailError::MissingArgument`] if the address is empty.
    pub fn reply_to_with_name(&mut self, name: Option<&str>, address: &str) -> Result<&mut Self> {
        self.reply_to = Some(sender(name, address, "replyToAddress")?);
        Ok(self)
    }

    pub fn reply_to_recipient(&mut self, recipient: &Recipient) -> &mut Self {
        self.reply_to = Some(recipient.with_kind(None));
        self
    }

    /// Sets the Return-Path that delivery failures are sent to.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::MissingArgument`] if the address is empty.
    pub fn bounce_to(&mut self, address: &str) -> Result<&mut Self> {
        self.bounce_to_with_name(None, address)
    }

    /// # Errors
    ///
    /// Returns [`EmailError::MissingArgument`] if the address is empty.
    pub fn bounce_to_with_name(&mut self, name: Option<&str>, address: &str) -> Result<&mut Self> {
        self.bounce_to = Some(sender(name, address, "bounceToAddress")?);
        Ok(self)
    }

    pub fn bounce_to_recipient(&mut self, recipient: &Recipient) -> &mut Self {
        self.bounce_to = Some(recipient.with_kind(None));
        self
    }

    /// # Errors
    ///
    /// Returns [`EmailError::MissingArgument`] if the subject is empty.
    pub fn subject(&mut self, subject: &str) -> Result<&mut Self> {
        if subject.is_empty() {
            return Err(EmailError::MissingArgument("subject"));
        }
        self.subject = Some(subject.to_string());
        Ok(self)
    }

    pub fn text(&mut self, text: Option<&str>) -> &mut Self {
        self.text = text.map(str::to_string);
        self
    }

    /// Puts `text` in front of the plain text body; an absent body counts as
    /// empty.
    pub fn prepend_text(&mut self, text: &str) -> &mut Self {
        self.text = Some(prepend(self.text.take(), text));
        self
    }

    pub fn append_text(&mut self, text: &str) -> &mut Self {
        self.text = Some(append(self.text.take(), text));
        self
    }

    pub fn text_html(&mut self, html: Option<&str>) -> &mut Self {
        self.text_html = html.map(str::to_string);
        self
    }

    pub fn prepend_text_html(&mut self, html: &str) -> &mut Self {
        self.text_html = Some(prepend(self.text_html.take(), html));
        self
    }

    pub fn append_text_html(&mut self, html: &str) -> &mut Self {
        self.text_html = Some(append(self.text_html.take(), html));
        self
    }

    /// Adds every entry of a `,` or `;` delimited list as `kind` recipients.
    /// Entries may carry their own display name (`Name <a@x>`) unless `name`
    /// overrides it.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::MissingArgument`] if the list holds no address.
    pub fn add_address_list(
        &mut self,
        kind: RecipientType,
        name: Option<&str>,
        list: &str,
    ) -> Result<&mut Self> {
        let recipients = parse_address_list(name, list, Some(kind))?;
        self.recipients.extend(recipients);
        Ok(self)
    }

    /// Adds each address verbatim as a `kind` recipient named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::MissingArgument`] if there are no addresses or
    /// one of them is empty.
    pub fn add_addresses<I, S>(
        &mut self,
        kind: RecipientType,
        name: Option<&str>,
        addresses: I,
    ) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let recipients = addresses
            .into_iter()
            .map(|address| Recipient::new(name, address.as_ref(), Some(kind)))
            .collect::<Result<Vec<_>>>()?;

        if recipients.is_empty() {
            return Err(EmailError::MissingArgument("emailAddresses"));
        }

        self.recipients.extend(recipients);
        Ok(self)
    }

    /// Adds copies of `recipients`, re-tagged as `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::MissingArgument`] if `recipients` is empty.
    pub fn add_recipients<'r>(
        &mut self,
        kind: RecipientType,
        recipients: impl IntoIterator<Item = &'r Recipient>,
    ) -> Result<&mut Self> {
        let recipients: Vec<_> = recipients
            .into_iter()
            .map(|recipient| recipient.with_kind(Some(kind)))
            .collect();

        if recipients.is_empty() {
            return Err(EmailError::MissingArgument("recipients"));
        }

        self.recipients.extend(recipients);
        Ok(self)
    }

    /// # Errors
    ///
    /// See [`EmailBuilder::add_address_list`].
    pub fn to(&mut self, list: &str) -> Result<&mut Self> {
        self.add_address_list(RecipientType::To, None, list)
    }

    /// # Errors
    ///
    /// See [`EmailBuilder::add_address_list`].
    pub fn to_with_name(&mut self, name: Option<&str>, list: &str) -> Result<&mut Self> {
        self.add_address_list(RecipientType::To, name, list)
    }

    /// # Errors
    ///
    /// See [`EmailBuilder::add_addresses`].
    pub fn to_addresses<S: AsRef<str>>(&mut self, addresses: impl IntoIterator<Item = S>) -> Result<&mut Self> {
        self.add_addresses(RecipientType::To, None, addresses)
    }

    /// # Errors
    ///
    /// See [`EmailBuilder::add_addresses`].
    pub fn to_addresses_with_name<S: AsRef<str>>(
        &mut self,
        name: Option<&str>,
        addresses: impl IntoIterator<Item = S>,
    ) -> Result<&mut Self> {
        self.add_addresses(RecipientType::To, name, addresses)
    }

    /// # Errors
    ///
    /// See [`EmailBuilder::add_recipients`].
    pub fn to_recipients<'r>(&mut self, recipients: impl IntoIterator<Item = &'r Recipient>) -> Result<&mut Self> {
        self.add_recipients(RecipientType::To, recipients)
    }

    /// # Errors
    ///
    /// See [`EmailBuilder::add_address_list`].
    pub fn cc(&mut self, list: &str) -> Result<&mut Self> {
        self.add_address_list(RecipientType::Cc, None, list)
    }

    /// # Errors
    ///
    /// See [`EmailBuilder::add_address_list`].
    pub fn cc_with_name(&mut self, name: Option<&str>, list: &str) -> Result<&mut Self> {
        self.add_address_list(RecipientType::Cc, name, list)
    }

    /// # Errors
    ///
    /// See [`EmailBuilder::add_addresses`].
    pub fn cc_addresses<S: AsRef<str>>(&mut self, addresses: impl IntoIterator<Item = S>) -> Result<&mut Self> {
        self.add_addresses(RecipientType::Cc, None, addresses)
    }

    /// # Errors
    ///
    /// See [`EmailBuilder::add_addresses`].
    pub fn cc_addresses_with_name<S: AsRef<str>>(
        &mut self,
        name: Option<&str>,
        addresses: impl IntoIterator<Item = S>,
    ) -> Result<&mut Self> {
        self.add_addresses(RecipientType::Cc, name, addresses)
    }

    /// # Errors
    ///
    /// See [`EmailBuilder::add_recipients`].
    pub fn cc_recipients<'r>(&mut self, recipients: impl IntoIterator<Item = &'r Recipient>) -> Result<&mut Self> {
        self.add_recipients(RecipientType::Cc, recipients)
    }

    /// # Errors
    ///
    /// See [`EmailBuilder::add_address_list`].
    pub fn bcc(&mut self, list: &str) -> Result<&mut Self> {
        self.add_address_list(RecipientType::Bcc, None, list)
    }

    /// # Errors
    ///
    /// See [`EmailBuilder::add_address_list`].
    pub fn bcc_with_name(&mut self, name: Option<&str>, list: &str) -> Result<&mut Self> {
        self.add_address_list(RecipientType::Bcc, name, list)
    }

    /// # Errors
    ///
    /// See [`EmailBuilder::add_addresses`].
    pub fn bcc_addresses<S: AsRef<str>>(&mut self, addresses: impl IntoIterator<Item = S>) -> Result<&mut Self> {
        self.add_addresses(RecipientType::Bcc, None, addresses)
    }

    /// # Errors
    ///
    /// See [`EmailBuilder::add_addresses`].
    pub fn bcc_addresses_with_name<S: AsRef<str>>(
        &mut self,
        name: Option<&str>,
        addresses: impl IntoIterator<Item = S>,
    ) -> Result<&mut Self> {
        self.add_addresses(RecipientType::Bcc, name, addresses)
    }

    /// # Errors
    ///
    /// See [`EmailBuilder::add_recipients`].
    pub fn bcc_recipients<'r>(&mut self, recipients: impl IntoIterator<Item = &'r Recipient>) -> Result<&mut Self> {
        self.add_recipients(RecipientType::Bcc, recipients)
    }

    /// Embeds an image that HTML can reference as `cid:<name>`.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::MissingArgument`] if the name, the data or the
    /// content type is empty.
    pub fn embed_image(
        &mut self,
        name: &str,
        data: impl Into<Arc<[u8]>>,
        content_type: &str,
    ) -> Result<&mut Self> {
        if name.is_empty() {
            return Err(EmailError::MissingArgument("imagename"));
        }
        let source = DataSource::new(data, content_type)?;
        self.embedded_images
            .push(AttachmentResource::new(Some(name.to_string()), source));
        Ok(self)
    }

    /// Embeds an image, named `name` or else after its data source.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::NameMissingForEmbeddedImage`] if neither carries
    /// a name.
    pub fn embed_image_source(&mut self, name: Option<&str>, source: DataSource) -> Result<&mut Self> {
        let name = name
            .filter(|name| !name.is_empty())
            .or_else(|| source.name().filter(|name| !name.is_empty()))
            .map(str::to_string)
            .ok_or(EmailError::NameMissingForEmbeddedImage)?;

        self.embedded_images
            .push(AttachmentResource::new(Some(name), source));
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns [`EmailError::NameMissingForEmbeddedImage`] if one of the
    /// images has no name; none of them are added then.
    pub fn with_embedded_images(
        &mut self,
        images: impl IntoIterator<Item = AttachmentResource>,
    ) -> Result<&mut Self> {
        let images: Vec<_> = images.into_iter().collect();
        if images.iter().any(|image| image.name().is_none()) {
            return Err(EmailError::NameMissingForEmbeddedImage);
        }

        self.embedded_images.extend(images);
        Ok(self)
    }

    /// Sets a header to `value.to_string()`, replacing an earlier value.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::MissingArgument`] if the name or the rendered
    /// value is empty, and [`EmailError::InvalidArgument`] if the name is not
    /// printable ASCII without spaces and colons or the value holds a line
    /// break.
    pub fn add_header(&mut self, name: &str, value: impl Display) -> Result<&mut Self> {
        let (name, value) = header(name, &value)?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// # Errors
    ///
    /// See [`EmailBuilder::add_header`]. No header is added if one fails.
    pub fn with_headers<K, V>(&mut self, headers: impl IntoIterator<Item = (K, V)>) -> Result<&mut Self>
    where
        K: AsRef<str>,
        V: Display,
    {
        let headers = headers
            .into_iter()
            .map(|(name, value)| header(name.as_ref(), &value))
            .collect::<Result<Vec<_>>>()?;

        self.headers.extend(headers);
        Ok(self)
    }

    /// Attaches `data`. A non-ASCII name is RFC 2047 encoded.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::MissingArgument`] if the data or the content type
    /// is empty.
    pub fn add_attachment(
        &mut self,
        name: Option<&str>,
        data: impl Into<Arc<[u8]>>,
        content_type: &str,
    ) -> Result<&mut Self> {
        let source = DataSource::new(data, content_type)?;
        Ok(self.add_attachment_source(name, source))
    }

    pub fn add_attachment_source(&mut self, name: Option<&str>, source: DataSource) -> &mut Self {
        self.attachments
            .push(AttachmentResource::new(name.map(encode_text), source));
        self
    }

    pub fn with_attachments(&mut self, attachments: impl IntoIterator<Item = AttachmentResource>) -> &mut Self {
        self.attachments.extend(attachments);
        self
    }

    /// Records the DKIM parameters; the message is signed when it is sent.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::MissingArgument`] if the key, the domain or the
    /// selector is empty.
    pub fn sign_with_domain_key(
        &mut self,
        key: impl Into<DkimKey>,
        signing_domain: &str,
        selector: &str,
    ) -> Result<&mut Self> {
        self.dkim = Some(DkimConfig::new(key.into(), signing_domain, selector)?);
        Ok(self)
    }

    /// Requests a disposition notification, sent to reply-to or else from.
    pub fn with_disposition_notification_to(&mut self) -> &mut Self {
        self.use_disposition_notification_to = true;
        self.disposition_notification_to = None;
        self
    }

    /// # Errors
    ///
    /// Returns [`EmailError::MissingArgument`] if the address is empty.
    pub fn with_disposition_notification_to_address(&mut self, address: &str) -> Result<&mut Self> {
        let recipient = sender(None, address, "dispositionNotificationToAddress")?;
        Ok(self.with_disposition_notification_to_recipient(&recipient))
    }

    pub fn with_disposition_notification_to_recipient(&mut self, recipient: &Recipient) -> &mut Self {
        self.use_disposition_notification_to = true;
        self.disposition_notification_to = Some(recipient.with_kind(None));
        self
    }

    /// Requests a return receipt, sent to reply-to or else from.
    pub fn with_return_receipt_to(&mut self) -> &mut Self {
        self.use_return_receipt_to = true;
        self.return_receipt_to = None;
        self
    }

    /// # Errors
    ///
    /// Returns [`EmailError::MissingArgument`] if the address is empty.
    pub fn with_return_receipt_to_address(&mut self, address: &str) -> Result<&mut Self> {
        let recipient = sender(None, address, "returnReceiptToAddress")?;
        Ok(self.with_return_receipt_to_recipient(&recipient))
    }

    pub fn with_return_receipt_to_recipient(&mut self, recipient: &Recipient) -> &mut Self {
        self.use_return_receipt_to = true;
        self.return_receipt_to = Some(recipient.with_kind(None));
        self
    }

    /// Primes a reply to the sender of `original`, quoting HTML with
    /// [`DEFAULT_QUOTING_MARKUP`].
    ///
    /// # Errors
    ///
    /// See [`EmailBuilder::as_reply_to_with_template`].
    pub fn as_reply_to<'a>(&mut self, original: impl Into<Original<'a>>) -> Result<&mut Self> {
        self.as_reply_to_with_template(original, false, DEFAULT_QUOTING_MARKUP)
    }

    /// Primes a reply to everyone `original` was addressed to.
    ///
    /// # Errors
    ///
    /// See [`EmailBuilder::as_reply_to_with_template`].
    pub fn as_reply_to_all<'a>(&mut self, original: impl Into<Original<'a>>) -> Result<&mut Self> {
        self.as_reply_to_with_template(original, true, DEFAULT_QUOTING_MARKUP)
    }

    /// Primes the builder with everything a reply to `original` needs.
    ///
    /// The subject becomes `Re: <subject>` (never nested) and the addressees
    /// of the reply are added as To recipients. The original text is
    /// appended to the current text with every line prefixed by `> `, and
    /// the original HTML is appended wrapped in `template`, whose single
    /// `%s` marks where it goes. Threading headers are merged and the
    /// original embedded images are carried over. Set the body before
    /// calling this, or the quoted content ends up in front of it.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::InvalidQuotingTemplate`] if `template` does not
    /// contain exactly one `%s`, or [`EmailError::ReplyFailed`] if the
    /// original cannot be converted.
    pub fn as_reply_to_with_template<'a>(
        &mut self,
        original: impl Into<Original<'a>>,
        reply_all: bool,
        template: &str,
    ) -> Result<&mut Self> {
        if template.matches("%s").count() != 1 {
            return Err(EmailError::InvalidQuotingTemplate(template.to_string()));
        }

        let original: Original<'a> = original.into();
        let skeleton = original
            .to_mime_message()
            .and_then(|message| message.reply(reply_all))
            .and_then(|skeleton| convert::mime_message_to_email(&skeleton))
            .map_err(EmailError::ReplyFailed)?;
        let replied_to = original.to_email().map_err(EmailError::ReplyFailed)?;

        if let Some(subject) = skeleton.subject {
            self.subject = Some(subject);
        }

        self.recipients.extend(
            skeleton
                .recipients
                .iter()
                .map(|recipient| recipient.with_kind(Some(RecipientType::To))),
        );

        if let Some(text) = replied_to.text().filter(|text| !text.is_empty()) {
            let quoted: String = text.split_inclusive('\n').map(|line| format!("> {line}")).collect();
            self.text = Some(append(self.text.take(), &quoted));
        }

        if let Some(html) = replied_to.text_html().filter(|html| !html.is_empty()) {
            self.text_html = Some(append(self.text_html.take(), &template.replacen("%s", html, 1)));
        }

        self.headers.extend(skeleton.headers);
        self.embedded_images
            .extend(replied_to.embedded_images().iter().cloned());

        debug!(
            "Primed reply{} with {} recipients",
            if reply_all { " to all" } else { "" },
            skeleton.recipients.len()
        );

        Ok(self)
    }

    /// Primes a forward of `original`: the subject becomes
    /// `Fwd: <subject>` (nesting allowed) and the original is attached as a
    /// whole.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::Convert`] if `original` is an email that cannot
    /// be rendered, or a message whose subject cannot be read.
    pub fn as_forward_of<'a>(&mut self, original: impl Into<Original<'a>>) -> Result<&mut Self> {
        let original: Original<'a> = original.into();
        let message = original.to_mime_message()?;
        let subject = message.subject()?.unwrap_or_default();

        self.subject = Some(format!("Fwd: {subject}"));
        self.email_to_forward = Some(message);

        debug!("Primed forward of {subject:?}");

        Ok(self)
    }

    /// Snapshots the builder into an [`Email`]. The builder stays usable, and
    /// later changes to it do not affect emails already built.
    #[must_use]
    pub fn build(&self) -> Email {
        internal!(
            level = DEBUG,
            "Building email with {} recipients, {} attachments and {} embedded images",
            self.recipients.len(),
            self.attachments.len(),
            self.embedded_images.len()
        );

        Email {
            id: self.id.clone(),
            from: self.from.clone(),
            reply_to: self.reply_to.clone(),
            bounce_to: self.bounce_to.clone(),
            subject: self.subject.clone(),
            text: self.text.clone(),
            text_html: self.text_html.clone(),
            recipients: self.recipients.clone(),
            embedded_images: self.embedded_images.clone(),
            attachments: self.attachments.clone(),
            headers: self.headers.clone(),
            dkim: self.dkim.clone(),
            use_disposition_notification_to: self.use_disposition_notification_to,
            disposition_notification_to: self.disposition_notification_to.clone(),
            use_return_receipt_to: self.use_return_receipt_to,
            return_receipt_to: self.return_receipt_to.clone(),
            email_to_forward: self.email_to_forward.clone(),
        }
    }
}

fn header(name: &str, value: &dyn Display) -> Result<(String, String)> {
    if name.trim().is_empty() {
        return Err(EmailError::MissingArgument("headerName"));
    }
    if !is_header_name(name) {
        return Err(EmailError::InvalidArgument("headerName"));
    }

    let value = value.to_string();
    if value.is_empty() {
        return Err(EmailError::MissingArgument("headerValue"));
    }
    if value.contains(['\r', '\n']) {
        return Err(EmailError::InvalidArgument("headerValue"));
    }

    Ok((name.to_string(), value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn addresses(email: &Email, kind: RecipientType) -> Vec<&str> {
        email.recipients_of(kind).map(Recipient::address).collect()
    }

    #[test]
    fn test_delimited_list_split() {
        let mut builder = EmailBuilder::new();
        builder.to("a@x.com,b@x.com").unwrap();

        let email = builder.build();
        assert_eq!(addresses(&email, RecipientType::To), ["a@x.com", "b@x.com"]);
        assert!(email.recipients().iter().all(|r| r.name().is_none()));
    }

    #[test]
    fn test_list_entries_keep_their_names() {
        let mut builder = EmailBuilder::new();
        builder
            .cc("\"Doe, Jane\" <jane@x.com>; john@x.com")
            .unwrap()
            .bcc_with_name(Some("Team"), "Someone <one@x.com>")
            .unwrap();

        let email = builder.build();
        let cc: Vec<_> = email.recipients_of(RecipientType::Cc).collect();
        assert_eq!(cc[0].name(), Some("Doe, Jane"));
        assert_eq!(cc[0].address(), "jane@x.com");
        assert_eq!(cc[1].name(), None);

        let bcc: Vec<_> = email.recipients_of(RecipientType::Bcc).collect();
        assert_eq!(bcc[0].name(), Some("Team"));
        assert_eq!(bcc[0].address(), "one@x.com");
    }

    #[test]
    fn test_duplicates_collapse_per_role() {
        let mut builder = EmailBuilder::new();
        builder
            .to("a@x.com")
            .unwrap()
            .to_with_name(Some("Other name"), "a@x.com")
            .unwrap()
            .cc("a@x.com")
            .unwrap();

        let email = builder.build();
        assert_eq!(email.recipients().len(), 2);
        assert_eq!(email.recipients()[0].name(), None);
    }

    #[test]
    fn test_addresses_used_verbatim() {
        let mut builder = EmailBuilder::new();
        builder
            .to_addresses_with_name(Some("Shared"), ["a@x.com", "b@x.com"])
            .unwrap();

        let err = builder.bcc_addresses(["c@x.com", ""]).unwrap_err();
        assert!(matches!(err, EmailError::MissingArgument(_)));

        let err = builder.cc_addresses(Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, EmailError::MissingArgument(_)));

        let email = builder.build();
        assert_eq!(email.recipients().len(), 2);
        assert!(email.recipients().iter().all(|r| r.name() == Some("Shared")));
    }

    #[test]
    fn test_recipients_retagged() {
        let original = Recipient::new(Some("A"), "a@x.com", Some(RecipientType::Bcc)).unwrap();

        let mut builder = EmailBuilder::new();
        builder.cc_recipients([&original]).unwrap();

        let email = builder.build();
        assert_eq!(email.recipients()[0].kind(), Some(RecipientType::Cc));
    }

    #[test]
    fn test_empty_list_rejected() {
        let mut builder = EmailBuilder::new();
        assert!(matches!(
            builder.to(" , ;").unwrap_err(),
            EmailError::MissingArgument(_)
        ));
        assert!(builder.build().recipients().is_empty());
    }

    #[test]
    fn test_sender_forms() {
        let mut builder = EmailBuilder::new();
        builder
            .from("Jane <jane@x.com>")
            .unwrap()
            .reply_to_with_name(Some("Replies"), "replies@x.com")
            .unwrap();

        let to = Recipient::new(None, "bounce@x.com", Some(RecipientType::To)).unwrap();
        builder.bounce_to_recipient(&to);

        let email = builder.build();
        assert_eq!(email.from_recipient().unwrap().name(), Some("Jane"));
        assert_eq!(email.reply_to_recipient().unwrap().name(), Some("Replies"));
        assert_eq!(email.bounce_to_recipient().unwrap().kind(), None);

        assert!(matches!(
            builder.from("").unwrap_err(),
            EmailError::MissingArgument("fromAddress")
        ));
        assert_eq!(builder.build().from_recipient().unwrap().address(), "jane@x.com");
    }

    #[test]
    fn test_prepend_and_append_on_empty() {
        let mut builder = EmailBuilder::new();
        builder.prepend_text("A").append_text("B");
        builder.append_text_html("<b>").prepend_text_html("<p>");

        let email = builder.build();
        assert_eq!(email.text(), Some("AB"));
        assert_eq!(email.text_html(), Some("<p><b>"));
    }

    #[test]
    fn test_subject_required() {
        let mut builder = EmailBuilder::new();
        assert!(builder.subject("").is_err());
        assert_eq!(builder.build().subject(), None);
    }

    #[test]
    fn test_embedded_image_naming() {
        let unnamed = DataSource::new(b"png".to_vec(), "image/png").unwrap();

        let mut builder = EmailBuilder::new();
        assert!(matches!(
            builder.embed_image_source(None, unnamed.clone()).unwrap_err(),
            EmailError::NameMissingForEmbeddedImage
        ));
        builder.embed_image_source(Some("sig"), unnamed.clone()).unwrap();
        builder
            .embed_image_source(None, unnamed.with_name(Some("logo.png".to_string())))
            .unwrap();

        let email = builder.build();
        let names: Vec<_> = email.embedded_images().iter().map(|i| i.name()).collect();
        assert_eq!(names, [Some("sig"), Some("logo.png")]);
    }

    #[test]
    fn test_embed_image_validation() {
        let mut builder = EmailBuilder::new();
        assert!(builder.embed_image("", b"x".to_vec(), "image/png").is_err());
        assert!(builder.embed_image("x", Vec::<u8>::new(), "image/png").is_err());
        assert!(builder.embed_image("x", b"x".to_vec(), "").is_err());
        assert!(builder.build().embedded_images().is_empty());
    }

    #[test]
    fn test_headers_stringified_last_wins() {
        let mut builder = EmailBuilder::new();
        builder
            .add_header("X-Priority", 1)
            .unwrap()
            .add_header("X-Priority", 3)
            .unwrap();

        assert!(builder.add_header("", "x").is_err());
        assert!(builder.add_header("X-Empty", "").is_err());
        assert!(builder.with_headers([("X-A", "a"), ("X-B", "")]).is_err());

        let email = builder.build();
        assert_eq!(email.headers().len(), 1);
        assert_eq!(email.headers()["X-Priority"], "3");
    }

    #[test]
    fn test_malformed_header_rejected() {
        let mut builder = EmailBuilder::new();

        for name in ["X-A: 1\r\nBcc", "X A", "X-A:", "X-Ä"] {
            assert!(
                matches!(
                    builder.add_header(name, "evil@x.com").unwrap_err(),
                    EmailError::InvalidArgument("headerName")
                ),
                "{name:?} accepted"
            );
        }
        assert!(matches!(
            builder.add_header("X-A", "1\r\nBcc: evil@x.com").unwrap_err(),
            EmailError::InvalidArgument("headerValue")
        ));

        assert!(builder.build().headers().is_empty());
    }

    #[test]
    fn test_id_with_line_break_rejected() {
        let mut builder = EmailBuilder::new();
        builder.id(Some("<x@y>")).unwrap();

        assert!(matches!(
            builder.id(Some("<x@y>\r\nBcc: evil@x.com")).unwrap_err(),
            EmailError::InvalidArgument("id")
        ));
        assert_eq!(builder.build().id(), Some("<x@y>"));
    }

    #[test]
    fn test_recipient_with_line_break_rejected() {
        let mut builder = EmailBuilder::new();

        assert!(matches!(
            builder
                .to_with_name(Some("Bob\r\nBcc: evil@x.com"), "bob@x.com")
                .unwrap_err(),
            EmailError::InvalidArgument("name")
        ));
        assert!(matches!(
            builder
                .to_addresses(["ok@x.com", "bob@x.com\r\nBcc: evil@x.com"])
                .unwrap_err(),
            EmailError::InvalidArgument("address")
        ));
        assert!(builder.from_with_name(Some("Eve\n"), "eve@x.com").is_err());

        let email = builder.build();
        assert!(email.recipients().is_empty());
        assert!(email.from_recipient().is_none());
    }

    #[test]
    fn test_attachment_name_encoded() {
        let mut builder = EmailBuilder::new();
        builder
            .add_attachment(Some("résumé.pdf"), b"%PDF".to_vec(), "application/pdf")
            .unwrap()
            .add_attachment(None, b"x".to_vec(), "text/plain")
            .unwrap();

        let email = builder.build();
        assert_eq!(
            email.attachments()[0].name(),
            Some("=?UTF-8?B?csOpc3Vtw6kucGRm?=")
        );
        assert_eq!(email.attachments()[1].name(), None);
    }

    #[test]
    fn test_dkim_last_call_wins() {
        let mut builder = EmailBuilder::new();
        builder
            .sign_with_domain_key("first", "a.com", "s1")
            .unwrap()
            .sign_with_domain_key(b"second".to_vec(), "b.com", "s2")
            .unwrap();

        assert!(builder.sign_with_domain_key("", "c.com", "s3").is_err());

        let email = builder.build();
        assert_eq!(email.dkim().unwrap().signing_domain(), "b.com");
    }

    #[test]
    fn test_notification_flags() {
        let mut builder = EmailBuilder::new();
        builder
            .with_disposition_notification_to_address("dn@x.com")
            .unwrap()
            .with_disposition_notification_to()
            .with_return_receipt_to();

        let email = builder.build();
        assert!(email.use_disposition_notification_to());
        assert!(email.disposition_notification_to().is_none());
        assert!(email.use_return_receipt_to());
    }

    #[test]
    fn test_invalid_template_rejected() {
        let original = MimeMessage::from("From: a@x.com\r\nSubject: Hi\r\n\r\nbody");
        let mut builder = EmailBuilder::new();

        for template in ["no placeholder", "%s twice %s"] {
            assert!(matches!(
                builder.as_reply_to_with_template(&original, false, template).unwrap_err(),
                EmailError::InvalidQuotingTemplate(_)
            ));
        }
        assert_eq!(builder.build().subject(), None);
    }

    #[test]
    fn test_reply_quotes_text() {
        let original = MimeMessage::from(
            "Message-ID: <1@x.com>\r\nFrom: a@x.com\r\nSubject: Hi\r\n\r\nline one\r\nline two",
        );

        let mut builder = EmailBuilder::new();
        builder.text(Some("Thanks!\n")).as_reply_to(&original).unwrap();

        let email = builder.build();
        assert_eq!(email.subject(), Some("Re: Hi"));
        assert_eq!(email.text(), Some("Thanks!\n> line one\n> line two"));
        assert_eq!(email.text_html(), None);
        assert_eq!(addresses(&email, RecipientType::To), ["a@x.com"]);
        assert_eq!(email.headers()["In-Reply-To"], "<1@x.com>");
    }

    #[test]
    fn test_build_snapshots_are_independent() {
        let mut builder = EmailBuilder::new();
        builder.to("a@x.com").unwrap();
        let first = builder.build();

        builder.to("b@x.com").unwrap().add_header("X-A", "a").unwrap();
        let second = builder.build();

        assert_eq!(first.recipients().len(), 1);
        assert!(first.headers().is_empty());
        assert_eq!(second.recipients().len(), 2);
    }
}
