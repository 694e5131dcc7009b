// Traindesk
// Copyright 2025 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Construction of the canned messages that the service sends over email.

use crate::model::{EnrollmentDetails, ResetToken, User};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, Message, MultiPart, SinglePart};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;
use traindesk_core::driver::DriverResult;
use traindesk_core::model::{EmailAddress, ModelError, ModelResult};
use traindesk_core::template;

/// Date format used in messages shown to enrollees.
const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Subject of the password reset message.
const RESET_PASSWORD_SUBJECT: &str = "Traindesk password reset";

/// Body of the password reset message.
const RESET_PASSWORD_BODY: &str = "Hello %username%,

A password reset was requested for your Traindesk account.  Follow this link
to choose a new password:

%reset_url%

The link expires in one hour.  If you did not request a reset, you can safely
ignore this message.
";

/// Subject of the enrollment confirmation message.
const ENROLLMENT_SUBJECT: &str = "Enrollment Confirmation: %title%";

/// Body of the enrollment confirmation message.
const ENROLLMENT_BODY: &str = "Dear %fullname%,

Your enrollment in \"%title%\" has been received.  The session runs from
%start_date% to %end_date% and the fee is %fee%.

Your acceptance letter and invoice are attached to this message.

Thank you for choosing Traindesk.
";

/// A template for an email message.
pub(crate) struct EmailTemplate {
    /// Who the message comes from.
    from: Mailbox,

    /// Subject of the message.
    subject_template: &'static str,

    /// Body of the message.
    body_template: &'static str,
}

impl EmailTemplate {
    /// Creates a message sent to `to` based on the template by applying the collection of
    /// `replacements` to it.
    fn apply(
        &self,
        to: &EmailAddress,
        replacements: &[(&'static str, &str)],
    ) -> ModelResult<Message> {
        let builder = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(to)?)
            .subject(template::apply(self.subject_template, replacements));
        builder
            .body(template::apply(self.body_template, replacements))
            .map_err(|e| ModelError(format!("Failed to encode message: {:?}", e)))
    }

    /// Creates a message sent to `to` based on the template, attaching every `(filename, bytes)`
    /// pair in `pdfs` as a PDF document.
    fn apply_with_pdfs(
        &self,
        to: &EmailAddress,
        replacements: &[(&'static str, &str)],
        pdfs: Vec<(String, Vec<u8>)>,
    ) -> ModelResult<Message> {
        let content_type = ContentType::parse("application/pdf")
            .map_err(|e| ModelError(format!("Invalid attachment content type: {}", e)))?;

        let mut multipart = MultiPart::mixed()
            .singlepart(SinglePart::plain(template::apply(self.body_template, replacements)));
        for (filename, bytes) in pdfs {
            multipart =
                multipart.singlepart(Attachment::new(filename).body(bytes, content_type.clone()));
        }

        Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(to)?)
            .subject(template::apply(self.subject_template, replacements))
            .multipart(multipart)
            .map_err(|e| ModelError(format!("Failed to encode message: {:?}", e)))
    }
}

/// The set of templates the driver sends messages from.
pub(crate) struct EmailTemplates {
    /// Template for the password reset link message.
    reset_password: EmailTemplate,

    /// Template for the enrollment confirmation message.
    enrollment: EmailTemplate,
}

impl EmailTemplates {
    /// Creates the canned templates with messages originating at `from`.
    pub(crate) fn new(from: Mailbox) -> Self {
        Self {
            reset_password: EmailTemplate {
                from: from.clone(),
                subject_template: RESET_PASSWORD_SUBJECT,
                body_template: RESET_PASSWORD_BODY,
            },
            enrollment: EmailTemplate {
                from,
                subject_template: ENROLLMENT_SUBJECT,
                body_template: ENROLLMENT_BODY,
            },
        }
    }
}

/// Converts a validated email address into the mailbox type that `lettre` expects.
fn parse_mailbox(email: &EmailAddress) -> ModelResult<Mailbox> {
    email
        .as_str()
        .parse()
        .map_err(|e| ModelError(format!("Cannot parse email address {}: {}", email.as_str(), e)))
}

/// Formats a timestamp as a date for display in messages and documents.
pub(super) fn format_date(ts: OffsetDateTime) -> ModelResult<String> {
    ts.format(DATE_FORMAT).map_err(|e| ModelError(format!("Cannot format date: {}", e)))
}

/// Builds the password reset message for `user` carrying a link to the frontend's reset page
/// with `token` in its query string.
pub(super) fn reset_password_message(
    templates: &EmailTemplates,
    frontend_base_url: &str,
    user: &User,
    token: &ResetToken,
) -> DriverResult<Message> {
    let reset_url = format!(
        "{}/reset-password?token={}",
        frontend_base_url.trim_end_matches('/'),
        token.as_str()
    );
    let replacements =
        [("username", user.username().as_str()), ("reset_url", reset_url.as_str())];
    Ok(templates.reset_password.apply(user.email(), &replacements)?)
}

/// Builds the enrollment confirmation message for `details` with the given PDF documents
/// attached.
pub(super) fn enrollment_message(
    templates: &EmailTemplates,
    details: &EnrollmentDetails,
    pdfs: Vec<(String, Vec<u8>)>,
) -> DriverResult<Message> {
    let start_date = format_date(details.schedule.start_date)?;
    let end_date = format_date(details.schedule.end_date)?;
    let fee = details.training.fee.to_string();
    let replacements = [
        ("fullname", details.enrollment.fullname.as_str()),
        ("title", details.training.title.as_str()),
        ("start_date", start_date.as_str()),
        ("end_date", end_date.as_str()),
        ("fee", fee.as_str()),
    ];
    Ok(templates.enrollment.apply_with_pdfs(&details.enrollment.email, &replacements, pdfs)?)
}

/// Utilities to help testing email messages.
#[cfg(any(test, feature = "testutils"))]
pub(crate) mod testutils {
    use lettre::message::Message;
    use std::collections::HashMap;

    /// Given an SMTP `message`, parses it and extracts its headers and body.
    ///
    /// Folded headers are unfolded into a single value.  When the top-level headers advertise
    /// a quoted-printable transfer encoding, the body is decoded back into plain text; the body
    /// of a multipart message is returned as is because the parts carry their own encodings.
    pub(crate) fn parse_message(message: &Message) -> (HashMap<String, String>, String) {
        let text = String::from_utf8(message.formatted()).unwrap();
        let (raw_headers, raw_body) = text
            .split_once("\r\n\r\n")
            .unwrap_or_else(|| panic!("Message seems to have the wrong format: {}", text));

        let mut headers: HashMap<String, String> = HashMap::default();
        let mut last_key: Option<String> = None;
        for line in raw_headers.split("\r\n") {
            if line.starts_with(' ') || line.starts_with('\t') {
                let key = last_key
                    .as_ref()
                    .unwrap_or_else(|| panic!("Continuation without a header: {}", line));
                let value = headers.get_mut(key).unwrap();
                value.push(' ');
                value.push_str(line.trim_start());
            } else {
                let (key, value) = line
                    .split_once(": ")
                    .unwrap_or_else(|| panic!("Header seems to have the wrong format: {}", line));
                let previous = headers.insert(key.to_owned(), value.to_owned());
                assert!(previous.is_none(), "Duplicate header {}", line);
                last_key = Some(key.to_owned());
            }
        }

        let body = match headers.get("Content-Transfer-Encoding").map(String::as_str) {
            Some("quoted-printable") => {
                let bytes = quoted_printable::decode(raw_body, quoted_printable::ParseMode::Strict)
                    .unwrap();
                String::from_utf8(bytes).unwrap()
            }
            _ => raw_body.to_owned(),
        };

        (headers, body.replace("\r\n", "\n"))
    }
}
