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

//! Rendering of the PDF documents attached to enrollment confirmations.

use crate::driver::email::format_date;
use crate::model::EnrollmentDetails;
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use time::OffsetDateTime;
use traindesk_core::driver::{DriverError, DriverResult};

/// Width of an A4 page in millimeters.
const PAGE_WIDTH_MM: f32 = 210.0;

/// Height of an A4 page in millimeters.
const PAGE_HEIGHT_MM: f32 = 297.0;

/// Left margin for all text in millimeters.
const MARGIN_MM: f32 = 20.0;

/// Helper to lay out consecutive lines of text on a PDF page.
struct TextWriter {
    layer: PdfLayerReference,
    font: IndirectFontRef,
    y: f32,
}

impl TextWriter {
    /// Writes `text` at the current position with the given font size and advances to the
    /// next line.
    fn line(&mut self, text: &str, size: f32) {
        self.layer.use_text(text, size, Mm(MARGIN_MM), Mm(self.y), &self.font);
        self.y -= size * 0.6;
    }

    /// Leaves a vertical gap before the next line.
    fn skip(&mut self) {
        self.y -= 6.0;
    }
}

/// Starts a single-page document titled `title` and returns the document handle and a writer
/// positioned at the top of the page.
fn new_document(title: &str) -> DriverResult<(printpdf::PdfDocumentReference, TextWriter)> {
    let (doc, page, layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| DriverError::BackendError(format!("Cannot load PDF font: {}", e)))?;
    let layer = doc.get_page(page).get_layer(layer);
    let writer = TextWriter { layer, font, y: PAGE_HEIGHT_MM - 30.0 };
    Ok((doc, writer))
}

/// Finishes `doc` and returns its serialized bytes.
fn save_document(doc: printpdf::PdfDocumentReference) -> DriverResult<Vec<u8>> {
    doc.save_to_bytes().map_err(|e| DriverError::BackendError(format!("Cannot save PDF: {}", e)))
}

/// Computes the short reference string stamped on the documents of one enrollment.
fn reference(enrollment_id: i32, now: OffsetDateTime) -> String {
    format!("TIR-{:04}-{}", now.unix_timestamp() % 10000, enrollment_id)
}

/// Computes the name of the spool file for a document of the given `kind`.
pub(super) fn spool_file_name(kind: &str, enrollment_id: i32, now: OffsetDateTime) -> String {
    format!("{}_{}_{}.pdf", kind, enrollment_id, now.unix_timestamp())
}

/// Renders the acceptance letter for an enrollment.
pub(super) fn render_acceptance_letter(
    details: &EnrollmentDetails,
    now: OffsetDateTime,
) -> DriverResult<Vec<u8>> {
    let (doc, mut writer) = new_document("Acceptance Letter")?;

    writer.line("Traindesk", 18.0);
    writer.skip();
    writer.line("ACCEPTANCE LETTER", 14.0);
    writer.line(&format!("Reference: {}", reference(details.enrollment.id, now)), 10.0);
    writer.line(&format!("Date: {}", format_date(now)?), 10.0);
    writer.skip();

    writer.line(&format!("Dear {},", details.enrollment.fullname), 11.0);
    writer.skip();
    writer.line(
        &format!("We are pleased to confirm your enrollment in \"{}\".", details.training.title),
        11.0,
    );
    writer.line(
        &format!(
            "The session runs from {} to {}.",
            format_date(details.schedule.start_date)?,
            format_date(details.schedule.end_date)?
        ),
        11.0,
    );
    writer.line(&format!("Venue: {}", details.training.address), 11.0);
    writer.line(&format!("Instructor: {}", details.training.instructor), 11.0);
    writer.line(&format!("Course fee: {}", details.training.fee), 11.0);
    writer.skip();
    writer.line("We look forward to seeing you there.", 11.0);
    writer.skip();
    writer.line("The Traindesk team", 11.0);

    save_document(doc)
}

/// Renders the invoice for an enrollment.  The invoice carries a single line item for the
/// training fee with no tax applied.
pub(super) fn render_invoice(
    details: &EnrollmentDetails,
    now: OffsetDateTime,
) -> DriverResult<Vec<u8>> {
    let (doc, mut writer) = new_document("Invoice")?;

    writer.line("Traindesk", 18.0);
    writer.skip();
    writer.line("INVOICE", 14.0);
    writer.line(&format!("Invoice number: {}", reference(details.enrollment.id, now)), 10.0);
    writer.line(&format!("Date: {}", format_date(now)?), 10.0);
    writer.skip();

    writer.line("Billed to:", 11.0);
    writer.line(&details.enrollment.fullname, 11.0);
    writer.line(&details.enrollment.address, 11.0);
    writer.line(details.enrollment.email.as_str(), 11.0);
    writer.skip();

    let fee = &details.training.fee;
    writer.line("Description                                  Qty        Amount", 11.0);
    writer.line(&format!("{}    1    {}", details.training.title, fee), 11.0);
    writer.skip();
    writer.line(&format!("Subtotal: {}", fee), 11.0);
    writer.line("Tax (0%): 0.00", 11.0);
    writer.line(&format!("Total due: {}", fee), 11.0);

    save_document(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Enrollment, EnrollmentStatus, Training, TrainingSchedule};
    use rust_decimal::Decimal;
    use time::macros::datetime;
    use traindesk_core::model::EmailAddress;

    fn make_details() -> EnrollmentDetails {
        EnrollmentDetails {
            enrollment: Enrollment {
                id: 7,
                fullname: "Some Student".to_owned(),
                email: EmailAddress::new("student@example.com").unwrap(),
                phone: "5551234567".to_owned(),
                address: "456 Other Street".to_owned(),
                training_schedule_id: 3,
                enrollment_date: datetime!(2025-06-20 15:30:00 UTC),
                status: EnrollmentStatus::Pending,
            },
            schedule: TrainingSchedule {
                id: 3,
                training_id: 2,
                start_date: datetime!(2025-07-01 09:00:00 UTC),
                end_date: datetime!(2025-07-28 17:00:00 UTC),
                capacity: 20,
            },
            training: Training {
                id: 2,
                title: "Advanced Kite Flying".to_owned(),
                description: "Learn to fly kites".to_owned(),
                details: "Details".to_owned(),
                duration: "4 weeks".to_owned(),
                instructor: "Some Instructor".to_owned(),
                fee: Decimal::new(8000, 2),
                original_fee: Decimal::new(10000, 2),
                discount_percentage: Decimal::new(20, 0),
                level: "Beginner".to_owned(),
                certification: true,
                what_you_will_learn: vec![],
                address: "123 Fake Street".to_owned(),
                category_id: 1,
                start_date: datetime!(2025-07-01 09:00:00 UTC),
                end_date: datetime!(2025-07-28 17:00:00 UTC),
            },
        }
    }

    #[test]
    fn test_reference_is_stable_for_same_inputs() {
        let now = datetime!(2025-06-20 15:30:00 UTC);
        assert_eq!(reference(7, now), reference(7, now));
        assert_ne!(reference(7, now), reference(8, now));
    }

    #[test]
    fn test_spool_file_name() {
        let now = datetime!(2025-06-20 15:30:00 UTC);
        let name = spool_file_name("invoice", 7, now);
        assert!(name.starts_with("invoice_7_"));
        assert!(name.ends_with(".pdf"));
        assert_ne!(name, spool_file_name("acceptance_letter", 7, now));
    }

    #[test]
    fn test_render_acceptance_letter() {
        let bytes =
            render_acceptance_letter(&make_details(), datetime!(2025-06-20 15:30:00 UTC)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_render_invoice() {
        let bytes = render_invoice(&make_details(), datetime!(2025-06-20 15:30:00 UTC)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
