use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use super::barcode::{encode_summary, GrayImage};
use super::layout::{PassFont, PassLayout, TextLine, PAGE_HEIGHT, PAGE_WIDTH};
use crate::identity::User;
use crate::workflows::parking::domain::{Application, ApplicationId, ApplicationStatus};

const DATE_FORMAT: &str = "%m/%d/%Y";
const BARCODE_RESOURCE: &str = "Im1";

/// Rendered pass ready to stream back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassDocument {
    pub application_id: ApplicationId,
    pub pass_number: String,
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Error raised while producing a pass document.
#[derive(Debug, thiserror::Error)]
pub enum PassDocumentError {
    #[error("pass is only available for approved applications (status: {})", .0.label())]
    NotApproved(ApplicationStatus),
    #[error("failed to encode pass barcode: {0}")]
    Barcode(String),
    #[error("failed to render pass document: {0}")]
    Render(String),
}

pub fn pass_number(id: ApplicationId) -> String {
    format!("PP-{:06}", id.0)
}

pub fn pass_filename(id: ApplicationId) -> String {
    format!("pass_{}.pdf", id.0)
}

/// Text encoded into the barcode: vehicle number, type, status, mobile, one per line.
pub fn summary_text(application: &Application) -> String {
    [
        application.vehicle_number.as_str(),
        application.vehicle_type.label(),
        application.status.label(),
        application.mobile_number.as_str(),
    ]
    .join("\n")
}

/// Lines printed under the barcode, top to bottom.
pub fn pass_lines(application: &Application, holder: &User) -> Vec<TextLine> {
    vec![
        TextLine::new("PARKING PASS", PassFont::Bold, 16.0),
        TextLine::new(holder.name.to_uppercase(), PassFont::Bold, 13.0),
        TextLine::new(application.vehicle_number.clone(), PassFont::Regular, 12.0),
        TextLine::new(
            format!("Vehicle: {}", application.vehicle_type.label()),
            PassFont::Regular,
            12.0,
        ),
        TextLine::new(
            format!("Status: {}", application.status.label()),
            PassFont::Regular,
            12.0,
        ),
        TextLine::new(
            format!("Issue Date: {}", application.issued_at.format(DATE_FORMAT)),
            PassFont::Regular,
            12.0,
        ),
        TextLine::new(
            format!("Expiry Date: {}", application.expires_at.format(DATE_FORMAT)),
            PassFont::Regular,
            12.0,
        ),
        TextLine::new(
            format!("Mobile: {}", application.mobile_number),
            PassFont::Regular,
            12.0,
        ),
    ]
}

/// Stateless renderer; every call builds its own document.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassDocumentGenerator;

impl PassDocumentGenerator {
    pub fn generate(
        &self,
        application: &Application,
        holder: &User,
    ) -> Result<PassDocument, PassDocumentError> {
        if application.status != ApplicationStatus::Approved {
            return Err(PassDocumentError::NotApproved(application.status));
        }

        let barcode = encode_summary(&summary_text(application))?;
        let layout = PassLayout::arrange(pass_lines(application, holder));
        let bytes = render_pdf(&layout, &barcode)?;

        Ok(PassDocument {
            application_id: application.id,
            pass_number: pass_number(application.id),
            filename: pass_filename(application.id),
            bytes,
        })
    }
}

fn render_pdf(layout: &PassLayout, barcode: &GrayImage) -> Result<Vec<u8>, PassDocumentError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(font_dictionary(PassFont::Regular));
    let bold_id = doc.add_object(font_dictionary(PassFont::Bold));
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(barcode.width),
            "Height" => i64::from(barcode.height),
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        barcode.pixels.clone(),
    ));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            PassFont::Regular.resource_name() => regular_id,
            PassFont::Bold.resource_name() => bold_id,
        },
        "XObject" => dictionary! {
            BARCODE_RESOURCE => image_id,
        },
    });

    let content = page_content(layout)
        .encode()
        .map_err(|err| PassDocumentError::Render(err.to_string()))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, content));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|err| PassDocumentError::Render(err.to_string()))?;
    Ok(bytes)
}

fn font_dictionary(font: PassFont) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => font.base_font(),
        "Encoding" => "WinAnsiEncoding",
    }
}

fn page_content(layout: &PassLayout) -> Content {
    let border = layout.border;
    let barcode = layout.barcode;

    let mut operations = vec![
        Operation::new("q", vec![]),
        Operation::new("w", vec![super::layout::BORDER_STROKE.into()]),
        Operation::new(
            "re",
            vec![
                border.x.into(),
                border.y.into(),
                border.width.into(),
                border.height.into(),
            ],
        ),
        Operation::new("S", vec![]),
        Operation::new("Q", vec![]),
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![
                barcode.width.into(),
                0.into(),
                0.into(),
                barcode.height.into(),
                barcode.x.into(),
                barcode.y.into(),
            ],
        ),
        Operation::new("Do", vec![Object::Name(BARCODE_RESOURCE.as_bytes().to_vec())]),
        Operation::new("Q", vec![]),
    ];

    for placed in &layout.lines {
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![
                Object::Name(placed.line.font.resource_name().as_bytes().to_vec()),
                placed.line.size.into(),
            ],
        ));
        operations.push(Operation::new("Td", vec![placed.x.into(), placed.y.into()]));
        operations.push(Operation::new(
            "Tj",
            vec![Object::string_literal(win_ansi_bytes(&placed.line.text))],
        ));
        operations.push(Operation::new("ET", vec![]));
    }

    Content { operations }
}

/// Latin-1 maps onto WinAnsi for the printable range; anything else becomes `?`.
fn win_ansi_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match ch as u32 {
            code @ 0x20..=0x7E | code @ 0xA0..=0xFF => code as u8,
            _ => b'?',
        })
        .collect()
}
