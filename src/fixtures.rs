//! Hand-built PDFs for tests.
//!
//! Writes the body objects, then an xref table with the real byte offsets so
//! the parser does not need to reconstruct anything. Integration tests include
//! this file through `tests/common`.

pub(crate) enum FixturePage<'a> {
    /// A page drawing one line of Helvetica text.
    Text(&'a str),
    /// A page with vector drawing only, like a scanned or image-only page.
    Blank,
    /// A page whose font resource is not a font, so text extraction errors.
    Broken,
}

pub(crate) fn pdf_with_pages(pages: &[FixturePage<'_>]) -> Vec<u8> {
    let mut bodies: Vec<String> = Vec::new();
    let kids: Vec<String> = (0..pages.len())
        .map(|i| format!("{} 0 R", 4 + 2 * i))
        .collect();
    // Last object: referenced as /F1 by broken pages.
    let not_a_font = 4 + 2 * pages.len();

    bodies.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());
    bodies.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        pages.len()
    ));
    bodies.push("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string());

    for (i, page) in pages.iter().enumerate() {
        let content_id = 5 + 2 * i;
        let font_id = match page {
            FixturePage::Broken => not_a_font,
            _ => 3,
        };
        bodies.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents {} 0 R /Resources << /Font << /F1 {} 0 R >> >> >>",
            content_id, font_id
        ));
        let content = match page {
            FixturePage::Text(text) => format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", text),
            FixturePage::Blank => "0 0 m 200 200 l S".to_string(),
            FixturePage::Broken => "BT /F1 12 Tf 72 720 Td (unreadable) Tj ET".to_string(),
        };
        bodies.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ));
    }

    bodies.push("<< /Type /XObject /Subtype /Form /BBox [0 0 1 1] >>".to_string());

    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(bodies.len());
    for (i, body) in bodies.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", bodies.len() + 1).as_bytes());
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer << /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            bodies.len() + 1,
            xref_start
        )
        .as_bytes(),
    );
    out
}

/// RC4 128-bit encrypted copy of `plain`. An empty `user_password` gives an
/// owner-password-only file, which readers open without asking.
pub(crate) fn encrypted(plain: &[u8], user_password: &str, owner_password: &str) -> Vec<u8> {
    use lopdf::{EncryptionState, EncryptionVersion, Object, Permissions, StringFormat};

    let mut doc = lopdf::Document::load_mem(plain).unwrap();
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(b"bill-viewer-0001".to_vec(), StringFormat::Literal),
            Object::String(b"bill-viewer-0002".to_vec(), StringFormat::Literal),
        ]),
    );

    let version = EncryptionVersion::V2 {
        document: &doc,
        owner_password,
        user_password,
        key_length: 128,
        permissions: Permissions::all(),
    };
    let state = EncryptionState::try_from(version).unwrap();
    doc.encrypt(&state).unwrap();

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}
