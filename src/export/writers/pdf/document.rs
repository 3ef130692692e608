//! PDF 1.4 file assembly
//!
//! ```text
//! Canvas per page
//!     ↓
//! [Canvas::to_content_stream] (ops → content stream bytes)
//!     ↓
//! [PdfWriter] (catalog, page tree, fonts, info, xref, trailer)
//!     ↓
//! PDF bytes
//! ```
//!
//! Content streams are stored uncompressed and objects are numbered in a
//! fixed order, so identical pages always give identical bytes.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use super::canvas::{Canvas, encode_text};

const CATALOG_ID: usize = 1;
const PAGES_ID: usize = 2;
const FONT_REGULAR_ID: usize = 3;
const FONT_BOLD_ID: usize = 4;
const INFO_ID: usize = 5;
const FIRST_PAGE_ID: usize = 6;

/// Document information dictionary entries
#[derive(Debug, Clone)]
pub struct DocumentInfo {
    pub title: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

/// Assembles pages into a complete PDF file
#[derive(Debug)]
pub struct PdfWriter {
    width: f64,
    height: f64,
    pages: Vec<Vec<u8>>,
}

impl PdfWriter {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            pages: Vec::new(),
        }
    }

    pub fn add_page(&mut self, canvas: &Canvas) {
        self.pages.push(canvas.to_content_stream(self.height));
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_id(index: usize) -> usize {
        FIRST_PAGE_ID + index * 2
    }

    /// Serialize the document
    ///
    /// # Returns
    /// * `Vec<u8>` - Complete PDF file
    pub fn finish(self, info: &DocumentInfo) -> Vec<u8> {
        let mut out = ObjectBuffer::new();
        out.raw(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");

        out.object(
            CATALOG_ID,
            format!("<< /Type /Catalog /Pages {PAGES_ID} 0 R >>").as_bytes(),
        );

        let kids: Vec<String> = (0..self.pages.len())
            .map(|i| format!("{} 0 R", Self::page_id(i)))
            .collect();
        out.object(
            PAGES_ID,
            format!(
                "<< /Type /Pages /Kids [{}] /Count {} >>",
                kids.join(" "),
                self.pages.len()
            )
            .as_bytes(),
        );

        for (id, base) in [
            (FONT_REGULAR_ID, "Helvetica"),
            (FONT_BOLD_ID, "Helvetica-Bold"),
        ] {
            out.object(
                id,
                format!(
                    "<< /Type /Font /Subtype /Type1 /BaseFont /{base} /Encoding /WinAnsiEncoding >>"
                )
                .as_bytes(),
            );
        }

        let date = info.created_at.format("D:%Y%m%d%H%M%SZ");
        out.object(
            INFO_ID,
            format!(
                "<< /Title ({}) /Author ({}) /Producer (fxexport) /CreationDate ({date}) >>",
                encode_text(&info.title),
                encode_text(&info.author)
            )
            .as_bytes(),
        );

        let media_box = format!("[0 0 {} {}]", self.width, self.height);
        for (i, content) in self.pages.iter().enumerate() {
            let page_id = Self::page_id(i);
            let content_id = page_id + 1;
            out.object(
                page_id,
                format!(
                    "<< /Type /Page /Parent {PAGES_ID} 0 R /MediaBox {media_box} \
                     /Resources << /Font << /F1 {FONT_REGULAR_ID} 0 R /F2 {FONT_BOLD_ID} 0 R >> >> \
                     /Contents {content_id} 0 R >>"
                )
                .as_bytes(),
            );

            let mut stream = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
            stream.extend_from_slice(content);
            stream.extend_from_slice(b"\nendstream");
            out.object(content_id, &stream);
        }

        out.finish(INFO_ID)
    }
}

/// Byte buffer that records object offsets for the xref table
struct ObjectBuffer {
    bytes: Vec<u8>,
    offsets: Vec<(usize, usize)>,
}

impl ObjectBuffer {
    fn new() -> Self {
        Self {
            bytes: Vec::new(),
            offsets: Vec::new(),
        }
    }

    fn raw(&mut self, data: &[u8]) {
        self.bytes.extend_from_slice(data);
    }

    fn object(&mut self, id: usize, body: &[u8]) {
        self.offsets.push((id, self.bytes.len()));
        self.raw(format!("{id} 0 obj\n").as_bytes());
        self.raw(body);
        self.raw(b"\nendobj\n");
    }

    fn finish(mut self, info_id: usize) -> Vec<u8> {
        self.offsets.sort_by_key(|(id, _)| *id);
        let size = self.offsets.len() + 1;
        let xref_offset = self.bytes.len();

        let mut table = String::new();
        let _ = write!(table, "xref\n0 {size}\n0000000000 65535 f \n");
        for (_, offset) in &self.offsets {
            let _ = writeln!(table, "{offset:010} 00000 n ");
        }
        let _ = write!(
            table,
            "trailer\n<< /Size {size} /Root {CATALOG_ID} 0 R /Info {info_id} 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n"
        );
        self.raw(table.as_bytes());
        self.bytes
    }
}
