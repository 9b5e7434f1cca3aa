//! Minimal lopdf document builder for image-per-page output
//!
//! Every page is one full-bleed image XObject plus an optional overlay
//! content stream (text and guides).

use crate::color::PrintImage;
use crate::constants::in_to_pt;
use crate::geometry::Rect;
use crate::types::*;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Resource name of the page image
const IMAGE_NAME: &str = "Im0";

/// Resource name of the overlay font
pub(crate) const FONT_NAME: &str = "F1";

/// One output page
pub(crate) struct PageSpec<'a> {
    pub width_in: f64,
    pub height_in: f64,
    /// Trim area in page coordinates; the whole page when `None`
    pub trim: Option<Rect>,
    pub image: ObjectId,
    /// Extra content drawn over the image
    pub overlay: &'a str,
}

pub(crate) struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    page_refs: Vec<Object>,
    font_id: Option<ObjectId>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            page_refs: Vec::new(),
            font_id: None,
        }
    }

    /// Embed converted samples as an image XObject. The returned id may be
    /// drawn on any number of pages.
    pub fn add_image(&mut self, image: &PrintImage) -> ObjectId {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Width", Object::Integer(image.width as i64));
        dict.set("Height", Object::Integer(image.height as i64));
        dict.set(
            "ColorSpace",
            Object::Name(image.space.pdf_name().as_bytes().to_vec()),
        );
        dict.set("BitsPerComponent", Object::Integer(8));
        self.doc
            .add_object(Stream::new(dict, image.samples.clone()))
    }

    /// Standard Helvetica, created on first use
    fn helvetica(&mut self) -> ObjectId {
        if let Some(id) = self.font_id {
            return id;
        }
        let mut font_dict = Dictionary::new();
        font_dict.set("Type", Object::Name(b"Font".to_vec()));
        font_dict.set("Subtype", Object::Name(b"Type1".to_vec()));
        font_dict.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
        font_dict.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
        let id = self.doc.add_object(font_dict);
        self.font_id = Some(id);
        id
    }

    pub fn add_page(&mut self, spec: &PageSpec<'_>) -> ObjectId {
        let width_pt = in_to_pt(spec.width_in);
        let height_pt = in_to_pt(spec.height_in);

        let media_box = pdf_box(0.0, 0.0, width_pt, height_pt);
        let trim_box = match spec.trim {
            Some(trim) => {
                let [x, y, w, h] = trim.to_pdf(spec.height_in);
                pdf_box(x, y, x + w, y + h)
            }
            None => media_box.clone(),
        };

        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(self.pages_id));
        page_dict.set("MediaBox", media_box.clone());
        page_dict.set("BleedBox", media_box);
        page_dict.set("TrimBox", trim_box);

        let mut content = format!(
            "q {} 0 0 {} 0 0 cm /{} Do Q\n",
            width_pt, height_pt, IMAGE_NAME
        );
        content.push_str(spec.overlay);

        let mut xobjects = Dictionary::new();
        xobjects.set(IMAGE_NAME, Object::Reference(spec.image));
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));
        if spec.overlay.contains(" Tf") {
            let font_id = self.helvetica();
            let mut fonts = Dictionary::new();
            fonts.set(FONT_NAME, Object::Reference(font_id));
            resources.set("Font", Object::Dictionary(fonts));
        }

        let content_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), content.into_bytes()));
        page_dict.set("Contents", Object::Reference(content_id));
        page_dict.set("Resources", Object::Dictionary(resources));

        let page_id = self.doc.add_object(page_dict);
        self.page_refs.push(Object::Reference(page_id));
        page_id
    }

    pub fn page_count(&self) -> usize {
        self.page_refs.len()
    }

    /// Close the page tree and serialize
    pub fn finish(mut self) -> Result<Vec<u8>> {
        if self.page_refs.is_empty() {
            return Err(AssemblyError::Assembly(
                "document has no pages".to_string(),
            ));
        }

        let count = self.page_refs.len() as i64;
        let pages_dict = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(self.page_refs)),
            ("Count", Object::Integer(count)),
        ]);
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages_dict));

        let catalog_id = self.doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(self.pages_id)),
        ]));
        self.doc.trailer.set("Root", catalog_id);

        self.doc.compress();
        let mut writer = Vec::new();
        self.doc.save_to(&mut writer)?;
        Ok(writer)
    }
}

fn pdf_box(x0: f64, y0: f64, x1: f64, y1: f64) -> Object {
    Object::Array(
        [x0, y0, x1, y1]
            .into_iter()
            .map(|v| Object::Real(v as f32))
            .collect(),
    )
}

/// Escape text for a PDF literal string. Characters outside Latin-1 become `?`.
pub(crate) fn pdf_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('(');
    for ch in text.chars() {
        match ch {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            ' '..='~' => out.push(ch),
            c if (c as u32) >= 0xA0 && (c as u32) <= 0xFF => {
                out.push_str(&format!("\\{:03o}", c as u32));
            }
            _ => out.push('?'),
        }
    }
    out.push(')');
    out
}
