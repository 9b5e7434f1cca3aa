//! Read back page geometry and embedded images from a produced PDF
//!
//! Preview endpoints and tests use this to check page count, order, size
//! and that each page carries exactly the pixels that were put in.

use crate::constants::POINTS_PER_INCH;
use crate::types::*;
use lopdf::{Dictionary, Document, Object, ObjectId};
use sha2::{Digest, Sha256};

/// The image XObject drawn on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedImage {
    pub width: u32,
    pub height: u32,
    pub color_space: String,
    /// SHA-256 of the decoded samples
    pub digest: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageInfo {
    /// 1-based page number
    pub number: usize,
    pub width_pt: f32,
    pub height_pt: f32,
    pub trim_box: Option<[f32; 4]>,
    pub image: Option<EmbeddedImage>,
}

impl PageInfo {
    pub fn width_in(&self) -> f64 {
        self.width_pt as f64 / POINTS_PER_INCH
    }

    pub fn height_in(&self) -> f64 {
        self.height_pt as f64 / POINTS_PER_INCH
    }
}

/// Describe every page of a PDF in order
pub fn inspect_pdf(bytes: &[u8]) -> Result<Vec<PageInfo>> {
    let doc = Document::load_mem(bytes)?;
    doc.get_pages()
        .into_iter()
        .map(|(number, page_id)| inspect_page(&doc, number as usize, page_id))
        .collect()
}

fn inspect_page(doc: &Document, number: usize, page_id: ObjectId) -> Result<PageInfo> {
    let page = doc.get_dictionary(page_id)?;

    let media_box = read_box(doc, page, b"MediaBox").ok_or_else(|| {
        AssemblyError::Assembly(format!("page {} has no MediaBox", number))
    })?;

    Ok(PageInfo {
        number,
        width_pt: media_box[2] - media_box[0],
        height_pt: media_box[3] - media_box[1],
        trim_box: read_box(doc, page, b"TrimBox"),
        image: first_image(doc, page)?,
    })
}

fn read_box(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<[f32; 4]> {
    let array = match page.get(key).ok()? {
        Object::Reference(id) => doc.get_object(*id).ok()?.as_array().ok()?,
        obj => obj.as_array().ok()?,
    };
    if array.len() != 4 {
        return None;
    }
    let mut values = [0.0f32; 4];
    for (slot, obj) in values.iter_mut().zip(array) {
        *slot = extract_number(obj)?;
    }
    Some(values)
}

fn first_image(doc: &Document, page: &Dictionary) -> Result<Option<EmbeddedImage>> {
    let resources = match page.get(b"Resources") {
        Ok(Object::Reference(id)) => doc.get_dictionary(*id)?,
        Ok(Object::Dictionary(dict)) => dict,
        _ => return Ok(None),
    };
    let xobjects = match resources.get(b"XObject") {
        Ok(Object::Reference(id)) => doc.get_dictionary(*id)?,
        Ok(Object::Dictionary(dict)) => dict,
        _ => return Ok(None),
    };

    for (_, value) in xobjects.iter() {
        let Object::Reference(id) = value else {
            continue;
        };
        let stream = doc.get_object(*id)?.as_stream()?;
        let is_image = matches!(
            stream.dict.get(b"Subtype"),
            Ok(Object::Name(name)) if name.as_slice() == b"Image"
        );
        if !is_image {
            continue;
        }

        let width = stream.dict.get(b"Width").ok().and_then(extract_number);
        let height = stream.dict.get(b"Height").ok().and_then(extract_number);
        let color_space = match stream.dict.get(b"ColorSpace") {
            Ok(Object::Name(name)) => String::from_utf8_lossy(name).into_owned(),
            _ => String::new(),
        };
        let samples = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());

        return Ok(Some(EmbeddedImage {
            width: width.unwrap_or(0.0) as u32,
            height: height.unwrap_or(0.0) as u32,
            color_space,
            digest: hex_digest(Sha256::digest(&samples).as_slice()),
        }));
    }

    Ok(None)
}

/// Extract numeric value from a PDF object
fn extract_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}
