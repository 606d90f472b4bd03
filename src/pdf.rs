/// Single page PDF export.
///
/// The rendered symbol is flattened onto white and placed on an A4 page, centered,
/// at most 150 mm wide and with at least 20 mm of clear space on every side.
use image::RgbaImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::error::ExportError;
use crate::export::flatten_on_white;

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
/// Total margin budget along each page axis.
pub const PAGE_MARGIN_MM: f32 = 40.0;
pub const MAX_SYMBOL_MM: f32 = 150.0;

fn mm_to_pt(mm: f32) -> f32 {
    mm * 72.0 / 25.4
}

/// Returns `(x, y, side)` of the symbol on a `page_width` x `page_height` page, in mm.
pub fn placement(page_width: f32, page_height: f32) -> (f32, f32, f32) {
    let side = (page_width - PAGE_MARGIN_MM)
        .min(page_height - PAGE_MARGIN_MM)
        .min(MAX_SYMBOL_MM);
    ((page_width - side) / 2.0, (page_height - side) / 2.0, side)
}

/// Builds an A4 document containing `image`.
pub fn single_page(image: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    let rgb = flatten_on_white(image);
    let (width, height) = rgb.dimensions();
    let (x, y, side) = placement(PAGE_WIDTH_MM, PAGE_HEIGHT_MM);
    let (x, y, side) = (mm_to_pt(x), mm_to_pt(y), mm_to_pt(side));

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        rgb.into_raw(),
    ));

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    side.into(),
                    0.into(),
                    0.into(),
                    side.into(),
                    x.into(),
                    y.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        },
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                mm_to_pt(PAGE_WIDTH_MM).into(),
                mm_to_pt(PAGE_HEIGHT_MM).into(),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_a4_placement() {
        let (x, y, side) = placement(PAGE_WIDTH_MM, PAGE_HEIGHT_MM);
        assert_eq!(side, 150.0);
        assert_eq!(x, 30.0);
        assert_eq!(y, 73.5);
    }

    #[test]
    fn test_small_page_respects_margin() {
        let (x, y, side) = placement(100.0, 120.0);
        assert_eq!(side, 60.0);
        assert_eq!((x, y), (20.0, 30.0));
    }

    #[test]
    fn test_single_page_document() {
        let image = RgbaImage::from_pixel(16, 16, Rgba([0, 0, 0, 255]));
        let bytes = single_page(&image).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }
}
