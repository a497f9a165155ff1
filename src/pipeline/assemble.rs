//! Document Assembler: one PDF page per image, scaled to fit, anchored top-left.
//!
//! ## Embedding
//!
//! JPEG files are copied into the PDF untouched behind a `DCTDecode` filter;
//! only their header is inspected. PNG files have no PDF-native container, so
//! their pixels are decoded to 8-bit samples and stored Flate-compressed, with
//! any alpha channel split out as a soft mask.
//!
//! ## Failure policy
//!
//! The first unreadable image aborts the whole document. Nothing is written
//! to `output` unless every page was built; the file is produced by a single
//! write at the end.

use crate::error::MangaPdfError;
use crate::pipeline::format::ImageFormat;
use crate::pipeline::geometry::{fit, DrawPlan, ImageDimensions, PageSpec, POINTS_PER_MM};
use image::{DynamicImage, ImageReader};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the image XObject in each page's resource dictionary.
const IMAGE_NAME: &str = "Im0";

/// Summary of a finished assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyReport {
    pub output: PathBuf,
    pub page_count: usize,
    /// Draw plan of each page, in page order.
    pub plans: Vec<DrawPlan>,
    pub bytes_written: u64,
}

/// Build a PDF from `image_paths` (one page each, in the given order) and
/// write it to `output`.
///
/// An empty list produces a valid zero-page document.
///
/// # Errors
/// * [`MangaPdfError::UnreadableImage`] — an image cannot be opened or identified
/// * [`MangaPdfError::InvalidImageDimensions`] — an image reports a zero edge
/// * [`MangaPdfError::DocumentWriteFailed`] — `output` cannot be written
pub fn assemble(
    image_paths: &[PathBuf],
    page: PageSpec,
    output: &Path,
) -> Result<AssemblyReport, MangaPdfError> {
    info!(
        "Assembling {} pages ({}x{} mm) → {}",
        image_paths.len(),
        page.width,
        page.height,
        output.display()
    );

    let mut builder = DocumentBuilder::new(page);
    let mut plans = Vec::with_capacity(image_paths.len());
    for path in image_paths {
        plans.push(builder.add_image_page(path)?);
    }

    let page_count = builder.page_count();
    let bytes = builder.finish()?;
    std::fs::write(output, &bytes).map_err(|e| MangaPdfError::DocumentWriteFailed {
        path: output.to_path_buf(),
        source: e,
    })?;

    info!("Wrote {} pages, {} bytes", page_count, bytes.len());
    Ok(AssemblyReport {
        output: output.to_path_buf(),
        page_count,
        plans,
        bytes_written: bytes.len() as u64,
    })
}

/// Read an image's pixel dimensions from its header, sniffing the format
/// from the content rather than trusting the extension.
pub fn read_dimensions(path: &Path) -> Result<ImageDimensions, MangaPdfError> {
    let reader = open_reader(path)?;
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| unreadable(path, e.to_string()))?;
    Ok(ImageDimensions::new(width, height))
}

/// In-memory PDF under construction.
pub struct DocumentBuilder {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
    page: PageSpec,
}

impl DocumentBuilder {
    pub fn new(page: PageSpec) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
            page,
        }
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Append one page holding the image at `path`.
    pub fn add_image_page(&mut self, path: &Path) -> Result<DrawPlan, MangaPdfError> {
        let dims = read_dimensions(path)?;
        let plan = fit(dims, self.page)?;
        let image_id = self.embed_image(path, dims)?;

        let page_w = self.page.width_pt() as f32;
        let page_h = self.page.height_pt() as f32;
        let draw_w = (plan.draw_width * POINTS_PER_MM) as f32;
        let draw_h = (plan.draw_height * POINTS_PER_MM) as f32;

        // PDF space grows upwards from the bottom-left corner.
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        draw_w.into(),
                        0.into(),
                        0.into(),
                        draw_h.into(),
                        0.into(),
                        (page_h - draw_h).into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(IMAGE_NAME.as_bytes().to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_bytes = content
            .encode()
            .map_err(|e| MangaPdfError::Internal(format!("content stream: {e}")))?;
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, content_bytes));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    IMAGE_NAME => image_id,
                },
            },
            "MediaBox" => vec![0.into(), 0.into(), page_w.into(), page_h.into()],
        });
        self.kids.push(page_id.into());

        debug!(
            "Page {}: {} ({}x{} px, scale {:.4})",
            self.kids.len(),
            path.display(),
            dims.width,
            dims.height,
            plan.scale
        );
        Ok(plan)
    }

    /// Close the page tree and serialise the document.
    pub fn finish(mut self) -> Result<Vec<u8>, MangaPdfError> {
        let count = self.kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.compress();

        let mut out = Vec::new();
        self.doc
            .save_to(&mut out)
            .map_err(|e| MangaPdfError::Internal(format!("Failed to serialise PDF: {e}")))?;
        Ok(out)
    }

    fn embed_image(&mut self, path: &Path, dims: ImageDimensions) -> Result<ObjectId, MangaPdfError> {
        let declared = ImageFormat::from_path(path);
        let sniffed = open_reader(path)?.format();
        let format = match sniffed {
            Some(image::ImageFormat::Jpeg) => ImageFormat::Jpeg,
            Some(image::ImageFormat::Png) => ImageFormat::Png,
            Some(other) => {
                return Err(unreadable(path, format!("{other:?} images cannot be embedded")));
            }
            None => declared,
        };
        if format != declared {
            debug!(
                "{}: content is {} despite extension",
                path.display(),
                format.mime_type()
            );
        }

        match format {
            ImageFormat::Jpeg => self.embed_jpeg(path, dims),
            ImageFormat::Png => self.embed_decoded(path),
        }
    }

    fn embed_jpeg(&mut self, path: &Path, dims: ImageDimensions) -> Result<ObjectId, MangaPdfError> {
        let data = std::fs::read(path).map_err(|e| unreadable(path, e.to_string()))?;
        let info = scan_jpeg(&data)
            .ok_or_else(|| unreadable(path, "no JPEG frame header found".to_string()))?;

        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(dims.width),
            "Height" => i64::from(dims.height),
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        };
        match info.components {
            1 => dict.set("ColorSpace", "DeviceGray"),
            3 => dict.set("ColorSpace", "DeviceRGB"),
            4 => {
                dict.set("ColorSpace", "DeviceCMYK");
                if info.adobe {
                    // Adobe-written CMYK JPEGs store inverted samples.
                    dict.set(
                        "Decode",
                        vec![1.into(), 0.into(), 1.into(), 0.into(), 1.into(), 0.into(), 1.into(), 0.into()],
                    );
                }
            }
            n => return Err(unreadable(path, format!("unsupported JPEG component count {n}"))),
        }

        Ok(self
            .doc
            .add_object(Stream::new(dict, data).with_compression(false)))
    }

    fn embed_decoded(&mut self, path: &Path) -> Result<ObjectId, MangaPdfError> {
        let img = open_reader(path)?
            .decode()
            .map_err(|e| unreadable(path, e.to_string()))?;
        let (width, height) = (i64::from(img.width()), i64::from(img.height()));
        let color = img.color();

        let (color_space, samples, alpha) = split_samples(&img, color.has_color(), color.has_alpha());

        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => color_space,
            "BitsPerComponent" => 8,
        };
        if let Some(alpha) = alpha {
            let mask_id = self.doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => width,
                    "Height" => height,
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8,
                },
                alpha,
            ));
            dict.set("SMask", mask_id);
        }

        Ok(self.doc.add_object(Stream::new(dict, samples)))
    }
}

/// Split decoded pixels into colour samples and an optional alpha plane.
fn split_samples(
    img: &DynamicImage,
    has_color: bool,
    has_alpha: bool,
) -> (&'static str, Vec<u8>, Option<Vec<u8>>) {
    match (has_color, has_alpha) {
        (true, false) => ("DeviceRGB", img.to_rgb8().into_raw(), None),
        (false, false) => ("DeviceGray", img.to_luma8().into_raw(), None),
        (true, true) => {
            let rgba = img.to_rgba8();
            let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
            let mut alpha = Vec::with_capacity(rgba.len() / 4);
            for px in rgba.pixels() {
                rgb.extend_from_slice(&px.0[..3]);
                alpha.push(px.0[3]);
            }
            ("DeviceRGB", rgb, Some(alpha))
        }
        (false, true) => {
            let la = img.to_luma_alpha8();
            let mut gray = Vec::with_capacity(la.len() / 2);
            let mut alpha = Vec::with_capacity(la.len() / 2);
            for px in la.pixels() {
                gray.push(px.0[0]);
                alpha.push(px.0[1]);
            }
            ("DeviceGray", gray, Some(alpha))
        }
    }
}

/// Facts about a JPEG needed to embed it without decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct JpegInfo {
    components: u8,
    adobe: bool,
}

/// Walk the JPEG marker segments up to the first frame header.
fn scan_jpeg(data: &[u8]) -> Option<JpegInfo> {
    if data.get(..2)? != [0xFF, 0xD8] {
        return None;
    }
    let mut adobe = false;
    let mut i = 2;
    while i + 4 <= data.len() {
        if data[i] != 0xFF {
            i += 1;
            continue;
        }
        let marker = data[i + 1];
        match marker {
            0xFF => {
                i += 1;
                continue;
            }
            0x01 | 0xD0..=0xD8 => {
                i += 2;
                continue;
            }
            _ => {}
        }
        let len = usize::from(u16::from_be_bytes([data[i + 2], data[i + 3]]));
        match marker {
            // SOFn, excluding DHT (C4), JPG (C8) and DAC (CC).
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                let components = *data.get(i + 9)?;
                return Some(JpegInfo { components, adobe });
            }
            0xEE => adobe |= data.get(i + 4..i + 9) == Some(b"Adobe".as_slice()),
            0xDA | 0xD9 => return None,
            _ => {}
        }
        i += 2 + len;
    }
    None
}

fn open_reader(path: &Path) -> Result<ImageReader<std::io::BufReader<std::fs::File>>, MangaPdfError> {
    let reader = ImageReader::open(path)
        .map_err(|e| unreadable(path, e.to_string()))?
        .with_guessed_format()
        .map_err(|e| unreadable(path, e.to_string()))?;
    if reader.format().is_none() {
        return Err(unreadable(path, "unrecognised image format".to_string()));
    }
    Ok(reader)
}

fn unreadable(path: &Path, detail: String) -> MangaPdfError {
    MangaPdfError::UnreadableImage {
        path: path.to_path_buf(),
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};

    fn num(obj: &Object) -> f64 {
        obj.as_float()
            .map(f64::from)
            .or_else(|_| obj.as_i64().map(|v| v as f64))
            .expect("numeric PDF object")
    }

    fn write_jpeg(dir: &Path, name: &str, w: u32, h: u32) -> PathBuf {
        let path = dir.join(name);
        RgbImage::from_pixel(w, h, Rgb([200, 30, 30])).save(&path).unwrap();
        path
    }

    fn write_png_rgba(dir: &Path, name: &str, w: u32, h: u32) -> PathBuf {
        let path = dir.join(name);
        RgbaImage::from_pixel(w, h, Rgba([0, 0, 255, 128]))
            .save(&path)
            .unwrap();
        path
    }

    /// `(MediaBox, cm operands)` of every page, in order.
    fn page_geometry(pdf: &Path) -> Vec<(Vec<f64>, Vec<f64>)> {
        let doc = Document::load(pdf).expect("output must parse");
        doc.get_pages()
            .values()
            .map(|&page_id| {
                let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
                let media: Vec<f64> = page
                    .get(b"MediaBox")
                    .unwrap()
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(num)
                    .collect();
                let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
                let cm = content
                    .operations
                    .iter()
                    .find(|op| op.operator == "cm")
                    .expect("placement matrix")
                    .operands
                    .iter()
                    .map(num)
                    .collect();
                (media, cm)
            })
            .collect()
    }

    fn image_streams(pdf: &Path) -> Vec<lopdf::Dictionary> {
        let doc = Document::load(pdf).unwrap();
        doc.objects
            .values()
            .filter_map(|o| o.as_stream().ok())
            .filter(|s| {
                s.dict.get(b"Subtype").and_then(Object::as_name).ok() == Some(b"Image".as_slice())
            })
            .map(|s| s.dict.clone())
            .collect()
    }

    #[test]
    fn one_page_per_image_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let paths = vec![
            write_jpeg(dir.path(), "001.jpg", 840, 630),
            write_png_rgba(dir.path(), "002.png", 100, 150),
            write_jpeg(dir.path(), "003.jpg", 100, 1188),
        ];
        let out = dir.path().join("chapter.pdf");

        let report = assemble(&paths, PageSpec::A4, &out).unwrap();
        assert_eq!(report.page_count, 3);
        assert!((report.plans[0].scale - 0.25).abs() < 1e-9);
        assert!((report.plans[2].scale - 0.25).abs() < 1e-9);
        assert_eq!(report.plans[1].scale, 1.0);
        assert_eq!(report.bytes_written, std::fs::metadata(&out).unwrap().len());

        let pages = page_geometry(&out);
        assert_eq!(pages.len(), 3);
        let (pw, ph) = (PageSpec::A4.width_pt(), PageSpec::A4.height_pt());
        for (i, (media, cm)) in pages.iter().enumerate() {
            assert!((media[2] - pw).abs() < 0.01 && (media[3] - ph).abs() < 0.01);
            let plan = report.plans[i];
            let (w, h) = (plan.draw_width * POINTS_PER_MM, plan.draw_height * POINTS_PER_MM);
            assert!((cm[0] - w).abs() < 0.01, "page {i} width {} vs {w}", cm[0]);
            assert!((cm[3] - h).abs() < 0.01, "page {i} height {} vs {h}", cm[3]);
            // top-left anchor: x = 0, top edge touches the page top
            assert_eq!(cm[4], 0.0);
            assert!((cm[5] + cm[3] - ph).abs() < 0.01);
        }
    }

    #[test]
    fn jpeg_is_passed_through_and_png_gets_soft_mask() {
        let dir = tempfile::tempdir().unwrap();
        let jpg = write_jpeg(dir.path(), "001.jpg", 40, 30);
        let png = write_png_rgba(dir.path(), "002.png", 20, 10);
        let out = dir.path().join("out.pdf");
        assemble(&[jpg.clone(), png], PageSpec::A4, &out).unwrap();

        let images = image_streams(&out);
        // colour image for the JPEG, colour image + mask for the PNG
        assert_eq!(images.len(), 3);
        let dct = images
            .iter()
            .find(|d| d.get(b"Filter").and_then(Object::as_name).ok() == Some(b"DCTDecode".as_slice()))
            .expect("JPEG stored with DCTDecode");
        assert_eq!(dct.get(b"Width").unwrap().as_i64().unwrap(), 40);
        assert_eq!(
            dct.get(b"ColorSpace").and_then(Object::as_name).unwrap(),
            b"DeviceRGB"
        );
        assert!(images.iter().any(|d| d.has(b"SMask")));
    }

    #[test]
    fn grayscale_png_uses_device_gray() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("001.png");
        GrayImage::from_pixel(30, 30, Luma([90])).save(&path).unwrap();
        let out = dir.path().join("out.pdf");
        assemble(&[path], PageSpec::A4, &out).unwrap();

        let images = image_streams(&out);
        assert_eq!(images.len(), 1);
        assert_eq!(
            images[0].get(b"ColorSpace").and_then(Object::as_name).unwrap(),
            b"DeviceGray"
        );
    }

    #[test]
    fn empty_input_gives_zero_page_document() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("empty.pdf");
        let report = assemble(&[], PageSpec::A4, &out).unwrap();
        assert_eq!(report.page_count, 0);
        let doc = Document::load(&out).unwrap();
        assert_eq!(doc.get_pages().len(), 0);
    }

    #[test]
    fn first_unreadable_image_aborts_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_jpeg(dir.path(), "001.jpg", 50, 50);
        let bad = dir.path().join("002.jpg");
        std::fs::write(&bad, b"<html>403 Forbidden</html>").unwrap();
        let out = dir.path().join("out.pdf");

        let err = assemble(&[good, bad.clone()], PageSpec::A4, &out).unwrap_err();
        match err {
            MangaPdfError::UnreadableImage { path, .. } => assert_eq!(path, bad),
            other => panic!("expected UnreadableImage, got {other:?}"),
        }
        assert!(!out.exists());
    }

    #[test]
    fn missing_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_dimensions(&dir.path().join("nope.png")).unwrap_err();
        assert!(matches!(err, MangaPdfError::UnreadableImage { .. }));
    }

    #[test]
    fn png_with_jpg_extension_is_still_embedded() {
        let dir = tempfile::tempdir().unwrap();
        let real_png = write_png_rgba(dir.path(), "tmp.png", 12, 12);
        let misnamed = dir.path().join("001.jpg");
        std::fs::rename(&real_png, &misnamed).unwrap();
        let out = dir.path().join("out.pdf");

        let report = assemble(&[misnamed], PageSpec::A4, &out).unwrap();
        assert_eq!(report.page_count, 1);
        assert!(image_streams(&out)
            .iter()
            .all(|d| d.get(b"Filter").and_then(Object::as_name).ok() != Some(b"DCTDecode".as_slice())));
    }

    #[test]
    fn unwritable_destination_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let img = write_jpeg(dir.path(), "001.jpg", 10, 10);
        let out = dir.path().join("missing-dir").join("out.pdf");
        let err = assemble(&[img], PageSpec::A4, &out).unwrap_err();
        assert!(matches!(err, MangaPdfError::DocumentWriteFailed { .. }));
    }

    #[test]
    fn reassembly_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let paths = vec![
            write_jpeg(dir.path(), "001.jpg", 1200, 1800),
            write_jpeg(dir.path(), "002.jpg", 90, 60),
        ];
        let a = assemble(&paths, PageSpec::A4, &dir.path().join("a.pdf")).unwrap();
        let b = assemble(&paths, PageSpec::A4, &dir.path().join("b.pdf")).unwrap();
        assert_eq!(a.page_count, b.page_count);
        assert_eq!(a.plans, b.plans);
    }

    #[test]
    fn scan_jpeg_reads_component_count() {
        let dir = tempfile::tempdir().unwrap();
        let rgb = write_jpeg(dir.path(), "rgb.jpg", 8, 8);
        let info = scan_jpeg(&std::fs::read(rgb).unwrap()).unwrap();
        assert_eq!(info.components, 3);
        assert!(!info.adobe);

        let gray = dir.path().join("gray.jpg");
        GrayImage::from_pixel(8, 8, Luma([10])).save(&gray).unwrap();
        assert_eq!(scan_jpeg(&std::fs::read(gray).unwrap()).unwrap().components, 1);

        assert_eq!(scan_jpeg(b"\x89PNG\r\n\x1a\n"), None);
        assert_eq!(scan_jpeg(&[0xFF, 0xD8, 0xFF]), None);
    }
}
