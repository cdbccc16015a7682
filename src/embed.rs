use std::io::Write;

use image::{ColorType, GenericImageView, ImageFormat};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::error::ConvertError;
use crate::source::{ImageKind, ImageSource};

/// An image encoded as PDF streams, ready to be added to a document.
#[derive(Debug)]
pub struct PreparedImage {
    pub width: u32,
    pub height: u32,
    image: Stream,
    smask: Option<Stream>,
}

impl PreparedImage {
    pub fn has_smask(&self) -> bool {
        self.smask.is_some()
    }

    /// Adds the image (and its soft mask, if any) to `doc` and returns the
    /// id of the image XObject.
    pub fn insert_into(self, doc: &mut Document) -> ObjectId {
        let PreparedImage {
            mut image, smask, ..
        } = self;
        if let Some(mask) = smask {
            let mask_id = doc.add_object(mask);
            image.dict.set("SMask", Object::Reference(mask_id));
        }
        doc.add_object(image)
    }
}

/// Encodes `source` as an image XObject. Fails with `UnsupportedFormat` for
/// anything other than JPEG or PNG.
pub fn prepare_image(source: &ImageSource) -> Result<PreparedImage, ConvertError> {
    match source.kind() {
        Some(ImageKind::Jpeg) => prepare_jpeg(source),
        Some(ImageKind::Png) => prepare_png(source),
        None => Err(ConvertError::UnsupportedFormat {
            name: source.name.clone(),
            mime: source.mime.clone(),
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct JpegHeader {
    width: u32,
    height: u32,
    bits: u8,
    components: u8,
}

fn is_start_of_frame(marker: u8) -> bool {
    matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
}

fn read_jpeg_header(data: &[u8]) -> Result<JpegHeader, &'static str> {
    if data.len() < 4 || data[0] != 0xFF || data[1] != 0xD8 {
        return Err("missing start-of-image marker");
    }

    let mut pos = 2;
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            return Err("expected segment marker");
        }
        let marker = data[pos + 1];
        pos += 2;

        match marker {
            // Fill byte: the next 0xFF starts the real marker.
            0xFF => {
                pos -= 1;
                continue;
            }
            0x01 | 0xD0..=0xD7 => continue,
            0xD9 | 0xDA => break,
            _ => {}
        }

        if pos + 2 > data.len() {
            break;
        }
        let len = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
        if len < 2 || pos + len > data.len() {
            return Err("truncated segment");
        }

        if is_start_of_frame(marker) {
            if len < 8 {
                return Err("short frame header");
            }
            let frame = &data[pos + 2..pos + len];
            let header = JpegHeader {
                bits: frame[0],
                height: u32::from(u16::from_be_bytes([frame[1], frame[2]])),
                width: u32::from(u16::from_be_bytes([frame[3], frame[4]])),
                components: frame[5],
            };
            if header.width == 0 || header.height == 0 {
                return Err("zero image dimensions");
            }
            return Ok(header);
        }

        pos += len;
    }

    Err("no frame header found")
}

fn image_dict(width: u32, height: u32, color_space: &str, bits: u8, filter: &str) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(i64::from(width)));
    dict.set("Height", Object::Integer(i64::from(height)));
    dict.set("ColorSpace", Object::Name(color_space.as_bytes().to_vec()));
    dict.set("BitsPerComponent", Object::Integer(i64::from(bits)));
    dict.set("Filter", Object::Name(filter.as_bytes().to_vec()));
    dict
}

fn prepare_jpeg(source: &ImageSource) -> Result<PreparedImage, ConvertError> {
    let invalid = |reason| ConvertError::InvalidJpeg {
        name: source.name.clone(),
        reason,
    };
    let header = read_jpeg_header(&source.bytes).map_err(invalid)?;

    let color_space = match header.components {
        1 => "DeviceGray",
        3 => "DeviceRGB",
        4 => "DeviceCMYK",
        _ => return Err(invalid("unsupported component count")),
    };

    let mut dict = image_dict(
        header.width,
        header.height,
        color_space,
        header.bits,
        "DCTDecode",
    );
    if header.components == 4 {
        // Adobe writes CMYK JPEGs inverted.
        let decode = (0..4)
            .flat_map(|_| [Object::Integer(1), Object::Integer(0)])
            .collect();
        dict.set("Decode", Object::Array(decode));
    }

    log::debug!(
        "{}: JPEG {}x{}, {} components",
        source.name,
        header.width,
        header.height,
        header.components
    );

    Ok(PreparedImage {
        width: header.width,
        height: header.height,
        image: Stream::new(dict, source.bytes.clone()).with_compression(false),
        smask: None,
    })
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, ConvertError> {
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn prepare_png(source: &ImageSource) -> Result<PreparedImage, ConvertError> {
    let img = image::load_from_memory_with_format(&source.bytes, ImageFormat::Png).map_err(|e| {
        ConvertError::Decode {
            name: source.name.clone(),
            source: e,
        }
    })?;
    let (width, height) = img.dimensions();
    let color = img.color();

    let grey = matches!(
        color,
        ColorType::L8 | ColorType::L16 | ColorType::La8 | ColorType::La16
    );
    let (samples, color_space) = if grey {
        (img.to_luma8().into_raw(), "DeviceGray")
    } else {
        (img.to_rgb8().into_raw(), "DeviceRGB")
    };

    let smask = if color.has_alpha() {
        let alpha: Vec<u8> = img.to_rgba8().pixels().map(|p| p[3]).collect();
        if alpha.iter().all(|&a| a == u8::MAX) {
            None
        } else {
            let dict = image_dict(width, height, "DeviceGray", 8, "FlateDecode");
            Some(Stream::new(dict, deflate(&alpha)?).with_compression(false))
        }
    } else {
        None
    };

    log::debug!(
        "{}: PNG {}x{} {:?}{}",
        source.name,
        width,
        height,
        color,
        if smask.is_some() { " with soft mask" } else { "" }
    );

    let dict = image_dict(width, height, color_space, 8, "FlateDecode");
    Ok(PreparedImage {
        width,
        height,
        image: Stream::new(dict, deflate(&samples)?).with_compression(false),
        smask,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::jpeg::JpegEncoder;
    use image::{DynamicImage, GrayImage, ImageBuffer, LumaA, Rgba, RgbaImage};
    use std::io::{Cursor, Read};

    /// lopdf refuses to decode image XObjects, so inflate the raw content.
    fn inflate(stream: &Stream) -> Vec<u8> {
        let mut out = Vec::new();
        flate2::read::ZlibDecoder::new(&stream.content[..])
            .read_to_end(&mut out)
            .unwrap();
        out
    }

    fn png_bytes(img: DynamicImage) -> Vec<u8> {
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    fn jpeg_bytes<I>(img: &I) -> Vec<u8>
    where
        I: image::GenericImageView,
        I::Pixel: image::PixelWithColorType,
    {
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, 80)
            .encode_image(img)
            .unwrap();
        out
    }

    fn name_of(dict: &Dictionary, key: &[u8]) -> Vec<u8> {
        dict.get(key).unwrap().as_name().unwrap().to_vec()
    }

    #[test]
    fn jpeg_header_from_encoder() {
        let header = read_jpeg_header(&jpeg_bytes(&image::RgbImage::new(37, 21))).unwrap();
        assert_eq!(
            header,
            JpegHeader {
                width: 37,
                height: 21,
                bits: 8,
                components: 3
            }
        );
    }

    #[test]
    fn jpeg_header_rejects_garbage() {
        assert!(read_jpeg_header(b"not a jpeg").is_err());
        assert!(read_jpeg_header(&[0xFF, 0xD8, 0xFF, 0xD9]).is_err());
        // SOF0 segment claims more bytes than are present.
        assert_eq!(
            read_jpeg_header(&[0xFF, 0xD8, 0xFF, 0xC0, 0x00, 0x40, 0x08]),
            Err("truncated segment")
        );
    }

    #[test]
    fn jpeg_is_embedded_unchanged() {
        let bytes = jpeg_bytes(&GrayImage::new(8, 4));
        let source = ImageSource::new("gray.jpg", "image/jpeg", bytes.clone());

        let prepared = prepare_image(&source).unwrap();
        assert_eq!((prepared.width, prepared.height), (8, 4));
        assert_eq!(prepared.image.content, bytes);
        assert_eq!(name_of(&prepared.image.dict, b"Filter"), b"DCTDecode");
        assert_eq!(name_of(&prepared.image.dict, b"ColorSpace"), b"DeviceGray");
        assert!(!prepared.has_smask());
    }

    #[test]
    fn cmyk_jpeg_gets_inverted_decode() {
        // Minimal SOI + SOF0 with four components.
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xC0, 0x00, 0x14, 0x08, 0x00, 0x02, 0x00, 0x03, 0x04];
        bytes.extend_from_slice(&[0u8; 12]);
        let source = ImageSource::new("cmyk.jpg", "image/jpeg", bytes);

        let prepared = prepare_image(&source).unwrap();
        assert_eq!((prepared.width, prepared.height), (3, 2));
        assert_eq!(name_of(&prepared.image.dict, b"ColorSpace"), b"DeviceCMYK");
        let decode = prepared.image.dict.get(b"Decode").unwrap().as_array().unwrap();
        assert_eq!(decode.len(), 8);
    }

    #[test]
    fn png_with_alpha_gets_smask() {
        let mut img = RgbaImage::from_pixel(4, 3, Rgba([200, 10, 10, 255]));
        img.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        let source = ImageSource::new("a.png", "image/png", png_bytes(DynamicImage::ImageRgba8(img)));

        let prepared = prepare_image(&source).unwrap();
        assert!(prepared.has_smask());
        assert_eq!(name_of(&prepared.image.dict, b"ColorSpace"), b"DeviceRGB");

        let mut doc = Document::with_version("1.7");
        let id = prepared.insert_into(&mut doc);
        let stream = doc.get_object(id).unwrap().as_stream().unwrap();
        let mask_id = stream.dict.get(b"SMask").unwrap().as_reference().unwrap();
        let mask = doc.get_object(mask_id).unwrap().as_stream().unwrap();
        assert_eq!(inflate(mask).len(), 12);
        assert_eq!(inflate(mask)[..2], [0, 255]);
    }

    #[test]
    fn opaque_png_has_no_smask() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255]));
        let source = ImageSource::new("o.png", "image/png", png_bytes(DynamicImage::ImageRgba8(img)));
        assert!(!prepare_image(&source).unwrap().has_smask());
    }

    #[test]
    fn grey_png_stays_grey() {
        let img = GrayImage::from_pixel(5, 5, image::Luma([128]));
        let source = ImageSource::new("g.png", "image/png", png_bytes(DynamicImage::ImageLuma8(img)));

        let prepared = prepare_image(&source).unwrap();
        assert_eq!(name_of(&prepared.image.dict, b"ColorSpace"), b"DeviceGray");
        assert_eq!(inflate(&prepared.image), vec![128u8; 25]);
    }

    #[test]
    fn sixteen_bit_png_is_reduced_to_eight_bits() {
        let img: ImageBuffer<Rgba<u16>, Vec<u16>> =
            ImageBuffer::from_pixel(2, 1, Rgba([65535, 0, 0, 32768]));
        let source = ImageSource::new("deep.png", "image/png", png_bytes(DynamicImage::ImageRgba16(img)));

        let prepared = prepare_image(&source).unwrap();
        assert_eq!(
            prepared.image.dict.get(b"BitsPerComponent").unwrap().as_i64().unwrap(),
            8
        );
        assert_eq!(inflate(&prepared.image), vec![255, 0, 0, 255, 0, 0]);
        assert_eq!(inflate(prepared.smask.as_ref().unwrap()), vec![128, 128]);
    }

    #[test]
    fn grey_png_with_alpha() {
        let img: ImageBuffer<LumaA<u8>, Vec<u8>> = ImageBuffer::from_pixel(2, 1, LumaA([100, 7]));
        let source = ImageSource::new("ga.png", "image/png", png_bytes(DynamicImage::ImageLumaA8(img)));

        let prepared = prepare_image(&source).unwrap();
        assert_eq!(name_of(&prepared.image.dict, b"ColorSpace"), b"DeviceGray");
        assert_eq!(inflate(&prepared.image), vec![100, 100]);
        assert_eq!(inflate(prepared.smask.as_ref().unwrap()), vec![7, 7]);
    }

    #[test]
    fn unsupported_and_corrupt_inputs() {
        let gif = ImageSource::new("a.gif", "image/gif", vec![1, 2, 3]);
        assert!(matches!(
            prepare_image(&gif),
            Err(ConvertError::UnsupportedFormat { .. })
        ));

        let broken = ImageSource::new("b.png", "image/png", vec![1, 2, 3]);
        assert!(matches!(prepare_image(&broken), Err(ConvertError::Decode { .. })));
    }
}
