//! Fixture builders shared by the unit tests.

use exif::{Field, In, Rational, Tag, Value};
use img_parts::Bytes;
use img_parts::jpeg::JpegSegment;
use std::path::Path;

use crate::{container, editor};

/// Decimal form of the GPS position in [`sample_exif_fields`].
pub(crate) const SAMPLE_DECIMAL: (f64, f64) = (35.68925, 139.6917);

pub(crate) const SAMPLE_MAKER_NOTE: &[u8] = b"CANON\0MAKERNOTE\x01\x02\x03\x04\x05\x06\x07\x08";

pub(crate) const SAMPLE_XMP: &str = r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<x:xmpmeta xmlns:x="adobe:ns:meta/" x:xmptk="XMP Core 6.0.0">
 <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <rdf:Description rdf:about=""
    xmlns:dc="http://purl.org/dc/elements/1.1/"
    xmlns:xmp="http://ns.adobe.com/xap/1.0/"
    xmlns:photoshop="http://ns.adobe.com/photoshop/1.0/"
    xmp:CreatorTool="Darktable 4.6"
    xmp:Rating="4">
   <dc:creator>
    <rdf:Seq>
     <rdf:li>Jane Doe</rdf:li>
    </rdf:Seq>
   </dc:creator>
   <dc:subject>
    <rdf:Bag>
     <rdf:li>harbour</rdf:li>
     <rdf:li>night &amp; fog</rdf:li>
    </rdf:Bag>
   </dc:subject>
   <photoshop:City>Yokohama</photoshop:City>
  </rdf:Description>
 </rdf:RDF>
</x:xmpmeta>
<?xpacket end="w"?>"#;

/// Write a small RGB gradient JPEG.
pub(crate) fn write_jpeg(path: &Path, width: u32, height: u32) {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 30) as u8, (y * 30) as u8, 128])
    });
    img.save(path).unwrap();
}

/// Write a semi-transparent RGBA PNG.
pub(crate) fn write_png_rgba(path: &Path, width: u32, height: u32) {
    let img = image::RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x * 30) as u8, (y * 30) as u8, 200, 100])
    });
    img.save(path).unwrap();
}

/// Write a small RGB lossless WebP.
pub(crate) fn write_webp(path: &Path, width: u32, height: u32) {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 30) as u8, 90, (y * 30) as u8])
    });
    img.save(path).unwrap();
}

fn ascii(tag: Tag, text: &str) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![text.as_bytes().to_vec()]),
    }
}

fn rationals(tag: Tag, parts: &[(u32, u32)]) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Rational(
            parts
                .iter()
                .map(|&(num, denom)| Rational { num, denom })
                .collect(),
        ),
    }
}

fn field(tag: Tag, value: Value) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value,
    }
}

/// A camera-like EXIF dictionary with GPS and a MakerNote.
pub(crate) fn sample_exif_fields() -> Vec<Field> {
    vec![
        ascii(Tag::Make, "Canon"),
        ascii(Tag::Model, "Canon EOS 5D"),
        field(Tag::Orientation, Value::Short(vec![1])),
        rationals(Tag::XResolution, &[(72, 1)]),
        ascii(Tag::DateTimeOriginal, "2023:04:01 18:30:00"),
        rationals(Tag::ExposureTime, &[(1, 125)]),
        rationals(Tag::FNumber, &[(28, 10)]),
        field(Tag::PhotographicSensitivity, Value::Short(vec![400])),
        field(Tag::MakerNote, Value::Undefined(SAMPLE_MAKER_NOTE.to_vec(), 0)),
        field(Tag::GPSVersionID, Value::Byte(vec![2, 3, 0, 0])),
        ascii(Tag::GPSLatitudeRef, "N"),
        rationals(Tag::GPSLatitude, &[(35, 1), (41, 1), (2130, 100)]),
        ascii(Tag::GPSLongitudeRef, "E"),
        rationals(Tag::GPSLongitude, &[(139, 1), (41, 1), (3012, 100)]),
        field(Tag::GPSAltitudeRef, Value::Byte(vec![0])),
        rationals(Tag::GPSAltitude, &[(40, 1)]),
    ]
}

/// Replace the EXIF block of a JPEG/PNG/WebP file with `fields`.
pub(crate) fn inject_exif(path: &Path, fields: &[Field]) {
    let block = editor::encode_exif_block(fields, false).unwrap();
    container::embed_exif(path, Some(block)).unwrap();
}

/// Insert an XMP APP1 segment right after APP0.
pub(crate) fn inject_xmp(path: &Path, xml: &str) {
    let mut jpeg = container::read_jpeg(path).unwrap();
    let mut contents = container::XMP_HEADER.to_vec();
    contents.extend_from_slice(xml.as_bytes());

    let segments = jpeg.segments_mut();
    let pos = usize::from(segments.first().is_some_and(|s| s.marker() == 0xE0));
    segments.insert(
        pos,
        JpegSegment::new_with_contents(container::MARKER_APP1, Bytes::from(contents)),
    );
    container::write_jpeg(path, jpeg).unwrap();
}
