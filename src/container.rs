//! Segment/chunk level access to image containers via `img-parts`.
//!
//! Nothing in here decodes pixels; it only moves metadata blocks in and out
//! of JPEG segments and PNG/WebP chunks.

use anyhow::{Context, Result};
use img_parts::jpeg::{Jpeg, JpegSegment};
use img_parts::riff::{RiffChunk, RiffContent};
use img_parts::webp::{CHUNK_EXIF, WebP};
use img_parts::{Bytes, DynImage, ImageEXIF};
use std::path::Path;

const MARKER_APP0: u8 = 0xE0;
pub(crate) const MARKER_APP1: u8 = 0xE1;
const MARKER_APP13: u8 = 0xED;

const EXIF_PREFIX: &[u8] = b"Exif\0\0";
pub(crate) const XMP_HEADER: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";
pub(crate) const IPTC_HEADER: &[u8] = b"Photoshop 3.0\0";

const XMP_OPEN: &[u8] = b"<x:xmpmeta";
const XMP_CLOSE: &[u8] = b"</x:xmpmeta>";

/// Parse a JPEG file into its segments.
pub(crate) fn read_jpeg(path: &Path) -> Result<Jpeg> {
    let file_bytes = std::fs::read(path).context("Failed to read image file")?;
    Jpeg::from_bytes(Bytes::from(file_bytes))
        .map_err(|e| anyhow::anyhow!("Failed to parse JPEG: {e}"))
}

/// Serialize a JPEG back to disk.
pub(crate) fn write_jpeg(path: &Path, jpeg: Jpeg) -> Result<()> {
    let output = jpeg.encoder().bytes();
    std::fs::write(path, &output).context("Failed to write JPEG file")
}

/// Find the position of the EXIF APP1 segment in a JPEG.
fn find_exif_segment_pos(jpeg: &Jpeg) -> Option<usize> {
    jpeg.segments()
        .iter()
        .position(|s| s.marker() == MARKER_APP1 && s.contents().starts_with(EXIF_PREFIX))
}

/// Find the XMP APP1 segment position in a JPEG.
fn find_xmp_segment_pos(jpeg: &Jpeg) -> Option<usize> {
    jpeg.segments()
        .iter()
        .position(|s| s.marker() == MARKER_APP1 && s.contents().starts_with(XMP_HEADER))
}

/// Find the Photoshop APP13 segment position in a JPEG.
fn find_app13_segment_pos(jpeg: &Jpeg) -> Option<usize> {
    jpeg.segments()
        .iter()
        .position(|s| s.marker() == MARKER_APP13 && s.contents().starts_with(IPTC_HEADER))
}

/// Contents of the Photoshop APP13 segment, header included.
pub(crate) fn app13_contents(jpeg: &Jpeg) -> Option<Bytes> {
    find_app13_segment_pos(jpeg).map(|pos| jpeg.segments()[pos].contents().clone())
}

/// Replace, insert, or (with `None`) remove the Photoshop APP13 segment.
pub(crate) fn set_app13(jpeg: &mut Jpeg, contents: Option<Vec<u8>>) {
    let pos = find_app13_segment_pos(jpeg);
    let segments = jpeg.segments_mut();
    match (pos, contents) {
        (Some(pos), Some(contents)) => {
            segments[pos] = JpegSegment::new_with_contents(MARKER_APP13, Bytes::from(contents));
        }
        (Some(pos), None) => {
            segments.remove(pos);
        }
        (None, Some(contents)) => {
            // After APP0/APP1 segments, before the frame header
            let insert_pos = segments
                .iter()
                .position(|s| !(MARKER_APP0..=MARKER_APP1).contains(&s.marker()))
                .unwrap_or(segments.len());
            segments.insert(
                insert_pos,
                JpegSegment::new_with_contents(MARKER_APP13, Bytes::from(contents)),
            );
        }
        (None, None) => {}
    }
}

/// The embedded XMP packet, if any.
///
/// JPEG files are searched segment by segment; other containers store the
/// packet uncompressed (PNG iTXt, WebP `XMP ` chunk, TIFF tag 700), so a
/// byte scan for the `x:xmpmeta` element finds it.
pub(crate) fn xmp_packet(path: &Path) -> Result<Option<String>> {
    let file_bytes = std::fs::read(path).context("Failed to read image file")?;

    if file_bytes.starts_with(&[0xFF, 0xD8]) {
        let jpeg = Jpeg::from_bytes(Bytes::from(file_bytes))
            .map_err(|e| anyhow::anyhow!("Failed to parse JPEG: {e}"))?;
        return Ok(find_xmp_segment_pos(&jpeg).map(|pos| {
            let contents = jpeg.segments()[pos].contents();
            String::from_utf8_lossy(&contents[XMP_HEADER.len()..]).to_string()
        }));
    }

    let Some(start) = find_bytes(&file_bytes, XMP_OPEN) else {
        return Ok(None);
    };
    let end = find_bytes(&file_bytes[start..], XMP_CLOSE)
        .map(|off| start + off + XMP_CLOSE.len())
        .context("XMP packet is not terminated")?;
    Ok(Some(String::from_utf8_lossy(&file_bytes[start..end]).to_string()))
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Replace the EXIF block of a JPEG, PNG, or WebP file in place.
///
/// `tiff` is the raw TIFF structure (starting with `II`/`MM`); `None`
/// removes the block. Other segments are preserved byte for byte.
pub fn embed_exif(path: &Path, tiff: Option<Vec<u8>>) -> Result<()> {
    let file_bytes = std::fs::read(path).context("Failed to read image file")?;
    let mut image = DynImage::from_bytes(Bytes::from(file_bytes))
        .map_err(|e| anyhow::anyhow!("Failed to parse image container: {e}"))?
        .context("Unsupported container for EXIF (JPEG, PNG, and WebP only)")?;

    let tiff = tiff.map(Bytes::from);
    image.set_exif(tiff.clone());

    match &mut image {
        DynImage::Jpeg(jpeg) => move_exif_first(jpeg),
        DynImage::WebP(webp) => {
            if let Some(tiff) = tiff {
                set_webp_exif_chunk(webp, tiff);
            }
        }
        _ => {}
    }

    let output = image.encoder().bytes();
    std::fs::write(path, &output).context("Failed to write image file")?;
    Ok(())
}

/// Move the EXIF APP1 right after APP0.
///
/// `set_exif()` may insert after an XMP APP1; many EXIF parsers expect
/// EXIF to be the first APP1.
fn move_exif_first(jpeg: &mut Jpeg) {
    let Some(pos) = find_exif_segment_pos(jpeg) else {
        return;
    };
    let segments = jpeg.segments_mut();
    let target = match segments.first() {
        Some(first) if first.marker() == MARKER_APP0 => 1,
        _ => 0,
    };
    if pos > target {
        let seg = segments.remove(pos);
        segments.insert(target, seg);
    }
}

/// Store `tiff` as the bare contents of the WebP `EXIF` chunk.
///
/// `set_exif()` has already added the chunk and the VP8X flag, but with an
/// `Exif\0\0` prefix that WebP readers do not expect.
fn set_webp_exif_chunk(webp: &mut WebP, tiff: Bytes) {
    if let Some(chunk) = webp.chunks_mut().iter_mut().find(|c| c.id() == CHUNK_EXIF) {
        *chunk = RiffChunk::new(CHUNK_EXIF, RiffContent::Data(tiff));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use tempfile::TempDir;

    #[test]
    fn app13_insert_replace_remove() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.jpg");
        testutil::write_jpeg(&path, 4, 4);

        let mut jpeg = read_jpeg(&path).unwrap();
        assert!(app13_contents(&jpeg).is_none());

        let mut contents = IPTC_HEADER.to_vec();
        contents.extend_from_slice(b"first");
        set_app13(&mut jpeg, Some(contents));
        assert!(app13_contents(&jpeg).unwrap().ends_with(b"first"));

        let mut contents = IPTC_HEADER.to_vec();
        contents.extend_from_slice(b"second");
        set_app13(&mut jpeg, Some(contents));
        let count = jpeg.segments().iter().filter(|s| s.marker() == MARKER_APP13).count();
        assert_eq!(count, 1);
        assert!(app13_contents(&jpeg).unwrap().ends_with(b"second"));

        set_app13(&mut jpeg, None);
        assert!(app13_contents(&jpeg).is_none());
    }

    #[test]
    fn xmp_packet_from_jpeg_segment() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.jpg");
        testutil::write_jpeg(&path, 4, 4);
        assert!(xmp_packet(&path).unwrap().is_none());

        testutil::inject_xmp(&path, testutil::SAMPLE_XMP);
        let packet = xmp_packet(&path).unwrap().unwrap();
        assert!(packet.contains("<dc:creator>"));
    }

    #[test]
    fn xmp_packet_by_scan() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.bin");
        let mut bytes = b"\x89PNG junk".to_vec();
        bytes.extend_from_slice(b"<x:xmpmeta xmlns:x=\"adobe:ns:meta/\"></x:xmpmeta>trailer");
        std::fs::write(&path, bytes).unwrap();

        let packet = xmp_packet(&path).unwrap().unwrap();
        assert!(packet.starts_with("<x:xmpmeta"));
        assert!(packet.ends_with("</x:xmpmeta>"));
    }

    #[test]
    fn unterminated_packet_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.bin");
        std::fs::write(&path, b"<x:xmpmeta xmlns:x=\"adobe:ns:meta/\">").unwrap();
        assert!(xmp_packet(&path).is_err());
    }

    #[test]
    fn embed_exif_puts_block_after_app0() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.jpg");
        testutil::write_jpeg(&path, 4, 4);
        testutil::inject_xmp(&path, testutil::SAMPLE_XMP);

        testutil::inject_exif(&path, &testutil::sample_exif_fields());
        let jpeg = read_jpeg(&path).unwrap();
        let exif_pos = find_exif_segment_pos(&jpeg).unwrap();
        let xmp_pos = find_xmp_segment_pos(&jpeg).unwrap();
        assert!(exif_pos < xmp_pos);

        embed_exif(&path, None).unwrap();
        let jpeg = read_jpeg(&path).unwrap();
        assert!(find_exif_segment_pos(&jpeg).is_none());
        assert!(find_xmp_segment_pos(&jpeg).is_some());
    }

    #[test]
    fn webp_exif_chunk_holds_bare_tiff() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.webp");
        testutil::write_webp(&path, 4, 4);
        testutil::inject_exif(&path, &testutil::sample_exif_fields());

        let webp = WebP::from_bytes(Bytes::from(std::fs::read(&path).unwrap())).unwrap();
        let chunk = webp.chunk_by_id(CHUNK_EXIF).unwrap();
        let data = chunk.content().data().unwrap();
        assert!(data.starts_with(b"MM") || data.starts_with(b"II"));
        assert_eq!(webp.chunks_by_id(CHUNK_EXIF).count(), 1);

        // Pixels still decode
        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (4, 4));

        embed_exif(&path, None).unwrap();
        let webp = WebP::from_bytes(Bytes::from(std::fs::read(&path).unwrap())).unwrap();
        assert!(!webp.has_chunk(CHUNK_EXIF));
    }

    #[test]
    fn embed_exif_rejects_tiff() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.tif");
        image::RgbImage::new(2, 2).save(&path).unwrap();
        assert!(embed_exif(&path, Some(vec![b'I', b'I', 42, 0])).is_err());
    }
}
