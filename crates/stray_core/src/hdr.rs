//! Radiance HDR (RGBE) image I/O.
//!
//! The writer emits the exact header other Radiance readers expect
//! (`#?RADIANCE` ... `FORMAT=32-bit_rle_rgbe`) followed by flat RGBE
//! quads; the reader is tolerant and also accepts new-style RLE
//! scanlines as produced by most tools.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use stray_math::Vec3;
use thiserror::Error;

/// Errors that can occur during HDR image I/O.
#[derive(Error, Debug)]
pub enum HdrError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed HDR file: {0}")]
    Malformed(String),

    #[error("Unsupported HDR feature: {0}")]
    Unsupported(String),
}

pub type HdrResult<T> = Result<T, HdrError>;

/// A linear-RGB floating point image, row-major from the top-left.
#[derive(Clone, Debug)]
pub struct HdrImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<Vec3>,
}

impl HdrImage {
    /// Create an image filled with black.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Vec3::ZERO; width * height],
        }
    }

    /// Create an image from existing pixel data.
    ///
    /// `pixels.len()` must equal `width * height`.
    pub fn from_pixels(width: usize, height: usize, pixels: Vec<Vec3>) -> Self {
        assert_eq!(pixels.len(), width * height);
        Self {
            width,
            height,
            pixels,
        }
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> Vec3 {
        self.pixels[y * self.width + x]
    }

    #[inline]
    pub fn set_pixel(&mut self, x: usize, y: usize, color: Vec3) {
        self.pixels[y * self.width + x] = color;
    }
}

/// Encode a linear RGB color as an RGBE quad (shared-exponent format).
fn float_to_rgbe(color: Vec3) -> [u8; 4] {
    let max = color.x.max(color.y).max(color.z);
    if max < 1e-32 {
        return [0, 0, 0, 0];
    }

    let (mantissa, exponent) = frexp(max);
    let scale = mantissa * 256.0 / max;
    [
        (color.x.max(0.0) * scale) as u8,
        (color.y.max(0.0) * scale) as u8,
        (color.z.max(0.0) * scale) as u8,
        (exponent + 128) as u8,
    ]
}

/// Decode an RGBE quad back to linear RGB.
fn rgbe_to_float(rgbe: [u8; 4]) -> Vec3 {
    if rgbe[3] == 0 {
        return Vec3::ZERO;
    }
    // ldexp(1, e - (128 + 8)); +0.5 centers the mantissa quantization.
    let scale = ((rgbe[3] as i32 - 136) as f32).exp2();
    Vec3::new(
        (rgbe[0] as f32 + 0.5) * scale,
        (rgbe[1] as f32 + 0.5) * scale,
        (rgbe[2] as f32 + 0.5) * scale,
    )
}

/// Split a positive finite float into (mantissa in [0.5, 1), exponent).
fn frexp(x: f32) -> (f32, i32) {
    let bits = x.to_bits();
    let biased = ((bits >> 23) & 0xff) as i32;
    if biased == 0 {
        // Subnormal: renormalize through a 2^25 scale.
        let scaled = x * f32::from_bits(0x4c00_0000);
        let bits = scaled.to_bits();
        let biased = ((bits >> 23) & 0xff) as i32;
        let mantissa = f32::from_bits((bits & 0x807f_ffff) | 0x3f00_0000);
        (mantissa, biased - 126 - 25)
    } else {
        let mantissa = f32::from_bits((bits & 0x807f_ffff) | 0x3f00_0000);
        (mantissa, biased - 126)
    }
}

/// Write a Radiance HDR image.
///
/// The header is byte-exact per the format contract; pixel data is
/// written as flat (uncompressed) RGBE quads despite the `rle` format
/// tag, which is valid Radiance practice.
pub fn write_hdr<W: Write>(writer: &mut W, image: &HdrImage) -> HdrResult<()> {
    write!(
        writer,
        "#?RADIANCE\nGAMMA=1\nEXPOSURE=1\nFORMAT=32-bit_rle_rgbe\n\n-Y {} +X {}\n",
        image.height, image.width
    )?;
    for &pixel in &image.pixels {
        writer.write_all(&float_to_rgbe(pixel))?;
    }
    Ok(())
}

/// Write a Radiance HDR image to a file path.
pub fn save_hdr<P: AsRef<Path>>(path: P, image: &HdrImage) -> HdrResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_hdr(&mut writer, image)?;
    writer.flush()?;
    Ok(())
}

/// Read a Radiance HDR image.
///
/// Accepts any `#?` program identifier, optional GAMMA/EXPOSURE lines,
/// and both flat and new-style RLE scanlines.
pub fn read_hdr<R: Read>(reader: &mut R) -> HdrResult<HdrImage> {
    let mut reader = BufReader::new(reader);

    let magic = read_header_line(&mut reader)?;
    if !magic.starts_with("#?") {
        return Err(HdrError::Malformed(format!(
            "missing #? identifier, got {magic:?}"
        )));
    }

    let mut format_seen = false;
    loop {
        let line = read_header_line(&mut reader)?;
        if line.is_empty() {
            break;
        }
        if let Some(format) = line.strip_prefix("FORMAT=") {
            if format != "32-bit_rle_rgbe" {
                return Err(HdrError::Unsupported(format!("pixel format {format}")));
            }
            format_seen = true;
        }
        // GAMMA=, EXPOSURE= and # comments are accepted and ignored.
    }
    if !format_seen {
        return Err(HdrError::Malformed("no FORMAT line in header".into()));
    }

    let resolution = read_header_line(&mut reader)?;
    let (width, height) = parse_resolution(&resolution)?;

    let mut image = HdrImage::new(width, height);
    let mut scanline = vec![[0u8; 4]; width];
    for y in 0..height {
        read_scanline(&mut reader, &mut scanline)?;
        for (x, &rgbe) in scanline.iter().enumerate() {
            image.set_pixel(x, y, rgbe_to_float(rgbe));
        }
    }
    Ok(image)
}

/// Read a Radiance HDR image from a file path.
pub fn load_hdr<P: AsRef<Path>>(path: P) -> HdrResult<HdrImage> {
    let mut file = File::open(path)?;
    read_hdr(&mut file)
}

fn read_header_line<R: BufRead>(reader: &mut R) -> HdrResult<String> {
    let mut line = Vec::new();
    reader.read_until(b'\n', &mut line)?;
    if line.is_empty() {
        return Err(HdrError::Malformed("unexpected end of header".into()));
    }
    if line.last() == Some(&b'\n') {
        line.pop();
    }
    String::from_utf8(line).map_err(|_| HdrError::Malformed("non-UTF8 header line".into()))
}

fn parse_resolution(line: &str) -> HdrResult<(usize, usize)> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        ["-Y", h, "+X", w] => {
            let height = h
                .parse()
                .map_err(|_| HdrError::Malformed(format!("bad height in {line:?}")))?;
            let width = w
                .parse()
                .map_err(|_| HdrError::Malformed(format!("bad width in {line:?}")))?;
            Ok((width, height))
        }
        _ => Err(HdrError::Unsupported(format!(
            "pixel ordering {line:?} (only -Y +X is supported)"
        ))),
    }
}

/// Read one scanline, detecting flat vs. new-style RLE encoding.
fn read_scanline<R: BufRead>(reader: &mut R, scanline: &mut [[u8; 4]]) -> HdrResult<()> {
    let width = scanline.len();

    let mut first = [0u8; 4];
    reader.read_exact(&mut first)?;

    // New-style RLE: 0x02 0x02 followed by the 16-bit scanline width.
    let rle_width = ((first[2] as usize) << 8) | first[3] as usize;
    if first[0] == 2 && first[1] == 2 && rle_width == width && width >= 8 && width < 32768 {
        read_rle_scanline(reader, scanline)?;
        return Ok(());
    }

    scanline[0] = first;
    for quad in scanline[1..].iter_mut() {
        reader.read_exact(quad)?;
    }
    Ok(())
}

/// Decode one new-style RLE scanline (each component run-length coded
/// separately across the full scanline).
fn read_rle_scanline<R: BufRead>(reader: &mut R, scanline: &mut [[u8; 4]]) -> HdrResult<()> {
    let width = scanline.len();
    for component in 0..4 {
        let mut x = 0;
        while x < width {
            let mut header = [0u8; 1];
            reader.read_exact(&mut header)?;
            let count = header[0] as usize;
            if count > 128 {
                // Run of a repeated byte.
                let run = count - 128;
                if x + run > width {
                    return Err(HdrError::Malformed("RLE run overflows scanline".into()));
                }
                let mut value = [0u8; 1];
                reader.read_exact(&mut value)?;
                for quad in scanline[x..x + run].iter_mut() {
                    quad[component] = value[0];
                }
                x += run;
            } else {
                if count == 0 || x + count > width {
                    return Err(HdrError::Malformed("bad RLE literal count".into()));
                }
                let mut literals = vec![0u8; count];
                reader.read_exact(&mut literals)?;
                for (quad, &value) in scanline[x..x + count].iter_mut().zip(&literals) {
                    quad[component] = value;
                }
                x += count;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_header_bytes_are_exact() {
        let image = HdrImage::new(3, 2);
        let mut bytes = Vec::new();
        write_hdr(&mut bytes, &image).unwrap();

        let expected = b"#?RADIANCE\nGAMMA=1\nEXPOSURE=1\nFORMAT=32-bit_rle_rgbe\n\n-Y 2 +X 3\n";
        assert_eq!(&bytes[..expected.len()], expected.as_slice());
        // Six flat RGBE quads follow.
        assert_eq!(bytes.len(), expected.len() + 6 * 4);
    }

    #[test]
    fn test_rgbe_encodes_black_as_zero() {
        assert_eq!(float_to_rgbe(Vec3::ZERO), [0, 0, 0, 0]);
        assert_eq!(float_to_rgbe(Vec3::splat(1e-38)), [0, 0, 0, 0]);
        assert_eq!(rgbe_to_float([0, 0, 0, 0]), Vec3::ZERO);
    }

    #[test]
    fn test_round_trip_within_quantization() {
        let pixels = vec![
            Vec3::new(1.0, 0.5, 0.25),
            Vec3::new(100.0, 10.0, 1.0),
            Vec3::new(0.001, 0.002, 0.003),
            Vec3::ZERO,
            Vec3::splat(1234.5),
            Vec3::new(0.9, 0.0, 0.1),
        ];
        let image = HdrImage::from_pixels(3, 2, pixels.clone());

        let mut bytes = Vec::new();
        write_hdr(&mut bytes, &image).unwrap();
        let decoded = read_hdr(&mut Cursor::new(bytes)).unwrap();

        assert_eq!(decoded.width, 3);
        assert_eq!(decoded.height, 2);
        for (original, restored) in pixels.iter().zip(&decoded.pixels) {
            let max = original.x.max(original.y).max(original.z);
            for c in 0..3 {
                let error = (original[c] - restored[c]).abs();
                // 8-bit mantissa: error bounded by ~1/256 of the max channel.
                assert!(
                    error <= max / 256.0 + 1e-6,
                    "{original:?} -> {restored:?} channel {c}"
                );
            }
        }
    }

    #[test]
    fn test_reader_accepts_foreign_header() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"#?RGBE\n# comment line\nFORMAT=32-bit_rle_rgbe\n\n-Y 1 +X 1\n");
        bytes.extend_from_slice(&float_to_rgbe(Vec3::ONE));
        let image = read_hdr(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(image.width, 1);
        assert!((image.pixel(0, 0).x - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_reader_rejects_missing_magic() {
        let bytes = b"RADIANCE\nFORMAT=32-bit_rle_rgbe\n\n-Y 1 +X 1\n".to_vec();
        assert!(matches!(
            read_hdr(&mut Cursor::new(bytes)),
            Err(HdrError::Malformed(_))
        ));
    }

    #[test]
    fn test_reader_rejects_unknown_format() {
        let bytes = b"#?RADIANCE\nFORMAT=32-bit_rle_xyze\n\n-Y 1 +X 1\n".to_vec();
        assert!(matches!(
            read_hdr(&mut Cursor::new(bytes)),
            Err(HdrError::Unsupported(_))
        ));
    }

    #[test]
    fn test_reads_rle_scanline() {
        // One 8-pixel row: constant RGBE (128, 64, 32, 130) written as four
        // run-of-8 component streams.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"#?RADIANCE\nFORMAT=32-bit_rle_rgbe\n\n-Y 1 +X 8\n");
        bytes.extend_from_slice(&[2, 2, 0, 8]);
        for value in [128u8, 64, 32, 130] {
            bytes.extend_from_slice(&[128 + 8, value]);
        }

        let image = read_hdr(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(image.width, 8);
        let expected = rgbe_to_float([128, 64, 32, 130]);
        for x in 0..8 {
            assert_eq!(image.pixel(x, 0), expected);
        }
    }

    #[test]
    fn test_frexp_matches_definition() {
        for x in [1.0f32, 0.5, 2.0, 3.75, 1e-6, 1e20] {
            let (m, e) = frexp(x);
            assert!((0.5..1.0).contains(&m), "mantissa {m} for {x}");
            assert!((m * (e as f32).exp2() - x).abs() <= x * 1e-6);
        }
    }
}
