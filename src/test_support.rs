//! Fixtures shared by unit tests.

use std::error::Error;
use std::path::Path;

/// A small JPEG without any EXIF block.
pub fn write_test_jpeg(path: &Path) -> Result<(), Box<dyn Error>> {
    let img = image::RgbImage::from_fn(16, 16, |x, y| {
        image::Rgb([(x * 16) as u8, (y * 16) as u8, 128])
    });
    img.save_with_format(path, image::ImageFormat::Jpeg)?;
    Ok(())
}

pub fn read_exif(path: &Path) -> Result<exif::Exif, Box<dyn Error>> {
    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);
    Ok(exif::Reader::new().read_from_container(&mut reader)?)
}

/// First ASCII value of a tag, without trailing NULs.
pub fn read_ascii_tag(exif: &exif::Exif, tag: exif::Tag) -> Option<String> {
    let field = exif.get_field(tag, exif::In::PRIMARY)?;
    match &field.value {
        exif::Value::Ascii(values) => values
            .first()
            .map(|v| String::from_utf8_lossy(v).trim_end_matches('\0').to_string()),
        _ => None,
    }
}

/// Unsigned decimal degrees from a degrees/minutes/seconds rational triple.
pub fn gps_degrees(exif: &exif::Exif, tag: exif::Tag) -> Option<f64> {
    let field = exif.get_field(tag, exif::In::PRIMARY)?;
    match &field.value {
        exif::Value::Rational(parts) if parts.len() >= 3 => {
            Some(parts[0].to_f64() + parts[1].to_f64() / 60.0 + parts[2].to_f64() / 3600.0)
        }
        _ => None,
    }
}
