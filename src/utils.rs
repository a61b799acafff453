use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::io::Cursor;
use std::time::Duration;

/// Encode PNG bytes as a `data:` URI
pub fn png_data_uri(bytes: &[u8]) -> String {
    format!("data:image/png;base64,{}", BASE64.encode(bytes))
}

/// Read the pixel dimensions from an encoded image header
///
/// Full-page captures report a height of 0; this recovers the real extent.
pub fn image_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::io::Reader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

pub fn sanitize_filename(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '&' | '=' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Longest file stem written, in bytes; keeps names under NAME_MAX
pub const MAX_FILE_STEM_BYTES: usize = 200;

/// Output file name for a captured URL
///
/// Different URLs can map to the same name (scheme and trailing slash are
/// dropped); use [`batch_filename`] when writing several captures side by side.
pub fn filename_for_url(url: &str) -> String {
    let stripped = url
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');
    format!("{}.png", truncate_on_char_boundary(&sanitize_filename(stripped), MAX_FILE_STEM_BYTES))
}

/// Output file name for the `index`-th URL of a batch, unique within the batch
pub fn batch_filename(index: usize, url: &str) -> String {
    format!("{index:04}-{}", filename_for_url(url))
}

fn truncate_on_char_boundary(input: &str, max_bytes: usize) -> &str {
    if input.len() <= max_bytes {
        return input;
    }
    let mut end = max_bytes;
    while !input.is_char_boundary(end) {
        end -= 1;
    }
    &input[..end]
}

pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    let millis = duration.subsec_millis();

    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else if seconds > 0 {
        format!("{}.{}s", seconds, millis / 100)
    } else {
        format!("{millis}ms")
    }
}

pub fn format_bytes(bytes: usize) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageOutputFormat, Rgba};

    fn tiny_png(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_pixel(width, height, Rgba([255u8, 0, 0, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_png_data_uri() {
        assert_eq!(png_data_uri(b"hi"), "data:image/png;base64,aGk=");
        assert_eq!(png_data_uri(&[]), "data:image/png;base64,");
    }

    #[test]
    fn test_image_dimensions() {
        assert_eq!(image_dimensions(&tiny_png(7, 3)), Some((7, 3)));
        assert_eq!(image_dimensions(b"definitely not a png"), None);
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("test.txt"), "test.txt");
        assert_eq!(sanitize_filename("test/file.txt"), "test_file.txt");
        assert_eq!(sanitize_filename("test:file?.txt"), "test_file_.txt");
    }

    #[test]
    fn test_filename_for_url() {
        assert_eq!(filename_for_url("https://example.com/"), "example.com.png");
        assert_eq!(
            filename_for_url("http://example.com/a?b=c&d"),
            "example.com_a_b_c_d.png"
        );
    }

    #[test]
    fn test_long_url_filename_is_truncated() {
        let url = format!("https://example.com/{}", "é".repeat(300));
        let name = filename_for_url(&url);
        assert!(name.len() <= MAX_FILE_STEM_BYTES + ".png".len());
        assert!(name.ends_with(".png"));
        assert!(name.starts_with("example.com_"));
    }

    #[test]
    fn test_batch_filenames_are_unique() {
        let urls = [
            "https://a.test",
            "http://a.test",
            "https://a.test/",
            "https://a.test/?a=b",
            "https://a.test/?a_b",
        ];
        assert_eq!(filename_for_url(urls[0]), filename_for_url(urls[1]));
        assert_eq!(filename_for_url(urls[3]), filename_for_url(urls[4]));

        let names: std::collections::HashSet<_> = urls
            .iter()
            .enumerate()
            .map(|(i, url)| batch_filename(i, url))
            .collect();
        assert_eq!(names.len(), urls.len());
        assert_eq!(batch_filename(2, urls[2]), "0002-a.test.png");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(format_duration(Duration::from_secs(5)), "5.0s");
        assert_eq!(format_duration(Duration::from_secs(65)), "1m 5s");
        assert_eq!(format_duration(Duration::from_secs(3665)), "1h 1m 5s");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
    }
}
