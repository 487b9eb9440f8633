//! Mock provider endpoints and generated content

use serde_json::json;
use std::io::Write;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// One page served by the mock asset host
pub struct Page {
    pub route: String,
    pub body: Vec<u8>,
    pub delay: Duration,
}

impl Page {
    pub fn new(route: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            route: route.into(),
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Mount metadata for a static artwork and its pages, each expected exactly once
pub async fn mount_static(server: &MockServer, id: &str, pages: &[Page]) {
    let urls: Vec<String> = pages
        .iter()
        .map(|p| format!("{}{}", server.uri(), p.route))
        .collect();
    Mock::given(method("GET"))
        .and(path(format!("/api/artworks/{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "static",
            "pages": urls,
        })))
        .expect(1)
        .mount(server)
        .await;

    for page in pages {
        Mock::given(method("GET"))
            .and(path(page.route.as_str()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(page.body.clone())
                    .set_delay(page.delay),
            )
            .expect(1)
            .mount(server)
            .await;
    }
}

/// Mount metadata for an animated artwork and its frame archive
pub async fn mount_animated(
    server: &MockServer,
    id: &str,
    archive: Vec<u8>,
    frame_rate: Option<u32>,
) {
    let archive_route = format!("/zip/{}.zip", id);
    Mock::given(method("GET"))
        .and(path(format!("/api/artworks/{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "animated",
            "archive_url": format!("{}{}", server.uri(), archive_route),
            "frame_rate": frame_rate,
        })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(archive_route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
        .expect(1)
        .mount(server)
        .await;
}

/// ZIP archive of `(name, bytes)` entries, stored uncompressed
pub fn frame_archive(frames: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, data) in frames {
        zip.start_file(name.as_str(), options).expect("start entry");
        zip.write_all(data).expect("write entry");
    }
    zip.finish().expect("finish archive").into_inner()
}

/// `count` frames named `000000.<ext>`, each filled with its own index
pub fn numbered_frames(count: usize, ext: &str, size: usize) -> Vec<(String, Vec<u8>)> {
    (0..count)
        .map(|i| (format!("{:06}.{}", i, ext), vec![i as u8; size]))
        .collect()
}

/// Uncompressed 24-bit BMP of a single colour
pub fn solid_bmp(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let row = (width * 3).div_ceil(4) * 4;
    let pixels = row * height;
    let mut out = Vec::with_capacity(54 + pixels as usize);
    out.extend_from_slice(b"BM");
    out.extend_from_slice(&(54 + pixels).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&54u32.to_le_bytes());
    out.extend_from_slice(&40u32.to_le_bytes());
    out.extend_from_slice(&(width as i32).to_le_bytes());
    out.extend_from_slice(&(height as i32).to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&24u16.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&pixels.to_le_bytes());
    out.extend_from_slice(&2835i32.to_le_bytes());
    out.extend_from_slice(&2835i32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    for _ in 0..height {
        let mut written = 0;
        for _ in 0..width {
            out.extend_from_slice(&[rgb[2], rgb[1], rgb[0]]);
            written += 3;
        }
        out.resize(out.len() + (row - written) as usize, 0);
    }
    out
}
