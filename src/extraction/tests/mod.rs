use super::*;
use std::io::Write;
use tempfile::tempdir;

fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = ::zip::ZipWriter::new(file);
    let options = ::zip::write::FileOptions::default()
        .compression_method(::zip::CompressionMethod::Stored);
    for (name, data) in entries {
        if name.ends_with('/') {
            zip.add_directory(*name, options).unwrap();
        } else {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
    }
    zip.finish().unwrap();
}

#[tokio::test]
async fn frames_are_renumbered_in_name_order() {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("frames.zip");
    write_zip(
        &archive,
        &[
            ("000002.jpg", b"third"),
            ("000000.jpg", b"first"),
            ("000001.jpg", b"second"),
        ],
    );

    let dest = dir.path().join("frames");
    let sequence = extract_frames(&archive, &dest).await.unwrap();

    assert_eq!(sequence.count, 3);
    assert_eq!(sequence.extension, "jpg");
    assert_eq!(sequence.pattern(), dest.join("frame_%06d.jpg"));
    assert_eq!(
        std::fs::read(dest.join("frame_000000.jpg")).unwrap(),
        b"first"
    );
    assert_eq!(
        std::fs::read(dest.join("frame_000002.jpg")).unwrap(),
        b"third"
    );
    assert!(!dest.join(".raw").exists());
}

#[tokio::test]
async fn unpadded_frame_numbers_sort_numerically() {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("frames.zip");
    write_zip(
        &archive,
        &[
            ("10.jpg", b"eleventh"),
            ("2.jpg", b"third"),
            ("0.jpg", b"first"),
            ("1.jpg", b"second"),
            ("9.jpg", b"tenth"),
        ],
    );

    let dest = dir.path().join("frames");
    let sequence = extract_frames(&archive, &dest).await.unwrap();

    assert_eq!(sequence.count, 5);
    let read = |i: usize| std::fs::read(dest.join(format!("frame_{:06}.jpg", i))).unwrap();
    assert_eq!(read(0), b"first");
    assert_eq!(read(1), b"second");
    assert_eq!(read(2), b"third");
    assert_eq!(read(3), b"tenth");
    assert_eq!(read(4), b"eleventh");
}

#[tokio::test]
async fn non_frame_entries_are_ignored() {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("frames.zip");
    write_zip(
        &archive,
        &[
            ("meta/", b""),
            ("meta/animation.json", b"{}"),
            ("a.PNG", b"a"),
            ("b.png", b"b"),
        ],
    );

    let sequence = extract_frames(&archive, &dir.path().join("out"))
        .await
        .unwrap();
    assert_eq!(sequence.count, 2);
    assert_eq!(sequence.extension, "png");
}

#[tokio::test]
async fn jpeg_and_jpg_mix_is_accepted() {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("frames.zip");
    write_zip(&archive, &[("0.jpeg", b"x"), ("1.jpg", b"y")]);

    let sequence = extract_frames(&archive, &dir.path().join("out"))
        .await
        .unwrap();
    assert_eq!(sequence.extension, "jpg");
    assert_eq!(sequence.count, 2);
}

#[tokio::test]
async fn mixed_formats_are_rejected() {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("frames.zip");
    write_zip(&archive, &[("0.jpg", b"x"), ("1.png", b"y")]);

    let err = extract_frames(&archive, &dir.path().join("out"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Extraction { .. }));
}

#[tokio::test]
async fn archive_without_frames_is_an_error() {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("empty.zip");
    write_zip(&archive, &[("readme.txt", b"nothing here")]);

    let err = extract_frames(&archive, &dir.path().join("out"))
        .await
        .unwrap_err();
    match err {
        Error::Extraction { reason, .. } => assert!(reason.contains("no frames")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn corrupt_archive_is_an_extraction_error() {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("broken.zip");
    std::fs::write(&archive, b"this is not a zip file").unwrap();

    let err = extract_frames(&archive, &dir.path().join("out"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Extraction { .. }));
}

#[test]
fn zip_extractor_skips_escaping_entries() {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("evil.zip");
    write_zip(&archive, &[("../escape.jpg", b"x"), ("ok.jpg", b"y")]);

    let dest = dir.path().join("dest");
    let files = ZipExtractor::extract(&archive, &dest).unwrap();
    assert_eq!(files, vec![dest.join("ok.jpg")]);
    assert!(!dir.path().join("escape.jpg").exists());
}
