//! Utility functions for cache key naming and page ordering

use regex::Regex;
use std::sync::LazyLock;

/// Extension used when a page URL carries none
const DEFAULT_PAGE_EXTENSION: &str = "jpg";

static PAGE_INDEX: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"_p(\d+)(?:\.[A-Za-z0-9]+)?$").expect("page index pattern is valid")
});

static FRAME_INDEX: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(\d+)(?:\.[A-Za-z0-9]+)?$").expect("frame index pattern is valid")
});

/// Extract a lowercase file extension from the last path segment of a URL
///
/// Query strings and fragments are ignored. Extensions longer than five
/// characters or containing non-alphanumerics are treated as absent.
///
/// # Examples
///
/// ```
/// use artfetch::utils::extension_from_url;
///
/// assert_eq!(extension_from_url("https://i.example.net/img/100_p0.PNG?x=1").as_deref(), Some("png"));
/// assert_eq!(extension_from_url("https://i.example.net/img/raw"), None);
/// ```
#[must_use]
pub fn extension_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.next_back()?;
    let (_, ext) = segment.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > 5 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// File name a static page is cached under: `<id>_p<index>.<ext>`
#[must_use]
pub fn page_file_name(artwork_id: &str, index: usize, source_url: &str) -> String {
    let ext = extension_from_url(source_url).unwrap_or_else(|| DEFAULT_PAGE_EXTENSION.into());
    format!("{}_p{}.{}", artwork_id, index, ext)
}

/// Page index encoded in a cached file name, if any
///
/// # Examples
///
/// ```
/// use artfetch::utils::page_index;
///
/// assert_eq!(page_index("100_p12.jpg"), Some(12));
/// assert_eq!(page_index("200.gif"), None);
/// ```
#[must_use]
pub fn page_index(file_name: &str) -> Option<usize> {
    PAGE_INDEX
        .captures(file_name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Frame number at the end of an archive entry's file stem, if any
///
/// # Examples
///
/// ```
/// use artfetch::utils::frame_index;
///
/// assert_eq!(frame_index("000012.jpg"), Some(12));
/// assert_eq!(frame_index("frame_7.png"), Some(7));
/// assert_eq!(frame_index("cover.jpg"), None);
/// ```
#[must_use]
pub fn frame_index(file_name: &str) -> Option<u64> {
    FRAME_INDEX
        .captures(file_name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Sort names into page order: numbered pages by index, anything else after them by name
pub fn sort_by_page_order<T>(items: &mut [T], name_of: impl Fn(&T) -> &str) {
    sort_by_index(items, name_of, page_index);
}

/// Sort archive entries into frame order: numbered frames by number, anything
/// else after them by name
pub fn sort_by_frame_order<T>(items: &mut [T], name_of: impl Fn(&T) -> &str) {
    sort_by_index(items, name_of, frame_index);
}

fn sort_by_index<T, I: Ord>(
    items: &mut [T],
    name_of: impl Fn(&T) -> &str,
    index_of: impl Fn(&str) -> Option<I>,
) {
    items.sort_by(|a, b| {
        let (a, b) = (name_of(a), name_of(b));
        match (index_of(a), index_of(b)) {
            (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.cmp(b),
        }
    });
}
