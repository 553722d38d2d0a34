//! Naming of uploaded media files.
//!
//! Files land at `{dir}/{slug}-{uuid}{ext}` so that two uploads never collide and
//! the name still hints at what the file belongs to.

use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum UploadDir {
    PostImages,
    UserPictures,
}

impl UploadDir {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            UploadDir::PostImages => "uploads/post_images",
            UploadDir::UserPictures => "uploads/image",
        }
    }
}

/// Decomposes `title` (NFKD) so accented letters fall back to their ASCII base,
/// lowercases, drops everything but ASCII alphanumerics, `_`, `-` and whitespace,
/// collapses runs of whitespace and hyphens into one hyphen and trims `-`/`_` from
/// both ends.
#[must_use]
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.nfkd() {
        if c.is_whitespace() || c == '-' {
            pending_hyphen = true;
        } else if c.is_ascii_alphanumeric() || c == '_' {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        }
    }

    slug.trim_matches(['-', '_']).to_owned()
}

/// Extension of `filename` including the dot, or an empty string.
///
/// Extensions that contain anything but ASCII alphanumerics are dropped.
#[must_use]
pub fn extension(filename: &str) -> &str {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let stem_len = base.len() - base.trim_start_matches('.').len();

    match base[stem_len..].rfind('.') {
        Some(dot) => {
            let extension = &base[stem_len + dot..];
            if extension.len() > 1 && extension[1..].chars().all(|c| c.is_ascii_alphanumeric()) {
                extension
            } else {
                ""
            }
        }
        None => "",
    }
}

/// Relative storage path for an upload titled `title` with the client's `filename`.
#[must_use]
pub fn upload_path(dir: UploadDir, title: &str, filename: &str) -> String {
    let slug = slugify(title);
    let id = Uuid::new_v4();
    let extension = extension(filename);

    if slug.is_empty() {
        format!("{}/{id}{extension}", dir.as_str())
    } else {
        format!("{}/{slug}-{id}{extension}", dir.as_str())
    }
}
