/// Extensions accepted by `POST /upload` (compared case-insensitively).
pub const ALLOWED_EXTENSIONS: &[&str] = &["txt", "pdf", "png", "jpg", "jpeg", "gif"];

/// URL prefix under which stored uploads are served.
pub const UPLOADS_ROUTE: &str = "/uploads";

/// Whether the filename carries an allowed extension.
pub fn allowed_file(filename: &str) -> bool {
    let Some((_, extension)) = filename.rsplit_once('.') else {
        return false;
    };

    let extension = extension.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&extension.as_str())
}

/// Reduce a client-supplied filename to a flat, ASCII-only name that is safe
/// to join onto the upload directory. Returns `None` when nothing usable is left.
pub fn secure_filename(raw: &str) -> Option<String> {
    let flattened: String = raw
        .chars()
        .filter(char::is_ascii)
        .map(|ch| if ch == '/' || ch == '\\' { ' ' } else { ch })
        .collect();

    let joined = flattened.split_whitespace().collect::<Vec<_>>().join("_");

    let cleaned: String = joined
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-'))
        .collect();

    let trimmed = cleaned.trim_matches(|ch| ch == '.' || ch == '_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

/// Public URL of a stored upload.
pub fn upload_url(filename: &str) -> String {
    format!("{}/{}", UPLOADS_ROUTE, filename)
}

#[cfg(test)]
mod tests {
    use super::{allowed_file, secure_filename, upload_url};

    #[test]
    fn accepts_known_extensions() {
        assert!(allowed_file("notes.txt"));
        assert!(allowed_file("photo.JPEG"));
        assert!(allowed_file("archive.tar.gif"));
        assert!(!allowed_file("script.sh"));
        assert!(!allowed_file("README"));
        assert!(!allowed_file("trailing."));
    }

    #[test]
    fn sanitizes_filenames() {
        assert_eq!(secure_filename("My cool movie.mov").as_deref(), Some("My_cool_movie.mov"));
        assert_eq!(secure_filename("../../../etc/passwd").as_deref(), Some("etc_passwd"));
        assert_eq!(secure_filename("..\\windows\\a.txt").as_deref(), Some("windows_a.txt"));
        assert_eq!(secure_filename("résumé.pdf").as_deref(), Some("rsum.pdf"));
        assert_eq!(secure_filename("a;b|c.png").as_deref(), Some("abc.png"));
        assert_eq!(secure_filename("...").as_deref(), None);
        assert_eq!(secure_filename("").as_deref(), None);
    }

    #[test]
    fn builds_upload_urls() {
        assert_eq!(upload_url("a.png"), "/uploads/a.png");
    }
}
