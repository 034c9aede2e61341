use std::path::Path;

/// Content type for a served file, from its extension
pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "html" | "htm" => "text/html",
        "js" | "jsx" => "application/javascript",
        "ts" | "tsx" => "application/typescript",
        "css" => "text/css",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "eot" => "application/vnd.ms-fontobject",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_extensions() {
        assert_eq!(content_type(Path::new("/bundle.js")), "application/javascript");
        assert_eq!(content_type(Path::new("/index.html")), "text/html");
        assert_eq!(content_type(Path::new("/bundle.css")), "text/css");
        assert_eq!(content_type(Path::new("/src/App.tsx")), "application/typescript");
        assert_eq!(content_type(Path::new("/img/photo.JPEG")), "image/jpeg");
        assert_eq!(content_type(Path::new("/fonts/a.woff2")), "font/woff2");
        assert_eq!(content_type(Path::new("/fonts/a.eot")), "application/vnd.ms-fontobject");
    }

    #[test]
    fn test_unknown_extensions_are_octet_stream() {
        assert_eq!(content_type(Path::new("/app.unknownext")), "application/octet-stream");
        assert_eq!(content_type(Path::new("/LICENSE")), "application/octet-stream");
    }
}
