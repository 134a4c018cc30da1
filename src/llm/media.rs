pub fn detect_mime_type(data: &[u8]) -> Option<String> {
    if data.len() > 12 {
        let ftyp = &data[4..12];
        if ftyp.starts_with(b"ftyp") {
            let brand = &ftyp[4..8];
            if brand == b"heic" || brand == b"heix" || brand == b"hevc" {
                return Some("image/heic".to_string());
            }
            if brand == b"heif" || brand == b"mif1" {
                return Some("image/heif".to_string());
            }
        }
    }

    infer::get(data).map(|kind| kind.mime_type().to_string())
}

pub fn normalize_image_mime_type(mime_type: &str) -> String {
    let lowered = mime_type.trim().to_ascii_lowercase();
    match lowered.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        "image/x-png" => "image/png".to_string(),
        _ => lowered,
    }
}

/// Image types the Gemini image models accept as inline data.
pub fn gemini_supports_image_mime(mime_type: &str) -> bool {
    matches!(
        mime_type,
        "image/png" | "image/jpeg" | "image/webp" | "image/heic" | "image/heif"
    )
}

/// Picks the first supported type among the declared one and the sniffed one.
pub fn resolve_image_mime(declared: Option<&str>, bytes: &[u8]) -> Option<String> {
    let mut candidates = Vec::new();
    if let Some(declared) = declared {
        if !declared.trim().is_empty() {
            candidates.push(declared.to_string());
        }
    }
    if let Some(detected) = detect_mime_type(bytes) {
        candidates.push(detected);
    }

    candidates
        .into_iter()
        .map(|candidate| normalize_image_mime_type(&candidate))
        .find(|candidate| gemini_supports_image_mime(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
        0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
        0x89,
    ];

    #[test]
    fn sniffs_png_and_heic() {
        assert_eq!(detect_mime_type(PNG_HEADER).as_deref(), Some("image/png"));
        let heic = b"\0\0\0\x18ftypheic\0\0\0\0";
        assert_eq!(detect_mime_type(heic).as_deref(), Some("image/heic"));
    }

    #[test]
    fn declared_type_wins_when_supported() {
        assert_eq!(
            resolve_image_mime(Some("image/JPG"), PNG_HEADER).as_deref(),
            Some("image/jpeg")
        );
    }

    #[test]
    fn falls_back_to_sniffed_type() {
        assert_eq!(
            resolve_image_mime(Some("application/octet-stream"), PNG_HEADER).as_deref(),
            Some("image/png")
        );
        assert_eq!(resolve_image_mime(None, b"plain text"), None);
    }
}
