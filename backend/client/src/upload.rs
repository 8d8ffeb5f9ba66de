//! Selected image files and their wire encoding.

use std::path::Path;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};

use signshuffle_core::{ExtractRequest, PolicyViolation, UploadPolicy};

/// Detect an image MIME type by file extension.
pub fn detect_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        _ => "application/octet-stream",
    }
}

/// One image chosen by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read image {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(filename, detect_mime_type(path), bytes))
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// `data:<mime>;base64,<payload>`
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }

    pub fn to_extract_request(&self) -> ExtractRequest {
        ExtractRequest {
            filename: (!self.filename.is_empty()).then(|| self.filename.clone()),
            filetype: self.mime_type.clone(),
            filedata: self.to_data_url(),
        }
    }
}

/// Accept a selection only if it is exactly one acceptable image.
pub fn select_single(
    mut files: Vec<ImageUpload>,
    policy: &UploadPolicy,
) -> Result<ImageUpload, PolicyViolation> {
    policy.check_count(files.len())?;
    let file = files.remove(0);
    policy.check(&file.mime_type, file.size())?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn mime_from_extension() {
        assert_eq!(detect_mime_type(Path::new("sign.JPG")), "image/jpeg");
        assert_eq!(detect_mime_type(Path::new("a/b/sign.png")), "image/png");
        assert_eq!(detect_mime_type(Path::new("sign")), "application/octet-stream");
    }

    #[test]
    fn data_url_carries_type_and_payload() {
        let upload = ImageUpload::new("x.png", "image/png", b"hi".to_vec());
        assert_eq!(upload.to_data_url(), "data:image/png;base64,aGk=");

        let request = upload.to_extract_request();
        assert_eq!(request.filename.as_deref(), Some("x.png"));
        assert_eq!(request.payload(), "aGk=");
    }

    #[test]
    fn selection_rules() {
        let policy = UploadPolicy::new(10, 20);
        let png = ImageUpload::new("a.png", "image/png", vec![0; 4]);

        assert_eq!(
            select_single(vec![], &policy),
            Err(PolicyViolation::WrongFileCount(0))
        );
        assert_eq!(
            select_single(vec![png.clone(), png.clone()], &policy),
            Err(PolicyViolation::WrongFileCount(2))
        );
        assert_eq!(
            select_single(vec![ImageUpload::new("a.gif", "image/gif", vec![0])], &policy),
            Err(PolicyViolation::UnsupportedType("image/gif".into()))
        );
        assert!(matches!(
            select_single(vec![ImageUpload::new("a.png", "image/png", vec![0; 10])], &policy),
            Err(PolicyViolation::TooLarge { size: 10, limit: 10 })
        ));
        assert_eq!(select_single(vec![png.clone()], &policy), Ok(png));
    }

    #[tokio::test]
    async fn loads_from_disk() {
        let mut file = tempfile::Builder::new().suffix(".jpeg").tempfile().unwrap();
        file.write_all(b"\xFF\xD8\xFF").unwrap();

        let upload = ImageUpload::from_path(file.path()).await.unwrap();
        assert_eq!(upload.mime_type, "image/jpeg");
        assert_eq!(upload.bytes, b"\xFF\xD8\xFF");
        assert!(upload.filename.ends_with(".jpeg"));
    }
}
