use serde::{Deserialize, Deserializer};

/// One remote file as listed by `/api/files`.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    /// Drive sends sizes as decimal strings and leaves them out for folders.
    #[serde(default, deserialize_with = "lenient_size")]
    pub size: Option<u64>,
}

impl FileRecord {
    pub fn kind(&self) -> FileKind {
        FileKind::of(&self.mime_type)
    }

    pub fn size_or_zero(&self) -> u64 {
        self.size.unwrap_or(0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    Folder,
    Image,
    Pdf,
    Other,
}

impl FileKind {
    pub fn of(mime_type: &str) -> FileKind {
        if mime_type.contains("folder") {
            FileKind::Folder
        } else if mime_type.contains("image") {
            FileKind::Image
        } else if mime_type.contains("pdf") {
            FileKind::Pdf
        } else {
            FileKind::Other
        }
    }

    pub fn icon_url(self) -> &'static str {
        match self {
            FileKind::Folder => "https://img.icons8.com/color/48/folder-invoices--v1.png",
            FileKind::Image => "https://img.icons8.com/color/48/image-file.png",
            FileKind::Pdf => "https://img.icons8.com/color/48/pdf.png",
            FileKind::Other => "https://img.icons8.com/color/48/file.png",
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            FileKind::Folder => "dir",
            FileKind::Image => "img",
            FileKind::Pdf => "pdf",
            FileKind::Other => "",
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SizeRepr {
    Number(u64),
    Text(String),
}

fn lenient_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<SizeRepr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(SizeRepr::Number(n)) => Ok(Some(n)),
        Some(SizeRepr::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(SizeRepr::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("invalid size {:?}: {}", s, e))),
    }
}
