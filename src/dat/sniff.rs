#![forbid(unsafe_code)]

//! Extension guessing for blobs with no known name.

/// Extension of the engine's embedded-object blobs, which carry their own name.
pub const EMBEDDED_OBJECT: &str = "eobj";

/// Offset of the internal name inside an embedded-object blob.
const EMBEDDED_NAME_OFFSET: usize = 8;

/// How many leading bytes the text check looks at.
const TEXT_PROBE_LEN: usize = 256;

const MAGIC4: &[(&[u8; 4], &str)] = &[
    (b"DDS ", "dds"),
    (b"PSF ", "psf"),
    (b"SCH ", "sch"),
    (b"EOBJ", EMBEDDED_OBJECT),
    (b"imgf", "imgf"),
    (b"SLOC", "sloc"),
];

const BINARY_MARKER: [u8; 4] = [0x02, 0x00, 0x00, 0x00];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sniff {
    pub extension: &'static str,
    pub recovered_name: Option<String>,
}

impl Sniff {
    fn plain(extension: &'static str) -> Self {
        Self {
            extension,
            recovered_name: None,
        }
    }
}

/// Classifies `data` by its leading bytes. Never fails; unknown data is `bin`.
pub fn classify(data: &[u8]) -> Sniff {
    let Some(head) = data.get(..4) else {
        return Sniff::plain("bin");
    };

    if let Some(&(_, ext)) = MAGIC4.iter().find(|(magic, _)| head == magic.as_slice()) {
        if ext == EMBEDDED_OBJECT {
            return Sniff {
                extension: ext,
                recovered_name: embedded_name(data),
            };
        }
        return Sniff::plain(ext);
    }

    if &head[1..4] == b"PNG" {
        return Sniff::plain("png");
    }
    if &head[..2] == b"BM" {
        return Sniff::plain("bmp");
    }
    if head == BINARY_MARKER {
        return Sniff::plain("bin");
    }

    let probe = &data[..data.len().min(TEXT_PROBE_LEN)];
    if probe.iter().all(|&b| is_text_byte(b)) {
        Sniff::plain("txt")
    } else {
        Sniff::plain("bin")
    }
}

fn is_printable(b: u8) -> bool {
    (32..=126).contains(&b)
}

fn is_text_byte(b: u8) -> bool {
    is_printable(b) || matches!(b, b'\t' | b'\n' | b'\r')
}

/// The printable run starting at the name offset, trimmed; `None` if empty.
fn embedded_name(data: &[u8]) -> Option<String> {
    let tail = data.get(EMBEDDED_NAME_OFFSET..)?;
    let run: String = tail
        .iter()
        .take_while(|&&b| is_printable(b))
        .map(|&b| b as char)
        .collect();

    let name = run.trim();
    (!name.is_empty()).then(|| name.to_string())
}
