pub const REFERENCE_EXTENSIONS: [&str; 4] = ["pdf", "docx", "md", "txt"];

pub fn file_extension(file_name: &str) -> String {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default()
}

pub fn is_reference_extension(ext: &str) -> bool {
    REFERENCE_EXTENSIONS.contains(&ext)
}

/// Rejects filenames that could escape the reference documents directory.
pub fn validate_filename(file_name: &str) -> Result<(), String> {
    if file_name.trim().is_empty() {
        return Err("filename must not be empty".to_string());
    }
    if file_name.contains('/') || file_name.contains('\\') || file_name.contains("..") {
        return Err("filename must not contain path separators".to_string());
    }
    Ok(())
}

/// Extracts text from an uploaded file for use as generation context.
/// Markdown and plain text are decoded in-process. Binary document formats
/// are not parsed here and are rejected with a descriptive error.
pub fn extract_text(file_name: &str, bytes: &[u8]) -> Result<(String, String), String> {
    let ext = file_extension(file_name);
    match ext.as_str() {
        "md" | "markdown" | "txt" => {
            let text = String::from_utf8(bytes.to_vec())
                .map_err(|_| format!("file '{file_name}' is not valid UTF-8 text"))?;
            Ok((text, ext))
        }
        "pdf" | "docx" | "doc" => Err(format!(
            "cannot extract text from '.{ext}' files in the generation path; upload markdown or plain text"
        )),
        _ => Err(format!("unsupported file type '.{ext}'")),
    }
}
