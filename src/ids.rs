//! Stable identifiers shared by the content store and the Crowdin side.

use sha2::{Digest, Sha256};

pub const DRAFTS_PREFIX: &str = "drafts.";
pub const PTD_ID_PREFIX: &str = "crowdin.ptd";
pub const ROOT_PATH: &str = "__root";

pub fn undraft_id(id: &str) -> String {
    id.replacen(DRAFTS_PREFIX, "", 1)
}

pub fn draft_id(id: &str) -> String {
    format!("{}{}", DRAFTS_PREFIX, undraft_id(id))
}

pub fn is_draft(id: &str) -> bool {
    undraft_id(id) != id
}

/// Id of the preview/temporary document for one target language.
pub fn ptd_id(target_language_id: &str, source_doc_id: &str) -> String {
    format!(
        "{}-{}-{}",
        PTD_ID_PREFIX,
        target_language_id.to_lowercase(),
        source_doc_id
    )
}

pub fn is_ptd_id(id: &str) -> bool {
    undraft_id(id).starts_with(PTD_ID_PREFIX)
}

/// Makes a string usable as a document `_id` or an array item `_key`.
pub fn make_key_and_id_friendly(value: &str) -> String {
    let replaced: String = value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();

    // Only the first run of repeated underscores is collapsed.
    let bytes = replaced.as_bytes();
    let mut start = None;
    for i in 1..bytes.len() {
        if bytes[i] == b'_' && bytes[i - 1] == b'_' {
            start = Some(i - 1);
            break;
        }
    }

    match start {
        Some(start) => {
            let end = replaced[start..]
                .find(|c: char| c != '_')
                .map(|offset| start + offset)
                .unwrap_or(replaced.len());
            format!("{}_{}", &replaced[..start], &replaced[end..])
        }
        None => replaced,
    }
}

pub fn path_to_string(path: &[String]) -> String {
    if path.is_empty() {
        return ROOT_PATH.to_string();
    }
    path.join(".")
}

/// Label for one translation job: the first 8 hex chars of a SHA-256 over the
/// changed paths, target languages, document id and revision.
pub fn translation_key(
    doc_id: &str,
    rev: &str,
    diff_paths: &[Vec<String>],
    target_langs: &[String],
) -> String {
    let templated = diff_paths
        .iter()
        .map(|path| path_to_string(path))
        .chain(target_langs.iter().cloned())
        .chain(std::iter::once(doc_id.replacen('.', "_", 1)))
        .chain(std::iter::once(rev.to_string()))
        .map(|part| make_key_and_id_friendly(&part))
        .collect::<Vec<_>>()
        .join("__");

    let digest = Sha256::digest(templated.as_bytes());
    digest
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect::<String>()[..8]
        .to_string()
}

/// Crowdin source files are named `<uuid>--<document id>.html`.
pub fn source_file_name(unique: &str, storage_file_name: &str) -> String {
    format!("{}--{}.html", unique, storage_file_name)
}

/// Everything after the first `--`; document ids may contain `--` themselves.
pub fn id_from_source_file_name(file_name: &str) -> String {
    let doc_id = file_name
        .split_once("--")
        .map(|(_, rest)| rest)
        .unwrap_or_default();
    doc_id.strip_suffix(".html").unwrap_or(doc_id).to_string()
}
