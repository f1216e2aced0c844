use crate::extractor::zip_entries;
use crate::models::{Document, DocumentFormat};
use crate::IngestError;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

const RESUME_EXTENSIONS: [&str; 4] = ["pdf", "docx", "txt", "zip"];

pub fn discover_resume_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_resume = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                RESUME_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            });

        if is_resume {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub fn load_document(path: &Path) -> Result<Document, IngestError> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| IngestError::MissingFileName(path.display().to_string()))?;

    let bytes = fs::read(path)?;
    Ok(Document::new(name, bytes))
}

/// Loads the given files, replacing each ZIP archive with the resumes it
/// contains. An archive that cannot be opened stays a single document so it
/// is reported as unreadable rather than dropped. Repeated names are made
/// unique with [`disambiguate_filenames`].
pub fn load_documents(paths: &[PathBuf]) -> Result<Vec<Document>, IngestError> {
    let mut documents = Vec::new();

    for path in paths {
        let document = load_document(path)?;
        if document.format != DocumentFormat::Zip {
            documents.push(document);
            continue;
        }

        match zip_entries(&document.bytes) {
            Ok(entries) if entries.is_empty() => {
                warn!(path = %path.display(), "zip archive has no pdf or docx entries");
            }
            Ok(entries) => documents.extend(entries),
            Err(error) => {
                warn!(path = %path.display(), %error, "zip archive could not be opened");
                documents.push(document);
            }
        }
    }

    disambiguate_filenames(&mut documents);
    Ok(documents)
}

/// Renames the second and later documents sharing a filename to
/// `stem (2).ext`, `stem (3).ext` and so on. The filename is how a candidate
/// is addressed after the run, so it has to be unique within a batch.
pub fn disambiguate_filenames(documents: &mut [Document]) {
    let mut seen = HashSet::new();

    for document in documents.iter_mut() {
        if seen.insert(document.filename.clone()) {
            continue;
        }

        let (stem, extension) = match document.filename.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.contains('/') => {
                (stem.to_string(), format!(".{ext}"))
            }
            _ => (document.filename.clone(), String::new()),
        };

        let mut counter = 2;
        let renamed = loop {
            let candidate = format!("{stem} ({counter}){extension}");
            if !seen.contains(&candidate) {
                break candidate;
            }
            counter += 1;
        };

        info!(from = %document.filename, to = %renamed, "renamed duplicate filename");
        seen.insert(renamed.clone());
        document.filename = renamed;
    }
}

pub fn load_folder(folder: &Path) -> Result<Vec<Document>, IngestError> {
    let files = discover_resume_files(folder);

    if files.is_empty() {
        return Err(IngestError::InvalidArgument(format!(
            "no resume files found in {}",
            folder.display()
        )));
    }

    load_documents(&files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::tests::{build_docx, build_zip};
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn discover_resume_files_is_recursive() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let base = dir.path();
        let nested = base.join("nested");
        fs::create_dir(&nested)?;

        File::create(base.join("a.pdf")).and_then(|mut file| file.write_all(b"%PDF-1.4\n%fake"))?;
        File::create(nested.join("b.DOCX")).and_then(|mut file| file.write_all(b"fake"))?;
        fs::write(base.join("notes.md"), b"# not a resume")?;

        let files = discover_resume_files(base);
        assert_eq!(files.len(), 2);
        Ok(())
    }

    #[test]
    fn loading_fails_without_resumes() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let result = load_folder(dir.path());
        assert!(matches!(result, Err(IngestError::InvalidArgument(_))));
        Ok(())
    }

    #[test]
    fn zip_archives_are_expanded() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let docx = build_docx(&["Experience", "Rust"]);
        let archive = build_zip(&[("one.docx", docx.as_slice()), ("two.pdf", b"%PDF-1.4")]);
        fs::write(dir.path().join("batch.zip"), archive)?;
        fs::write(dir.path().join("solo.txt"), b"Experience\nGo")?;

        let documents = load_folder(dir.path())?;
        let names = documents
            .iter()
            .map(|document| document.filename.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["one.docx", "two.pdf", "solo.txt"]);
        Ok(())
    }

    #[test]
    fn same_named_resumes_get_distinct_filenames() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        for team in ["backend", "frontend", "infra"] {
            let folder = dir.path().join(team);
            fs::create_dir(&folder)?;
            fs::write(folder.join("cv.txt"), format!("Experience\n{team}"))?;
        }

        let documents = load_folder(dir.path())?;
        let names = documents
            .iter()
            .map(|document| document.filename.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["cv.txt", "cv (2).txt", "cv (3).txt"]);
        assert!(documents
            .iter()
            .all(|document| document.format == DocumentFormat::Text));
        Ok(())
    }

    #[test]
    fn disambiguation_skips_names_already_taken() {
        let mut documents = vec![
            Document::new("cv.pdf", Vec::new()),
            Document::new("cv (2).pdf", Vec::new()),
            Document::new("cv.pdf", Vec::new()),
            Document::new("resumes/cv.pdf", Vec::new()),
        ];

        disambiguate_filenames(&mut documents);

        let names = documents
            .iter()
            .map(|document| document.filename.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["cv.pdf", "cv (2).pdf", "cv (3).pdf", "resumes/cv.pdf"]);
    }

    #[test]
    fn corrupt_zip_is_kept_as_one_document() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("broken.zip");
        fs::write(&path, b"PK but not really")?;

        let documents = load_documents(&[path])?;
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].filename, "broken.zip");
        Ok(())
    }
}
