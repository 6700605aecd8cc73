use std::ffi::{OsStr, OsString};
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// Move `path` into `<parent>/<dir_name>/`, keeping its base name when free.
///
/// The destination is created exclusively (hard link, or copy when linking is
/// not possible) before the source is unlinked, so the file is always
/// reachable under at least one name and an existing quarantined file is
/// never overwritten. On any failure the file stays at `path`.
pub fn quarantine(path: &Path, dir_name: &str) -> io::Result<PathBuf> {
    let (Some(parent), Some(file_name)) = (path.parent(), path.file_name()) else {
        return Err(io::Error::new(
            ErrorKind::InvalidInput,
            format!("{} has no parent directory", path.display()),
        ));
    };

    let dir = parent.join(dir_name);
    // Tolerates a sibling worker creating the same directory concurrently.
    fs::create_dir_all(&dir)?;

    for attempt in 0..MAX_NAME_ATTEMPTS {
        let destination = dir.join(candidate_name(file_name, attempt));
        match place(path, &destination) {
            Ok(()) => {
                release_source(path, &destination)?;
                return Ok(destination);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }

    Err(io::Error::new(
        ErrorKind::AlreadyExists,
        format!(
            "no free name for {} in {}",
            file_name.to_string_lossy(),
            dir.display()
        ),
    ))
}

/// `name.ext`, `name (1).ext`, `name (2).ext`, ...
fn candidate_name(file_name: &OsStr, attempt: u32) -> OsString {
    if attempt == 0 {
        return file_name.to_os_string();
    }

    let as_path = Path::new(file_name);
    let mut name = as_path
        .file_stem()
        .map(OsStr::to_os_string)
        .unwrap_or_else(|| file_name.to_os_string());
    name.push(format!(" ({})", attempt));
    if let Some(ext) = as_path.extension() {
        name.push(".");
        name.push(ext);
    }
    name
}

fn place(source: &Path, destination: &Path) -> io::Result<()> {
    match fs::hard_link(source, destination) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(e),
        Err(e) => {
            debug!(
                "Hard link {} -> {} failed ({}), copying instead",
                source.display(),
                destination.display(),
                e
            );
            copy_exclusive(source, destination)
        }
    }
}

fn copy_exclusive(source: &Path, destination: &Path) -> io::Result<()> {
    let mut reader = File::open(source)?;
    let mut writer = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(destination)?;

    let copied = io::copy(&mut reader, &mut writer).and_then(|_| writer.sync_all());
    if let Err(e) = copied {
        drop(writer);
        if let Err(cleanup) = fs::remove_file(destination) {
            warn!(
                "Failed to remove partial copy {}: {}",
                destination.display(),
                cleanup
            );
        }
        return Err(e);
    }

    let permissions = reader
        .metadata()
        .and_then(|metadata| fs::set_permissions(destination, metadata.permissions()));
    if let Err(e) = permissions {
        debug!(
            "Could not copy permissions of {} to {}: {}",
            source.display(),
            destination.display(),
            e
        );
    }
    Ok(())
}

fn release_source(source: &Path, destination: &Path) -> io::Result<()> {
    if let Err(e) = fs::remove_file(source) {
        // Roll back so the file lives only at its original path.
        if let Err(cleanup) = fs::remove_file(destination) {
            warn!(
                "Failed to roll back {} after unlink error: {}",
                destination.display(),
                cleanup
            );
        }
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_candidate_names() {
        let name = OsStr::new("photo.jpg");
        assert_eq!(candidate_name(name, 0), OsString::from("photo.jpg"));
        assert_eq!(candidate_name(name, 1), OsString::from("photo (1).jpg"));
        assert_eq!(candidate_name(name, 12), OsString::from("photo (12).jpg"));
        assert_eq!(candidate_name(OsStr::new("README"), 2), OsString::from("README (2)"));
        assert_eq!(candidate_name(OsStr::new(".bashrc"), 1), OsString::from(".bashrc (1)"));
    }

    #[test]
    fn test_moves_into_sibling_directory() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("a.txt");
        fs::write(&file, "X").unwrap();

        let dest = quarantine(&file, "duplicate_to_be_deleted").unwrap();
        assert_eq!(dest, tmp.path().join("duplicate_to_be_deleted").join("a.txt"));
        assert!(!file.exists());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "X");
    }

    #[test]
    fn test_never_overwrites_existing_quarantined_file() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("duplicate_to_be_deleted");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("a.txt"), "earlier").unwrap();

        let file = tmp.path().join("a.txt");
        fs::write(&file, "later").unwrap();

        let dest = quarantine(&file, "duplicate_to_be_deleted").unwrap();
        assert_eq!(dest, dir.join("a (1).txt"));
        assert_eq!(fs::read_to_string(dir.join("a.txt")).unwrap(), "earlier");
        assert_eq!(fs::read_to_string(&dest).unwrap(), "later");
        assert!(!file.exists());
    }

    #[test]
    fn test_missing_source_leaves_nothing_behind() {
        let tmp = tempdir().unwrap();
        let err = quarantine(&tmp.path().join("ghost.txt"), "q").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!tmp.path().join("q").join("ghost.txt").exists());
    }

    #[test]
    fn test_copy_exclusive_refuses_existing_destination() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("src.bin");
        let dst = tmp.path().join("dst.bin");
        fs::write(&src, "new").unwrap();
        fs::write(&dst, "old").unwrap();

        let err = copy_exclusive(&src, &dst).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(&dst).unwrap(), "old");
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_exclusive_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempdir().unwrap();
        let src = tmp.path().join("script.sh");
        let dst = tmp.path().join("script copy.sh");
        fs::write(&src, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&src, fs::Permissions::from_mode(0o750)).unwrap();

        copy_exclusive(&src, &dst).unwrap();
        let mode = fs::metadata(&dst).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o750);
    }

    #[test]
    fn test_copy_exclusive_copies_content() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("src.bin");
        let dst = tmp.path().join("dst.bin");
        fs::write(&src, vec![7u8; 10_000]).unwrap();

        copy_exclusive(&src, &dst).unwrap();
        assert_eq!(fs::read(&dst).unwrap(), vec![7u8; 10_000]);
        assert!(src.exists());
    }
}
