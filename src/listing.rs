//! UNIX `ls -l`-style directory listing lines, as legacy FTP clients expect
//! from LIST.
//!
//! Grounded on the original's `fileStat`/`dirList` helpers: fixed mode
//! string (no real permission bits are tracked by the storage layer), a
//! 12-character right-aligned size field, and `Jan _2 15:04` timestamps.
use chrono::Datelike;

use crate::storage::Object;

const DIR_MODE: &str = "d---------";
const FILE_MODE: &str = "-rwxrwxrwx";

/// Renders one `LIST`-style line for `object`. Does not include the
/// trailing CRLF; the caller joins lines with CRLF per spec.
pub fn format_entry(object: &Object) -> String {
    let mode = if object.metadata.is_dir() { DIR_MODE } else { FILE_MODE };
    let modified = object.metadata.modified;
    format!(
        "{mode} 1 ftp ftp {size:>12} {month} {day:>2} {hm} {name}",
        mode = mode,
        size = object.metadata.len,
        month = modified.format("%b"),
        day = modified.day(),
        hm = modified.format("%H:%M"),
        name = object.file_name(),
    )
}

/// Renders a full listing body: entries separated by CRLF, terminated by a
/// trailing CRLF before the transfer closes.
pub fn format_listing(objects: &[Object]) -> String {
    let mut out = String::new();
    for object in objects {
        out.push_str(&format_entry(object));
        out.push_str("\r\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ObjectKind, ObjectMetadata};
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn object(name: &str, kind: ObjectKind, len: u64) -> Object {
        Object {
            path: PathBuf::from(format!("/{name}")),
            metadata: ObjectMetadata {
                kind,
                len,
                modified: fixed_timestamp(),
            },
        }
    }

    fn fixed_timestamp() -> chrono::DateTime<chrono::Utc> {
        chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn directory_entry_uses_fixed_mode_and_zero_length() {
        let o = object("test", ObjectKind::Directory, 0);
        let line = format_entry(&o);
        assert_eq!(line, "d--------- 1 ftp ftp            0 Jan  1 00:00 test");
    }

    #[test]
    fn file_entry_uses_rwx_mode_and_real_length() {
        let o = object("data.bin", ObjectKind::File, 42);
        let line = format_entry(&o);
        assert!(line.starts_with("-rwxrwxrwx"));
        assert!(line.contains("42"));
        assert!(line.ends_with("data.bin"));
    }

    #[test]
    fn listing_is_crlf_separated_and_terminated() {
        let objects = vec![object("a", ObjectKind::File, 1), object("b", ObjectKind::File, 2)];
        let body = format_listing(&objects);
        assert_eq!(body.matches("\r\n").count(), 2);
        assert!(body.ends_with("\r\n"));
    }
}
