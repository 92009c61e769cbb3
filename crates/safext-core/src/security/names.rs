//! File name legality.
//!
//! Two levels of strictness: entry names from archives only have to be
//! representable on the host, while names the engine invents for
//! decompressed output must pass the full portable rule set.

use crate::ExtractionError;
use crate::Result;
use crate::error::NameViolation;

const MAX_NAME_LEN: usize = 255;

const WINDOWS_FORBIDDEN: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

const WINDOWS_RESERVED: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Whether `segment` is a Windows device name, with or without extension.
#[must_use]
pub fn is_windows_reserved(segment: &str) -> bool {
    let stem = segment.split('.').next().unwrap_or(segment).trim_end();
    WINDOWS_RESERVED
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(stem))
}

fn windows_violation(segment: &str) -> Option<NameViolation> {
    if is_windows_reserved(segment) {
        return Some(NameViolation::ReservedName);
    }
    segment
        .chars()
        .find(|c| WINDOWS_FORBIDDEN.contains(c))
        .map(NameViolation::ForbiddenCharacter)
}

/// Checks an archive entry name (a `/`-separated path) for characters the
/// host cannot represent.
///
/// # Errors
///
/// `IllegalName` with the first violation found.
pub fn check_entry_name(name: &str) -> Result<()> {
    let illegal = |reason| ExtractionError::IllegalName {
        name: name.to_owned(),
        reason,
    };
    if name.contains('\0') {
        return Err(illegal(NameViolation::NulByte));
    }
    if cfg!(windows) {
        for segment in name.split('/').filter(|s| !matches!(*s, "" | "." | "..")) {
            if segment.chars().any(char::is_control) {
                return Err(illegal(NameViolation::ControlCharacter));
            }
            if let Some(violation) = windows_violation(segment) {
                return Err(illegal(violation));
            }
        }
    }
    Ok(())
}

/// Strict check for a single generated file name.
///
/// Rejects empty names, dot entries, names over 255 bytes, control
/// characters (NUL, CR, LF, TAB...), anything outside printable ASCII, and
/// on Windows reserved device names and forbidden characters.
///
/// # Errors
///
/// The first violation found.
pub fn check_output_name(name: &str) -> std::result::Result<(), NameViolation> {
    if name.is_empty() {
        return Err(NameViolation::Empty);
    }
    if name == "." || name == ".." {
        return Err(NameViolation::DotName);
    }
    if name.len() > MAX_NAME_LEN {
        return Err(NameViolation::TooLong(name.len()));
    }
    if name.contains('\0') {
        return Err(NameViolation::NulByte);
    }
    if name.chars().any(char::is_control) {
        return Err(NameViolation::ControlCharacter);
    }
    if !name.is_ascii() {
        return Err(NameViolation::NonAscii);
    }
    if name.contains('/') {
        return Err(NameViolation::ForbiddenCharacter('/'));
    }
    if cfg!(windows)
        && let Some(violation) = windows_violation(name)
    {
        return Err(violation);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_name_nul_is_rejected() {
        let err = check_entry_name("a\0b").unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::IllegalName {
                reason: NameViolation::NulByte,
                ..
            }
        ));
    }

    #[test]
    fn test_entry_name_ordinary() {
        assert!(check_entry_name("dir/file.txt").is_ok());
        assert!(check_entry_name("../relative").is_ok());
    }

    #[test]
    #[cfg(windows)]
    fn test_entry_name_windows_rules() {
        assert!(check_entry_name("dir/CON.txt").is_err());
        assert!(check_entry_name("a:b").is_err());
    }

    #[test]
    fn test_reserved_names() {
        assert!(is_windows_reserved("CON"));
        assert!(is_windows_reserved("con.txt"));
        assert!(is_windows_reserved("Lpt9"));
        assert!(!is_windows_reserved("console"));
        assert!(!is_windows_reserved("COM10"));
    }

    #[test]
    fn test_output_name_rules() {
        assert_eq!(check_output_name(""), Err(NameViolation::Empty));
        assert_eq!(check_output_name(".."), Err(NameViolation::DotName));
        assert_eq!(
            check_output_name(&"a".repeat(256)),
            Err(NameViolation::TooLong(256))
        );
        assert_eq!(check_output_name("a\nb"), Err(NameViolation::ControlCharacter));
        assert_eq!(check_output_name("a\tb"), Err(NameViolation::ControlCharacter));
        assert_eq!(check_output_name("a\0b"), Err(NameViolation::NulByte));
        assert_eq!(check_output_name("caf\u{e9}"), Err(NameViolation::NonAscii));
        assert!(check_output_name("report.tar").is_ok());
        assert!(check_output_name(&"a".repeat(255)).is_ok());
    }
}
