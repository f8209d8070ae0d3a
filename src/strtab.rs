//! A byte-offset based string table, as used by the dynamic string table and
//! the section-name table in ELF binaries.

use core::str;

/// A string table indexed by byte offset (and not member index).
/// Strings run from the given offset to the next `delim` byte.
#[derive(Debug, Default)]
pub struct Strtab<'a> {
    bytes: &'a [u8],
    delim: u8,
}

impl<'a> Strtab<'a> {
    pub fn new(bytes: &'a [u8], delim: u8) -> Strtab<'a> {
        Strtab { bytes, delim }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Safely gets the string starting at the byte offset `offset`, or `None`
    /// when the offset is out of bounds or the bytes are not UTF-8
    pub fn get_at(&self, offset: usize) -> Option<&'a str> {
        if offset >= self.bytes.len() {
            return None;
        }
        let end = self.bytes[offset..]
            .iter()
            .position(|&b| b == self.delim)
            .map(|i| offset + i)
            .unwrap_or(self.bytes.len());
        str::from_utf8(&self.bytes[offset..end]).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::Strtab;

    #[test]
    fn get_at_resolves_offsets() {
        let bytes = b"\0printf\0memmove\0busta\0";
        let strtab = Strtab::new(bytes, 0x0);
        assert_eq!(strtab.get_at(0), Some(""));
        assert_eq!(strtab.get_at(1), Some("printf"));
        assert_eq!(strtab.get_at(8), Some("memmove"));
        assert_eq!(strtab.get_at(16), Some("busta"));
        // suffix of a longer entry
        assert_eq!(strtab.get_at(11), Some("move"));
    }

    #[test]
    fn get_at_out_of_bounds_is_none() {
        let bytes = b"\0printf\0";
        let strtab = Strtab::new(bytes, 0x0);
        assert_eq!(strtab.get_at(bytes.len()), None);
        assert_eq!(strtab.get_at(usize::MAX), None);
    }

    #[test]
    fn get_at_without_final_null() {
        let bytes = b"\0printf";
        let strtab = Strtab::new(bytes, 0x0);
        assert_eq!(strtab.get_at(1), Some("printf"));
    }
}
