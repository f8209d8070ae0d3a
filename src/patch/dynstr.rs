//! The dynamic string table editor.
//!
//! Strings inside `DT_STRTAB` are never rewritten in place: `DT_NEEDED`,
//! `DT_SONAME`, `DT_RUNPATH` and friends all index into it and may alias
//! each other, so the table only ever grows, relocated as one block. That
//! keeps every pre-existing index valid.

use std::collections::BTreeMap;

use log::{debug, trace};

use crate::elf::dynamic::{self, Dyn};
use crate::elf::program_header::ProgramHeader;
use crate::elf::section_header::{SHT_STRTAB, SectionHeader};
use crate::elf::Elf;
use crate::error::{Error, Result};
use crate::patch::mm::MemoryManager;

/// A queued append: `dest` is the dynamic-array index whose `d_val` receives
/// the final in-table index once the extended table is laid out
#[derive(Debug)]
struct StringRequest {
    string: String,
    dest: usize,
}

#[derive(Debug)]
pub struct DynstrEditor<'a> {
    /// The reconstructed table bytes, when the input has a `DT_STRTAB`
    table: Option<&'a [u8]>,
    vaddr: Option<u64>,
    requests: Vec<StringRequest>,
}

/// Finds `string` followed by a NUL inside `table`. Substring matches count:
/// ELF string tables routinely share the tail of a longer entry.
fn find_string(table: &[u8], string: &str) -> Option<usize> {
    let mut needle = Vec::with_capacity(string.len() + 1);
    needle.extend_from_slice(string.as_bytes());
    needle.push(0);
    if needle.len() > table.len() {
        return None;
    }
    table.windows(needle.len()).position(|window| window == needle)
}

impl<'a> DynstrEditor<'a> {
    pub fn new(elf: &Elf<'a>) -> DynstrEditor<'a> {
        DynstrEditor {
            table: elf.dyn_strtab_bytes(),
            vaddr: elf.dyn_val(dynamic::DT_STRTAB),
            requests: Vec::new(),
        }
    }

    /// Resolves `string` against the existing table, patching `dyns[dest]`
    /// immediately on a hit, or queues it for the appended extension
    pub fn request(&mut self, string: &str, dest: usize, dyns: &mut [Dyn]) {
        if let Some(table) = self.table {
            if let Some(index) = find_string(table, string) {
                trace!("found {:?} in the dynamic strtab at index {}", string, index);
                dyns[dest].d_val = index as u64;
                return;
            }
        }
        trace!("queueing {:?} for the dynamic strtab extension", string);
        self.requests.push(StringRequest {
            string: string.to_string(),
            dest,
        });
    }

    /// Lays out the extended table, patches every queued destination with its
    /// final index, and retargets `DT_STRTAB`/`DT_STRSZ` and the `.dynstr`
    /// section header at the relocated table
    pub fn finalize(
        &mut self,
        mm: &mut MemoryManager,
        phdrs: &[ProgramHeader],
        dyns: &mut [Dyn],
        shdrs: &mut [SectionHeader],
        shdr_touched: &mut [bool],
        inline: &mut BTreeMap<u64, Vec<u8>>,
    ) -> Result<()> {
        if self.requests.is_empty() {
            return Ok(());
        }
        let table = self.table.ok_or_else(|| {
            Error::Malformed("cannot extend the dynamic strtab: no DT_STRTAB entry".into())
        })?;
        let need = self
            .requests
            .iter()
            .fold(table.len() as u64, |need, request| {
                need + request.string.len() as u64 + 1
            });
        let region = mm.malloc(need, phdrs)?;
        let mut extended = table.to_vec();
        for request in &self.requests {
            if find_string(&extended, &request.string).is_none() {
                extended.extend_from_slice(request.string.as_bytes());
                extended.push(0);
            }
        }
        for request in &self.requests {
            let index = find_string(&extended, &request.string).ok_or_else(|| {
                Error::Malformed(format!("appended string {:?} vanished", request.string))
            })?;
            dyns[request.dest].d_val = index as u64;
        }
        if let Some(i) = dyns.iter().position(|d| d.d_tag == dynamic::DT_STRTAB) {
            dyns[i].d_val = region.vaddr;
        }
        if let Some(i) = dyns.iter().position(|d| d.d_tag == dynamic::DT_STRSZ) {
            dyns[i].d_val = extended.len() as u64;
        }
        if let Some(vaddr) = self.vaddr {
            if let Some(i) = shdrs
                .iter()
                .position(|shdr| shdr.sh_type == SHT_STRTAB && shdr.sh_addr == vaddr && shdr.sh_addr != 0)
            {
                shdrs[i].sh_offset = region.offset;
                shdrs[i].sh_addr = region.vaddr;
                shdrs[i].sh_size = extended.len() as u64;
                shdr_touched[i] = true;
            }
        }
        debug!(
            "dynamic strtab grown from {} to {} bytes, relocated to offset 0x{:x}",
            table.len(),
            extended.len(),
            region.offset
        );
        inline.insert(region.offset, extended);
        self.requests.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::find_string;

    #[test]
    fn finds_whole_and_suffix_matches() {
        let table = b"\0libselinux.so.1\0libc.so.6\0";
        assert_eq!(find_string(table, "libselinux.so.1"), Some(1));
        assert_eq!(find_string(table, "libc.so.6"), Some(17));
        // the tail of an existing entry is a valid string on its own
        assert_eq!(find_string(table, "so.6"), Some(22));
        assert_eq!(find_string(table, ""), Some(0));
        assert_eq!(find_string(table, "libm.so.6"), None);
    }

    #[test]
    fn needle_longer_than_table() {
        assert_eq!(find_string(b"\0", "libc.so.6"), None);
    }
}
