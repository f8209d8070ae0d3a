//! A read-only view over an ELF image: headers, segments, sections, the
//! dynamic array, and the queries the patching layer builds on.

pub mod dynamic;
pub mod header;
pub mod program_header;
pub mod section_header;

pub use dynamic::Dyn;
pub use header::Header;
pub use program_header::ProgramHeader;
pub use section_header::SectionHeader;

use core::str;

use scroll::Pread;
use scroll::ctx::SizeWith;

use crate::container::Ctx;
use crate::error::{Error, Result};
use crate::strtab::Strtab;

/// A parsed ELF binary over borrowed bytes
#[derive(Debug)]
pub struct Elf<'a> {
    pub header: Header,
    pub program_headers: Vec<ProgramHeader>,
    pub section_headers: Vec<SectionHeader>,
    /// The dynamic array, `DT_NULL` terminated, when a `PT_DYNAMIC` segment exists
    pub dynamic: Option<Vec<Dyn>>,
    /// The section-name string table
    pub shdr_strtab: Strtab<'a>,
    pub ctx: Ctx,
    data: &'a [u8],
}

impl<'a> Elf<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Elf<'a>> {
        let (header, ctx) = Header::parse(data)?;
        let program_headers = parse_table::<ProgramHeader>(
            data,
            ctx,
            header.e_phoff,
            header.e_phnum as usize,
            header.e_phentsize as usize,
            "program header",
        )?;
        let section_headers = parse_table::<SectionHeader>(
            data,
            ctx,
            header.e_shoff,
            header.e_shnum as usize,
            header.e_shentsize as usize,
            "section header",
        )?;
        let dynamic = match program_headers
            .iter()
            .find(|phdr| phdr.p_type == program_header::PT_DYNAMIC)
        {
            Some(phdr) => Some(dynamic::parse(data, phdr, ctx)?),
            None => None,
        };
        let shdr_strtab = match section_headers.get(header.e_shstrndx as usize) {
            Some(shdr) => {
                let start = shdr.sh_offset as usize;
                let bytes = data
                    .get(start..start + shdr.sh_size as usize)
                    .ok_or_else(|| {
                        Error::Malformed(format!(
                            "Section-name strtab at 0x{:x} is out of bounds",
                            shdr.sh_offset
                        ))
                    })?;
                Strtab::new(bytes, 0x0)
            }
            None => Strtab::default(),
        };
        Ok(Elf {
            header,
            program_headers,
            section_headers,
            dynamic,
            shdr_strtab,
            ctx,
            data,
        })
    }

    /// The raw bytes this view was parsed from
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Translates a virtual address to a file offset through the covering `PT_LOAD`
    pub fn offset_from_vma(&self, vaddr: u64) -> Option<u64> {
        self.program_headers
            .iter()
            .find(|phdr| {
                phdr.p_type == program_header::PT_LOAD
                    && vaddr >= phdr.p_vaddr
                    && vaddr < phdr.p_vaddr + phdr.p_filesz
            })
            .map(|phdr| vaddr - phdr.p_vaddr + phdr.p_offset)
    }

    /// Finds a section header by name, e.g. `".interp"`
    pub fn section_by_name(&self, name: &str) -> Option<usize> {
        self.section_headers
            .iter()
            .position(|shdr| self.shdr_strtab.get_at(shdr.sh_name as usize) == Some(name))
    }

    /// The `PT_INTERP` contents without the trailing NUL
    pub fn interpreter(&self) -> Option<&'a str> {
        let phdr = self
            .program_headers
            .iter()
            .find(|phdr| phdr.p_type == program_header::PT_INTERP)?;
        let start = phdr.p_offset as usize;
        let bytes = self.data.get(start..start + phdr.p_filesz as usize)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        str::from_utf8(&bytes[..end]).ok()
    }

    /// The position of the first dynamic tag of the given kind
    pub fn dyn_position(&self, tag: u64) -> Option<usize> {
        self.dynamic.as_ref()?.iter().position(|d| d.d_tag == tag)
    }

    /// The value of the first dynamic tag of the given kind
    pub fn dyn_val(&self, tag: u64) -> Option<u64> {
        let dyns = self.dynamic.as_ref()?;
        dyns.iter().find(|d| d.d_tag == tag).map(|d| d.d_val)
    }

    /// Reconstructs the dynamic string table bytes.
    ///
    /// `DT_STRTAB` stores only the start address, so the extent is recovered
    /// by scanning forward while bytes are printable ASCII or NUL. When a
    /// `.dynstr` section header exists its `sh_size` bounds the scan; on a
    /// stripped image the scan alone decides where the table ends and can
    /// overrun into adjacent data that happens to look like text.
    pub fn dyn_strtab_bytes(&self) -> Option<&'a [u8]> {
        let vaddr = self.dyn_val(dynamic::DT_STRTAB)?;
        let start = self.offset_from_vma(vaddr)? as usize;
        let mut limit = self.data.len();
        if let Some(shdr) = self.section_headers.iter().find(|shdr| {
            shdr.sh_type == section_header::SHT_STRTAB && shdr.sh_addr == vaddr && shdr.sh_addr != 0
        }) {
            limit = limit.min(start.saturating_add(shdr.sh_size as usize));
        }
        let mut end = start;
        while end < limit {
            let byte = self.data[end];
            if byte != 0 && !(0x20..0x7f).contains(&byte) {
                break;
            }
            end += 1;
        }
        Some(&self.data[start..end])
    }

    /// Resolves a dynamic-strtab index to its string
    pub fn dyn_string(&self, index: u64) -> Option<&'a str> {
        Strtab::new(self.dyn_strtab_bytes()?, 0x0).get_at(index as usize)
    }

    /// The `DT_SONAME` of a shared library
    pub fn soname(&self) -> Option<&'a str> {
        self.dyn_string(self.dyn_val(dynamic::DT_SONAME)?)
    }

    /// The library search path stored under `tag` (`DT_RUNPATH` or `DT_RPATH`)
    pub fn library_path(&self, tag: u64) -> Option<&'a str> {
        self.dyn_string(self.dyn_val(tag)?)
    }

    /// The `DT_NEEDED` library names, in dynamic-array order
    pub fn needed(&self) -> Vec<&'a str> {
        let mut needed = Vec::new();
        if let Some(dyns) = &self.dynamic {
            for dyn_ in dyns {
                if dyn_.d_tag == dynamic::DT_NEEDED {
                    if let Some(lib) = self.dyn_string(dyn_.d_val) {
                        needed.push(lib);
                    }
                }
            }
        }
        needed
    }
}

fn parse_table<'a, T>(
    data: &'a [u8],
    ctx: Ctx,
    offset: u64,
    count: usize,
    entsize: usize,
    what: &str,
) -> Result<Vec<T>>
where
    T: SizeWith<Ctx> + scroll::ctx::TryFromCtx<'a, Ctx, Error = scroll::Error>,
{
    if count == 0 {
        return Ok(Vec::new());
    }
    let sizeof = T::size_with(&ctx);
    if entsize != sizeof {
        return Err(Error::Malformed(format!(
            "Unsupported {} entry size {} (expected {})",
            what, entsize, sizeof
        )));
    }
    let mut table = Vec::with_capacity(count);
    let offset = &mut (offset as usize);
    for _ in 0..count {
        table.push(data.gread_with::<T>(offset, ctx)?);
    }
    Ok(table)
}
