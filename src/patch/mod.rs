//! The patching facade. A [`Patcher`] records the requested edits; `save`
//! re-opens the input, routes each edit through the interpreter and
//! dynamic-segment editors, lets the memory manager place whatever did not
//! fit, and materializes the output.

pub mod mm;

mod dynamic;
mod dynstr;
mod interp;
mod writer;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use scroll::Pwrite;
use scroll::ctx::SizeWith;

use crate::elf::dynamic::{DT_RPATH, DT_RUNPATH, DT_SONAME, tag_to_str};
use crate::elf::program_header::PT_INTERP;
use crate::elf::{Dyn, Elf, Header, ProgramHeader, SectionHeader};
use crate::error::{Error, Result};

use self::dynstr::DynstrEditor;
use self::mm::MemoryManager;

/// Rewrites the installed fields of an ELF binary: the program interpreter,
/// the shared-object name, and the runtime library search path.
///
/// Setters accumulate; nothing touches the file until [`save`](Patcher::save)
/// or [`save_to`](Patcher::save_to), and each save re-opens the input so
/// repeated saves from one `Patcher` are independent.
#[derive(Debug)]
pub struct Patcher {
    path: PathBuf,
    interpreter: Option<String>,
    soname: Option<String>,
    runpath: Option<String>,
    force_rpath: bool,
    has_interp: bool,
    has_soname: bool,
}

impl Patcher {
    /// Opens `path` and validates that it parses as an ELF image
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Patcher> {
        let path = path.as_ref().to_path_buf();
        let data = fs::read(&path)?;
        let elf = Elf::parse(&data)?;
        Ok(Patcher {
            has_interp: elf
                .program_headers
                .iter()
                .any(|phdr| phdr.p_type == PT_INTERP),
            has_soname: elf.dyn_position(DT_SONAME).is_some(),
            path,
            interpreter: None,
            soname: None,
            runpath: None,
            force_rpath: false,
        })
    }

    /// Records the desired interpreter; discarded with a warning when the
    /// input has no `PT_INTERP` segment
    pub fn set_interpreter(&mut self, interpreter: &str) -> Result<()> {
        if interpreter.is_empty() {
            return Err(Error::Malformed("the interpreter path cannot be empty".into()));
        }
        if !self.has_interp {
            warn!("Entry PT_INTERP not found, not a dynamic executable?");
            return Ok(());
        }
        self.interpreter = Some(interpreter.to_string());
        Ok(())
    }

    /// Records the desired soname; discarded with a warning when the input
    /// has no `DT_SONAME` entry
    pub fn set_soname(&mut self, soname: &str) -> Result<()> {
        if soname.is_empty() {
            return Err(Error::Malformed("the soname cannot be empty".into()));
        }
        if !self.has_soname {
            warn!("Entry DT_SONAME not found, not a shared library?");
            return Ok(());
        }
        self.soname = Some(soname.to_string());
        Ok(())
    }

    /// Records the desired library search path; the dynamic entry is created
    /// on save when the input has none
    pub fn set_runpath(&mut self, runpath: &str) -> Result<()> {
        self.runpath = Some(runpath.to_string());
        Ok(())
    }

    /// Switches all subsequent search-path reads and writes from
    /// `DT_RUNPATH` to the older `DT_RPATH`. Sticky.
    pub fn use_rpath(&mut self) {
        self.force_rpath = true;
    }

    fn runpath_tag(&self) -> u64 {
        if self.force_rpath { DT_RPATH } else { DT_RUNPATH }
    }

    /// The pending interpreter if one was set, else the one installed in the
    /// input; `None` (after a warning) when the input has no `PT_INTERP`
    pub fn interpreter(&self) -> Result<Option<String>> {
        if let Some(pending) = &self.interpreter {
            return Ok(Some(pending.clone()));
        }
        let data = fs::read(&self.path)?;
        let elf = Elf::parse(&data)?;
        match elf.interpreter() {
            Some(interp) => Ok(Some(interp.to_string())),
            None => {
                warn!("Entry PT_INTERP not found, not a dynamic executable?");
                Ok(None)
            }
        }
    }

    /// The pending soname if one was set, else the installed `DT_SONAME`
    pub fn soname(&self) -> Result<Option<String>> {
        if let Some(pending) = &self.soname {
            return Ok(Some(pending.clone()));
        }
        let data = fs::read(&self.path)?;
        let elf = Elf::parse(&data)?;
        match elf.soname() {
            Some(soname) => Ok(Some(soname.to_string())),
            None => {
                warn!("Entry DT_SONAME not found, not a shared library?");
                Ok(None)
            }
        }
    }

    /// The pending search path if one was set, else the installed
    /// `DT_RUNPATH` (or `DT_RPATH` after [`use_rpath`](Patcher::use_rpath))
    pub fn runpath(&self) -> Result<Option<String>> {
        if let Some(pending) = &self.runpath {
            return Ok(Some(pending.clone()));
        }
        let tag = self.runpath_tag();
        let data = fs::read(&self.path)?;
        let elf = Elf::parse(&data)?;
        match elf.library_path(tag) {
            Some(path) => Ok(Some(path.to_string())),
            None => {
                warn!("Entry {} not found", tag_to_str(tag));
                Ok(None)
            }
        }
    }

    /// The installed `DT_NEEDED` names, in order. There is no setter: the
    /// dependency list is never modified by this crate.
    pub fn needed(&self) -> Result<Vec<String>> {
        let data = fs::read(&self.path)?;
        let elf = Elf::parse(&data)?;
        Ok(elf.needed().iter().map(|lib| lib.to_string()).collect())
    }

    /// Applies the pending edits over the input file in place. A no-op when
    /// nothing is pending.
    pub fn save(&self) -> Result<()> {
        if self.interpreter.is_none() && self.soname.is_none() && self.runpath.is_none() {
            return Ok(());
        }
        self.save_inner(None)
    }

    /// Applies the pending edits, writing the result to `output`; with no
    /// pending edits this degrades to a plain copy
    pub fn save_to<P: AsRef<Path>>(&self, output: P) -> Result<()> {
        self.save_inner(Some(output.as_ref()))
    }

    fn save_inner(&self, output: Option<&Path>) -> Result<()> {
        let out_path = output.unwrap_or(&self.path);
        let data = fs::read(&self.path)?;
        let elf = Elf::parse(&data)?;
        let mut saver = Saver::new(&elf);
        if let Some(interpreter) = &self.interpreter {
            saver.patch_interpreter(interpreter)?;
        }
        if let Some(soname) = &self.soname {
            saver.patch_soname(soname)?;
        }
        if let Some(runpath) = &self.runpath {
            saver.patch_library_path(runpath, self.runpath_tag())?;
        }
        saver.finalize()?;
        let out = writer::materialize(&data, &saver.mm, &saver.patches, &saver.inline)?;
        fs::write(out_path, &out)?;
        fs::set_permissions(out_path, fs::metadata(&self.path)?.permissions())?;
        debug!("wrote {} bytes to {}", out.len(), out_path.display());
        Ok(())
    }
}

/// Per-save working state: mutable copies of the header tables and the
/// dynamic array, the editors that rewrite them, and the two patch streams
/// the writer applies. Rebuilt from a fresh parse on every save.
pub(crate) struct Saver<'a> {
    pub(crate) elf: &'a Elf<'a>,
    pub(crate) header: Header,
    pub(crate) phdrs: Vec<ProgramHeader>,
    pub(crate) phdr_touched: Vec<bool>,
    pub(crate) shdrs: Vec<SectionHeader>,
    pub(crate) shdr_touched: Vec<bool>,
    pub(crate) dyns: Vec<Dyn>,
    pub(crate) has_dynamic: bool,
    pub(crate) appended_dyns: usize,
    pub(crate) dyn_dirty: bool,
    pub(crate) dynstr: DynstrEditor<'a>,
    pub(crate) mm: MemoryManager,
    /// Header rewrites keyed at pre-extension file positions
    pub(crate) patches: BTreeMap<u64, Vec<u8>>,
    /// Memory-manager placed writes keyed at final file positions
    pub(crate) inline: BTreeMap<u64, Vec<u8>>,
    pub(crate) changed: bool,
}

impl<'a> Saver<'a> {
    fn new(elf: &'a Elf<'a>) -> Saver<'a> {
        let phdrs = elf.program_headers.clone();
        let shdrs = elf.section_headers.clone();
        Saver {
            header: elf.header,
            mm: MemoryManager::new(&phdrs),
            phdr_touched: vec![false; phdrs.len()],
            shdr_touched: vec![false; shdrs.len()],
            dyns: elf.dynamic.clone().unwrap_or_default(),
            has_dynamic: elf.dynamic.is_some(),
            dynstr: DynstrEditor::new(elf),
            elf,
            phdrs,
            shdrs,
            appended_dyns: 0,
            dyn_dirty: false,
            patches: BTreeMap::new(),
            inline: BTreeMap::new(),
            changed: false,
        }
    }

    /// Runs the back half of the save pipeline. Order matters: the strtab
    /// extension is allocated and its indices resolved before the dynamic
    /// array serializes, and untouched headers shift only after every editor
    /// has claimed the ones it retargeted.
    fn finalize(&mut self) -> Result<()> {
        self.dynstr.finalize(
            &mut self.mm,
            &self.phdrs,
            &mut self.dyns,
            &mut self.shdrs,
            &mut self.shdr_touched,
            &mut self.inline,
        )?;
        self.materialize_dynamic()?;
        self.mm.dispatch(&mut self.phdrs, &mut self.phdr_touched)?;
        if self.mm.extended() {
            if let Some(threshold) = self.mm.threshold() {
                let extend = self.mm.extend_size();
                for (phdr, touched) in self.phdrs.iter_mut().zip(&self.phdr_touched) {
                    if !*touched && phdr.p_offset >= threshold {
                        phdr.p_offset += extend;
                    }
                }
                for (shdr, touched) in self.shdrs.iter_mut().zip(&self.shdr_touched) {
                    if !*touched && shdr.sh_offset >= threshold {
                        shdr.sh_offset += extend;
                    }
                }
                if self.header.e_phoff >= threshold {
                    self.header.e_phoff += extend;
                }
                if self.header.e_shoff >= threshold {
                    self.header.e_shoff += extend;
                }
            }
        }
        if !self.changed {
            return Ok(());
        }
        let ctx = self.elf.ctx;
        let mut ehdr = vec![0u8; Header::size_with(&ctx)];
        ehdr.pwrite_with(self.header, 0, ctx)?;
        self.patches.insert(0, ehdr);
        if !self.phdrs.is_empty() {
            let mut buf = vec![0u8; ProgramHeader::size_with(&ctx) * self.phdrs.len()];
            let offset = &mut 0;
            for phdr in &self.phdrs {
                buf.gwrite_with(*phdr, offset, ctx)?;
            }
            self.patches.insert(self.elf.header.e_phoff, buf);
        }
        if !self.shdrs.is_empty() {
            let mut buf = vec![0u8; SectionHeader::size_with(&ctx) * self.shdrs.len()];
            let offset = &mut 0;
            for shdr in &self.shdrs {
                buf.gwrite_with(*shdr, offset, ctx)?;
            }
            self.patches.insert(self.elf.header.e_shoff, buf);
        }
        Ok(())
    }
}
