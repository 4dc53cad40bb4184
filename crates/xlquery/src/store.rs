//! Workbook persistence

use std::path::{Path, PathBuf};

use xlquery_core::{Result, Workbook};

use crate::WorkbookExt;

/// Where a finished run saves its workbook
pub trait WorkbookStore {
    fn save(&mut self, workbook: &Workbook) -> Result<()>;
}

impl<S: WorkbookStore + ?Sized> WorkbookStore for &mut S {
    fn save(&mut self, workbook: &Workbook) -> Result<()> {
        (**self).save(workbook)
    }
}

/// Saves back to a file, format chosen by extension
#[derive(Debug, Clone)]
pub struct XlsxFileStore {
    path: PathBuf,
}

impl XlsxFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl WorkbookStore for XlsxFileStore {
    fn save(&mut self, workbook: &Workbook) -> Result<()> {
        workbook.save(&self.path)
    }
}
