//! 打开文件表

use alloc::vec;
use alloc::vec::Vec;

use derive_more::{Display, From, Into};

use crate::volume::root_dir::{DirEntry, FILENAME_LEN, RootDir};
use crate::{Error, Result};

/// 同时打开的文件数上限
pub const OPEN_FILES_MAX: usize = 32;

/// 文件描述符，即打开文件表的槽位
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, From, Into)]
pub struct Fd(usize);

/// 一次打开。只记录目录项的位置而不持有目录项，
/// 每次使用前都要核对该位置是否还是同一个文件。
#[derive(Debug, Clone)]
pub(crate) struct OpenFile {
    pub slot: usize,
    name: [u8; FILENAME_LEN],
    /// 读写游标，范围为[0, 文件大小]
    pub offset: usize,
}

#[derive(Debug)]
pub struct FileTable {
    files: Vec<Option<OpenFile>>,
}

impl FileTable {
    pub fn new() -> Self {
        Self {
            files: vec![None; OPEN_FILES_MAX],
        }
    }

    pub fn open(&mut self, name: &str, root: &RootDir) -> Result<Fd> {
        let slot = root.find(name).ok_or(Error::NotFound)?;
        // 记下磁盘上原样的名字字段，NUL之后可能还有残留字节
        let field = root
            .get(slot)
            .map(DirEntry::name_field)
            .ok_or(Error::NotFound)?;
        let fd = self
            .files
            .iter()
            .position(Option::is_none)
            .ok_or(Error::TooManyOpen)?;

        self.files[fd] = Some(OpenFile {
            slot,
            name: field,
            offset: 0,
        });
        log::debug!("Opened {name:?} as fd {fd}");
        Ok(Fd(fd))
    }

    pub fn close(&mut self, fd: Fd) -> Result<()> {
        match self.files.get_mut(fd.0) {
            Some(file) if file.is_some() => {
                *file = None;
                Ok(())
            }
            _ => Err(Error::InvalidHandle),
        }
    }

    /// 获取`fd`对应的打开文件，其所指的目录项必须仍是打开时的那个文件
    pub(crate) fn get_mut(&mut self, fd: Fd, root: &RootDir) -> Result<&mut OpenFile> {
        let file = self
            .files
            .get_mut(fd.0)
            .and_then(Option::as_mut)
            .ok_or(Error::InvalidHandle)?;

        match root.get(file.slot) {
            Some(dirent) if dirent.has_name(&file.name) => Ok(file),
            _ => {
                log::warn!("fd {fd} refers to a vanished directory entry");
                Err(Error::InvalidHandle)
            }
        }
    }

    /// 文件大小
    pub fn stat(&mut self, fd: Fd, root: &RootDir) -> Result<usize> {
        let slot = self.get_mut(fd, root)?.slot;
        root.get(slot).map(|dirent| dirent.size()).ok_or(Error::InvalidHandle)
    }

    /// 移动游标，允许恰好移到文件末尾以便追加
    pub fn seek(&mut self, fd: Fd, offset: usize, root: &RootDir) -> Result<()> {
        let size = self.stat(fd, root)?;
        if offset > size {
            return Err(Error::OffsetOutOfRange);
        }
        self.get_mut(fd, root)?.offset = offset;
        Ok(())
    }

    /// 是否有打开文件指向`slot`号目录项
    pub fn references(&self, slot: usize) -> bool {
        self.files.iter().flatten().any(|file| file.slot == slot)
    }

    pub fn open_count(&self) -> usize {
        self.files.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.open_count() == 0
    }
}

impl Default for FileTable {
    fn default() -> Self {
        Self::new()
    }
}
