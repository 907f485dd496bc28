//! 根目录：单个块，128个定长目录项，也是卷上唯一的目录。

use alloc::vec;
use alloc::vec::Vec;
use core::str;

use binrw::io::Cursor;
use binrw::{BinRead, BinWrite, binrw};
use block_dev::{BLOCK_SIZE, BlockDevice};

use crate::file::FileTable;
use crate::volume::fat::FatTable;
use crate::volume::super_block::SuperBlock;
use crate::{ClusterId, Error, Result};

/// 文件名字段的宽度，名称以NUL结尾，最长15字节
pub const FILENAME_LEN: usize = 16;

pub const ROOT_DIR_ENTRIES: usize = 128;

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// 空串表示空闲目录项
    name: [u8; FILENAME_LEN],

    /// 文件的字节数
    size: u32,

    /// 链表首块；[`ClusterId::EOC`]表示尚未分配数据块
    first: ClusterId,

    _reserved: [u8; 10],
}

impl Default for DirEntry {
    fn default() -> Self {
        Self {
            name: [0; FILENAME_LEN],
            size: 0,
            first: ClusterId::EOC,
            _reserved: [0; 10],
        }
    }
}

impl DirEntry {
    fn new(name: [u8; FILENAME_LEN]) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    pub fn is_free(&self) -> bool {
        self.name[0] == 0
    }

    fn name_bytes(&self) -> &[u8] {
        let len = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(FILENAME_LEN);
        &self.name[..len]
    }

    pub(crate) const fn name_field(&self) -> [u8; FILENAME_LEN] {
        self.name
    }

    pub(crate) fn has_name(&self, field: &[u8; FILENAME_LEN]) -> bool {
        self.name == *field
    }

    pub fn name(&self) -> &str {
        str::from_utf8(self.name_bytes()).unwrap_or("\u{FFFD}")
    }

    pub const fn size(&self) -> usize {
        self.size as usize
    }

    pub fn resize(&mut self, size: usize) {
        self.size = size as u32;
    }

    pub const fn first_cluster(&self) -> ClusterId {
        self.first
    }

    pub fn set_first_cluster(&mut self, id: ClusterId) {
        self.first = id;
    }
}

/// 校验文件名并转为定长字段
pub fn encode_name(name: &str) -> Result<[u8; FILENAME_LEN]> {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() >= FILENAME_LEN || bytes.contains(&0) {
        return Err(Error::NameTooLong);
    }

    let mut field = [0; FILENAME_LEN];
    field[..bytes.len()].copy_from_slice(bytes);
    Ok(field)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootDir {
    entries: Vec<DirEntry>,
}

impl RootDir {
    pub fn new() -> Self {
        Self {
            entries: vec![DirEntry::default(); ROOT_DIR_ENTRIES],
        }
    }

    pub fn load(dev: &dyn BlockDevice, sb: &SuperBlock) -> Result<Self> {
        let mut buf = vec![0; BLOCK_SIZE];
        dev.read_block(sb.root_dir().into(), &mut buf)?;

        let mut cursor = Cursor::new(&buf[..]);
        let entries = (0..ROOT_DIR_ENTRIES)
            .map(|_| DirEntry::read(&mut cursor))
            .collect::<core::result::Result<Vec<_>, _>>()
            .map_err(|err| {
                log::warn!("Unreadable root directory: {err:?}");
                Error::InvalidFormat
            })?;

        Ok(Self { entries })
    }

    pub fn flush(&self, dev: &dyn BlockDevice, sb: &SuperBlock) -> Result<()> {
        let mut buf = vec![0; BLOCK_SIZE];

        let mut cursor = Cursor::new(&mut buf[..]);
        for dirent in &self.entries {
            dirent.write(&mut cursor).map_err(|err| {
                log::error!("Failed to encode directory entry: {err:?}");
                Error::InvalidFormat
            })?;
        }
        dev.write_block(sb.root_dir().into(), &buf)?;

        Ok(())
    }

    /// 按名称搜索已占用的目录项
    pub fn find(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|dirent| !dirent.is_free() && dirent.name_bytes() == name.as_bytes())
    }

    pub fn find_free_slot(&self) -> Option<usize> {
        self.entries.iter().position(DirEntry::is_free)
    }

    pub fn free_count(&self) -> usize {
        self.entries.iter().filter(|dirent| dirent.is_free()).count()
    }

    /// 创建空文件，不分配数据块
    pub fn create(&mut self, name: &str) -> Result<usize> {
        if self.find(name).is_some() {
            return Err(Error::AlreadyExists);
        }
        let field = encode_name(name)?;
        let slot = self.find_free_slot().ok_or(Error::DirectoryFull)?;

        self.entries[slot] = DirEntry::new(field);
        log::debug!("Created {name:?} at slot {slot}");
        Ok(slot)
    }

    /// 删除文件并释放其链表。文件仍被打开时拒绝删除。
    pub fn remove(&mut self, name: &str, fat: &mut FatTable, files: &FileTable) -> Result<()> {
        let slot = self.find(name).ok_or(Error::NotFound)?;
        if files.references(slot) {
            return Err(Error::FileOpen);
        }

        fat.release(self.entries[slot].first_cluster())?;
        self.entries[slot] = DirEntry::default();
        log::debug!("Removed {name:?} from slot {slot}");
        Ok(())
    }

    /// 已占用的目录项
    pub fn get(&self, slot: usize) -> Option<&DirEntry> {
        self.entries.get(slot).filter(|dirent| !dirent.is_free())
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut DirEntry> {
        self.entries.get_mut(slot).filter(|dirent| !dirent.is_free())
    }

    /// 按目录顺序遍历已占用的目录项
    pub fn iter(&self) -> impl Iterator<Item = &DirEntry> {
        self.entries.iter().filter(|dirent| !dirent.is_free())
    }
}

impl Default for RootDir {
    fn default() -> Self {
        Self::new()
    }
}
