use alloc::sync::Arc;
use alloc::vec;

use block_dev::{BLOCK_SIZE, BlockDevice};

use crate::file::{Fd, FileTable};
use crate::volume::fat::FatTable;
use crate::volume::root_dir::{DirEntry, ROOT_DIR_ENTRIES, RootDir};
use crate::volume::super_block::SuperBlock;
use crate::{Error, Result};

/// 卷的上下文。挂载后才能进行文件操作，卸载时写回元数据。
#[derive(Default)]
pub struct FatFileSystem {
    volume: Option<Volume>,
}

/// 已挂载的卷：超级块、FAT与根目录在内存中的镜像，以及打开文件表
pub(crate) struct Volume {
    pub dev: Arc<dyn BlockDevice>,
    pub sb: SuperBlock,
    pub fat: FatTable,
    pub root: RootDir,
    pub files: FileTable,
}

/// 卷的统计信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsInfo {
    pub total_blocks: usize,
    pub fat_blocks: usize,
    pub root_dir_block: usize,
    pub data_start: usize,
    pub data_blocks: usize,
    /// 空闲的FAT表项数
    pub free_data_blocks: usize,
    /// 空闲的目录项数
    pub free_dir_entries: usize,
}

impl FsInfo {
    pub const DIR_ENTRIES: usize = ROOT_DIR_ENTRIES;
}

impl FatFileSystem {
    pub const fn new() -> Self {
        Self { volume: None }
    }

    /// 在整个设备上建立空卷
    pub fn format(dev: &dyn BlockDevice) -> Result<()> {
        let sb = SuperBlock::new(dev.block_count())?;

        let mut buf = vec![0; BLOCK_SIZE];
        sb.encode(&mut buf)?;
        dev.write_block(0, &buf)?;
        FatTable::new(sb.data_blocks()).flush(dev, &sb)?;
        RootDir::new().flush(dev, &sb)?;
        dev.flush()?;

        log::debug!("Formatted {sb:?}");
        Ok(())
    }

    /// 数据区为`data_blocks`块时设备所需的总块数
    pub fn total_blocks_for(data_blocks: usize) -> usize {
        SuperBlock::total_for(data_blocks)
    }

    pub fn mount(&mut self, dev: Arc<dyn BlockDevice>) -> Result<()> {
        if self.volume.is_some() {
            return Err(Error::AlreadyMounted);
        }

        let mut buf = vec![0; BLOCK_SIZE];
        dev.read_block(0, &mut buf)?;
        let sb = SuperBlock::decode(&buf)?;
        sb.validate(dev.block_count())?;

        let fat = FatTable::load(dev.as_ref(), &sb)?;
        let root = RootDir::load(dev.as_ref(), &sb)?;
        log::debug!(
            "Mounted {sb:?}, {} free blocks, {} free entries",
            fat.free_count(),
            root.free_count()
        );

        self.volume = Some(Volume {
            dev,
            sb,
            fat,
            root,
            files: FileTable::new(),
        });
        Ok(())
    }

    /// 写回元数据并释放设备。仍有打开的文件时拒绝卸载。
    pub fn unmount(&mut self) -> Result<()> {
        let volume = self.volume()?;
        if !volume.files.is_empty() {
            return Err(Error::VolumeBusy);
        }

        let Volume {
            dev, sb, fat, root, ..
        } = volume;
        let mut buf = vec![0; BLOCK_SIZE];
        sb.encode(&mut buf)?;
        dev.write_block(0, &buf)?;
        fat.flush(dev.as_ref(), sb)?;
        root.flush(dev.as_ref(), sb)?;
        dev.flush()?;

        self.volume = None;
        log::debug!("Unmounted");
        Ok(())
    }

    pub fn is_mounted(&self) -> bool {
        self.volume.is_some()
    }

    pub fn info(&self) -> Result<FsInfo> {
        let Volume { sb, fat, root, .. } = self.volume()?;

        Ok(FsInfo {
            total_blocks: sb.total_blocks(),
            fat_blocks: sb.fat_blocks(),
            root_dir_block: sb.root_dir().into(),
            data_start: sb.data_area().into(),
            data_blocks: sb.data_blocks(),
            free_data_blocks: fat.free_count(),
            free_dir_entries: root.free_count(),
        })
    }

    /// 创建空文件，首次写入时才分配数据块
    pub fn create(&mut self, name: &str) -> Result<()> {
        self.volume_mut()?.root.create(name).map(|_| ())
    }

    pub fn delete(&mut self, name: &str) -> Result<()> {
        let Volume {
            fat, root, files, ..
        } = self.volume_mut()?;
        root.remove(name, fat, files)
    }

    /// 按目录顺序列出所有文件，每次调用都从头开始
    pub fn list(&self) -> Result<impl Iterator<Item = &DirEntry>> {
        Ok(self.volume()?.root.iter())
    }

    pub fn open(&mut self, name: &str) -> Result<Fd> {
        let Volume { root, files, .. } = self.volume_mut()?;
        files.open(name, root)
    }

    pub fn close(&mut self, fd: Fd) -> Result<()> {
        self.volume_mut()?.files.close(fd)
    }

    /// 文件大小
    pub fn stat(&mut self, fd: Fd) -> Result<usize> {
        let Volume { root, files, .. } = self.volume_mut()?;
        files.stat(fd, root)
    }

    pub fn seek(&mut self, fd: Fd, offset: usize) -> Result<()> {
        let Volume { root, files, .. } = self.volume_mut()?;
        files.seek(fd, offset, root)
    }
}

impl FatFileSystem {
    pub(crate) fn volume(&self) -> Result<&Volume> {
        self.volume.as_ref().ok_or(Error::NotMounted)
    }

    pub(crate) fn volume_mut(&mut self) -> Result<&mut Volume> {
        self.volume.as_mut().ok_or(Error::NotMounted)
    }
}
