//! 单卷、平坦命名空间的FAT文件系统。
//!
//! 所有元数据（超级块、FAT、根目录）在挂载时读入内存，卸载时写回，
//! 文件数据则直接以整块读写底层的块设备。

#![no_std]

extern crate alloc;

mod block;
mod cluster;
mod control;
mod error;
mod file;
mod rw;
pub mod volume;

pub use block_dev::{BLOCK_SIZE, BlockDevice};

pub use self::{
    block::BlockId,
    cluster::{ClusterError, ClusterId},
    control::{FatFileSystem, FsInfo},
    error::{Error, Result},
    file::{Fd, FileTable, OPEN_FILES_MAX},
    volume::root_dir::{DirEntry, FILENAME_LEN, ROOT_DIR_ENTRIES},
    volume::super_block::SIGNATURE,
};
