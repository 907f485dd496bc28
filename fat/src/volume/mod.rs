//! 卷的布局
//!
//! 超级块 | FAT区 | 根目录 | 数据区

pub mod fat;
pub mod root_dir;
pub mod super_block;
