use binrw::io::Cursor;
use binrw::{BinRead, BinWrite, binrw};
use block_dev::BLOCK_SIZE;

use crate::{BlockId, ClusterId, Error, Result};

/// 超级块的签名
pub const SIGNATURE: &[u8; 8] = b"ECS150FS";

/// 一个FAT块能容纳的表项数
pub const FAT_ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / 2;

/// 位于0号块，描述整个卷的布局，块内其余部分保留。
#[binrw]
#[brw(little, magic = b"ECS150FS")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuperBlock {
    /// 卷的总块数
    total_blocks: u16,
    /// 根目录所在块
    root_dir_block: u16,
    /// 数据区的起始块
    data_start: u16,
    /// 数据区的块数，即FAT表项数
    data_blocks: u16,
    /// FAT区占用的块数
    fat_blocks: u8,
}

impl SuperBlock {
    /// 为`total_blocks`个块的设备规划布局，FAT区取能覆盖数据区的最小块数。
    pub fn new(total_blocks: usize) -> Result<Self> {
        if !(4..=u16::MAX as usize).contains(&total_blocks) {
            return Err(Error::InvalidFormat);
        }

        let fat_blocks = (1..=u8::MAX as usize)
            .find(|&fat| fat * FAT_ENTRIES_PER_BLOCK >= total_blocks - 2 - fat)
            .ok_or(Error::InvalidFormat)?;
        let data_blocks = total_blocks - 2 - fat_blocks;

        Ok(Self {
            total_blocks: total_blocks as u16,
            root_dir_block: fat_blocks as u16 + 1,
            data_start: fat_blocks as u16 + 2,
            data_blocks: data_blocks as u16,
            fat_blocks: fat_blocks as u8,
        })
    }

    /// 数据区恰为`data_blocks`块时卷的总块数
    pub fn total_for(data_blocks: usize) -> usize {
        let fat_blocks = data_blocks.div_ceil(FAT_ENTRIES_PER_BLOCK).max(1);
        2 + fat_blocks + data_blocks
    }

    pub fn decode(block: &[u8]) -> Result<Self> {
        Self::read(&mut Cursor::new(block)).map_err(|err| {
            log::warn!("Unreadable super block: {err:?}");
            Error::InvalidFormat
        })
    }

    pub fn encode(&self, block: &mut [u8]) -> Result<()> {
        block.fill(0);
        self.write(&mut Cursor::new(block)).map_err(|err| {
            log::error!("Failed to encode super block: {err:?}");
            Error::InvalidFormat
        })
    }

    /// 核对布局与设备的实际块数
    pub fn validate(&self, device_blocks: usize) -> Result<()> {
        let fat_blocks = self.fat_blocks as usize;
        let data_blocks = self.data_blocks as usize;

        let consistent = self.total_blocks() == device_blocks
            && self.total_blocks() == 2 + fat_blocks + data_blocks
            && self.root_dir_block as usize == fat_blocks + 1
            && self.data_start as usize == fat_blocks + 2
            && data_blocks > 0
            && fat_blocks * FAT_ENTRIES_PER_BLOCK >= data_blocks;

        if consistent {
            Ok(())
        } else {
            log::warn!("Inconsistent super block {self:?} on a device of {device_blocks} blocks");
            Err(Error::InvalidFormat)
        }
    }

    pub const fn total_blocks(&self) -> usize {
        self.total_blocks as usize
    }

    pub const fn fat_blocks(&self) -> usize {
        self.fat_blocks as usize
    }

    /// FAT区紧随超级块
    pub const fn fat_area(&self) -> BlockId {
        BlockId::new(1)
    }

    pub const fn root_dir(&self) -> BlockId {
        BlockId::new(self.root_dir_block as usize)
    }

    pub const fn data_area(&self) -> BlockId {
        BlockId::new(self.data_start as usize)
    }

    pub const fn data_blocks(&self) -> usize {
        self.data_blocks as usize
    }

    /// 簇所对应的设备块
    pub fn cluster_block(&self, id: ClusterId) -> BlockId {
        self.data_area() + usize::from(id)
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    #[test]
    fn layout() {
        let sb = SuperBlock::new(SuperBlock::total_for(8192)).unwrap();
        assert_eq!(8198, sb.total_blocks());
        assert_eq!(4, sb.fat_blocks());
        assert_eq!(BlockId::new(5), sb.root_dir());
        assert_eq!(BlockId::new(6), sb.data_area());
        assert_eq!(8192, sb.data_blocks());

        let sb = SuperBlock::new(4100).unwrap();
        assert_eq!(2, sb.fat_blocks());
        assert_eq!(4096, sb.data_blocks());

        assert_eq!(Err(Error::InvalidFormat), SuperBlock::new(3));
        assert_eq!(Err(Error::InvalidFormat), SuperBlock::new(70000));
    }

    #[test]
    fn codec() {
        let sb = SuperBlock::new(4100).unwrap();
        let mut block = vec![0xFF; BLOCK_SIZE];
        sb.encode(&mut block).unwrap();

        assert_eq!(SIGNATURE, &block[..8]);
        assert_eq!(&[0x04, 0x10], &block[8..10]);
        assert_eq!(2, block[16]);
        assert!(block[17..].iter().all(|&b| b == 0));
        assert_eq!(sb, SuperBlock::decode(&block).unwrap());

        block[0] = b'X';
        assert_eq!(Err(Error::InvalidFormat), SuperBlock::decode(&block));
    }

    #[test]
    fn validate() {
        let sb = SuperBlock::new(4100).unwrap();
        assert_eq!(Ok(()), sb.validate(4100));
        assert_eq!(Err(Error::InvalidFormat), sb.validate(4101));

        let mut shifted = sb.clone();
        shifted.data_start += 1;
        assert_eq!(Err(Error::InvalidFormat), shifted.validate(4100));
    }
}
