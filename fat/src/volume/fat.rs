use alloc::vec;
use alloc::vec::Vec;

use block_dev::{BLOCK_SIZE, BlockDevice};

use crate::volume::super_block::{FAT_ENTRIES_PER_BLOCK, SuperBlock};
use crate::{ClusterError, ClusterId, Error, Result};

/// 内存中的文件分配表，每个数据块对应一个表项。
///
/// - [`ClusterId::FREE`]: 未分配
/// - [`ClusterId::EOC`]: 链表上最后一个块
/// - 其它: 链表上下一个块的编号
///
/// 0号表项永久保留，不会被分配。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatTable {
    entries: Vec<ClusterId>,
}

impl FatTable {
    /// 全新的表：仅保留0号表项
    pub fn new(data_blocks: usize) -> Self {
        let mut entries = vec![ClusterId::FREE; data_blocks];
        entries[0] = ClusterId::EOC;
        Self { entries }
    }

    pub fn load(dev: &dyn BlockDevice, sb: &SuperBlock) -> Result<Self> {
        let mut entries = Vec::with_capacity(sb.fat_blocks() * FAT_ENTRIES_PER_BLOCK);
        let mut buf = vec![0; BLOCK_SIZE];

        for i in 0..sb.fat_blocks() {
            dev.read_block((sb.fat_area() + i).into(), &mut buf)?;
            entries.extend(
                buf.chunks_exact(2)
                    .map(|raw| ClusterId::new(u16::from_le_bytes([raw[0], raw[1]]))),
            );
        }
        entries.truncate(sb.data_blocks());

        if entries[0] == ClusterId::FREE {
            log::warn!("Reserved FAT entry was free, reserving it again");
            entries[0] = ClusterId::EOC;
        }

        Ok(Self { entries })
    }

    /// 写回FAT区的每一个块，表外的部分填0
    pub fn flush(&self, dev: &dyn BlockDevice, sb: &SuperBlock) -> Result<()> {
        let mut buf = vec![0; BLOCK_SIZE];

        for i in 0..sb.fat_blocks() {
            let start = (i * FAT_ENTRIES_PER_BLOCK).min(self.entries.len());
            let end = ((i + 1) * FAT_ENTRIES_PER_BLOCK).min(self.entries.len());

            buf.fill(0);
            for (raw, id) in buf.chunks_exact_mut(2).zip(&self.entries[start..end]) {
                raw.copy_from_slice(&u16::from(*id).to_le_bytes());
            }
            dev.write_block((sb.fat_area() + i).into(), &buf)?;
        }

        Ok(())
    }

    /// 表项数，即数据块数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 从`start`开始寻找第一个空闲表项
    pub fn find_free(&self, start: usize) -> Option<ClusterId> {
        self.entries
            .iter()
            .enumerate()
            .skip(start)
            .find_map(|(i, &id)| (id == ClusterId::FREE).then(|| ClusterId::new(i as u16)))
    }

    pub fn free_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|&&id| id == ClusterId::FREE)
            .count()
    }

    /// 分配一个新链表的首块
    pub fn alloc_head(&mut self) -> Result<ClusterId> {
        let id = self.find_free(0).ok_or(Error::OutOfSpace)?;
        self.entries[usize::from(id)] = ClusterId::EOC;
        log::debug!("Allocated chain head {id:?}");
        Ok(id)
    }

    /// 在链表末尾`tail`之后接上一个新块。
    /// 优先分配`tail`之后的空闲块。
    pub fn extend(&mut self, tail: ClusterId) -> Result<ClusterId> {
        let tail = self.check(tail)?;
        if !self.entries[usize::from(tail)].is_eoc() {
            log::error!("Extending {tail:?}, which isn't the end of a chain");
            return Err(Error::CorruptedChain { block: tail.into() });
        }

        let id = self
            .find_free(usize::from(tail) + 1)
            .or_else(|| self.find_free(0))
            .ok_or(Error::OutOfSpace)?;
        self.entries[usize::from(tail)] = id;
        self.entries[usize::from(id)] = ClusterId::EOC;
        log::trace!("Linked {tail:?} -> {id:?}");
        Ok(id)
    }

    /// 获取链表上的下一个块。
    /// `Ok(None)`表示`id`为链表上最后一个块。
    pub fn next(&self, id: ClusterId) -> Result<Option<ClusterId>> {
        let id = self.check(id)?;

        match self.entries[usize::from(id)] {
            ClusterId::EOC => Ok(None),
            ClusterId::FREE => Err(self.corrupted(id, ClusterError::Free)),
            next => self.check(next).map(Some),
        }
    }

    /// 从`head`沿链表前进`n`步。
    /// 链表不够长说明目录项与FAT不一致。
    pub fn nth(&self, head: ClusterId, n: usize) -> Result<ClusterId> {
        let mut current = self.check(head)?;
        for _ in 0..n {
            current = self.next(current)?.ok_or(Error::CorruptedChain {
                block: current.into(),
            })?;
        }
        Ok(current)
    }

    /// 收集从`head`开始的整条链表，首块为[`ClusterId::EOC`]时为空。
    pub fn chain(&self, head: ClusterId) -> Result<Vec<ClusterId>> {
        let mut chain = Vec::new();
        if head.is_eoc() {
            return Ok(chain);
        }

        let mut current = self.check(head)?;
        loop {
            chain.push(current);
            // 0号表项不在任何链表上，超过其余表项数必然成环
            if chain.len() >= self.entries.len() {
                log::error!("Cluster chain from {head:?} loops");
                return Err(Error::CorruptedChain {
                    block: current.into(),
                });
            }
            match self.next(current)? {
                Some(next) => current = next,
                None => return Ok(chain),
            }
        }
    }

    pub fn chain_len(&self, head: ClusterId) -> Result<usize> {
        self.chain(head).map(|chain| chain.len())
    }

    /// 释放整条链表，返回释放的块数。
    /// 链表损坏时不做任何修改。
    pub fn release(&mut self, head: ClusterId) -> Result<usize> {
        let chain = self.chain(head)?;
        for &id in &chain {
            self.entries[usize::from(id)] = ClusterId::FREE;
        }
        log::debug!("Released {} blocks from {head:?}", chain.len());
        Ok(chain.len())
    }

    /// 把`tail`变为链表末尾，释放其后的块，返回释放的块数
    pub fn truncate_after(&mut self, tail: ClusterId) -> Result<usize> {
        let tail = self.check(tail)?;
        let released = match self.next(tail)? {
            Some(next) => self.release(next)?,
            None => 0,
        };
        self.entries[usize::from(tail)] = ClusterId::EOC;
        Ok(released)
    }
}

impl FatTable {
    fn check(&self, id: ClusterId) -> Result<ClusterId> {
        id.validate(self.entries.len())
            .map_err(|err| self.corrupted(id, err))
    }

    fn corrupted(&self, id: ClusterId, err: ClusterError) -> Error {
        log::error!("Corrupted cluster chain at {id:?}: {err:?}");
        Error::CorruptedChain { block: id.into() }
    }
}
