//! 按字节读写文件。
//!
//! 游标所在的块由首块沿链表前进`offset / BLOCK_SIZE`步得到，
//! 之后逐块跟随链表；只覆盖块内一部分时先读出整块再合并写回。

use alloc::vec;

use block_dev::{BLOCK_SIZE, BlockDevice};

use crate::control::Volume;
use crate::file::Fd;
use crate::volume::fat::FatTable;
use crate::volume::super_block::SuperBlock;
use crate::{ClusterId, Error, FatFileSystem, Result};

impl FatFileSystem {
    /// 从游标处读取至多`buf.len()`字节，返回实际读取的字节数，读到文件末尾时为0。
    pub fn read(&mut self, fd: Fd, buf: &mut [u8]) -> Result<usize> {
        let Volume {
            dev,
            sb,
            fat,
            root,
            files,
        } = self.volume_mut()?;
        let file = files.get_mut(fd, root)?;
        let dirent = root.get(file.slot).ok_or(Error::InvalidHandle)?;

        let start = file.offset;
        let end = (start + buf.len()).min(dirent.size()); // exclusive
        if start >= end {
            return Ok(0);
        }

        let mut block = vec![0; BLOCK_SIZE];
        let mut current = fat.nth(dirent.first_cluster(), start / BLOCK_SIZE)?;
        let mut pos = start;

        loop {
            let inner = pos % BLOCK_SIZE;
            let len = (BLOCK_SIZE - inner).min(end - pos);
            let dest = &mut buf[pos - start..pos - start + len];
            let block_id: usize = sb.cluster_block(current).into();

            if len == BLOCK_SIZE {
                dev.read_block(block_id, dest)?;
            } else {
                dev.read_block(block_id, &mut block)?;
                dest.copy_from_slice(&block[inner..inner + len]);
            }
            log::trace!("Read {len} bytes from {current:?}+{inner}");

            pos += len;
            if pos == end {
                break;
            }
            current = fat.next(current)?.ok_or(Error::CorruptedChain {
                block: current.into(),
            })?;
        }

        file.offset = pos;
        Ok(pos - start)
    }

    /// 从游标处写入`buf`，必要时为文件分配新块。
    ///
    /// 空间耗尽时提前停止，返回已写入的字节数，而不报错。
    pub fn write(&mut self, fd: Fd, buf: &[u8]) -> Result<usize> {
        let Volume {
            dev,
            sb,
            fat,
            root,
            files,
        } = self.volume_mut()?;
        let file = files.get_mut(fd, root)?;
        let dirent = root.get_mut(file.slot).ok_or(Error::InvalidHandle)?;

        if buf.is_empty() {
            return Ok(0);
        }

        let fresh = dirent.first_cluster().is_eoc();
        let head = if fresh {
            match fat.alloc_head() {
                Ok(head) => head,
                Err(Error::OutOfSpace) => {
                    log::warn!("No space left for {:?}", dirent.name());
                    return Ok(0);
                }
                Err(err) => return Err(err),
            }
        } else {
            fat.nth(dirent.first_cluster(), 0)?
        };

        let start = file.offset;
        let written = match write_chain(&**dev, sb, fat, head, start, buf) {
            Ok(written) => written,
            Err(err) => {
                // 游标和大小保持不变，收回本次接上的块
                if fresh {
                    fat.release(head)?;
                } else {
                    let keep = dirent.size().div_ceil(BLOCK_SIZE).max(1);
                    let tail = fat.nth(head, keep - 1)?;
                    fat.truncate_after(tail)?;
                }
                return Err(err);
            }
        };

        if written == 0 {
            if fresh {
                fat.release(head)?;
            }
            return Ok(0);
        }
        if fresh {
            dirent.set_first_cluster(head);
        }
        if written < buf.len() {
            log::warn!(
                "Short write to {:?}: {} of {} bytes",
                dirent.name(),
                written,
                buf.len()
            );
        }

        let pos = start + written;
        file.offset = pos;
        if pos > dirent.size() {
            dirent.resize(pos);
        }
        Ok(written)
    }
}

/// 沿`head`起的链表从`start`处写入`buf`，返回写入的字节数。
/// 空间耗尽时提前停止；设备出错时已接上的块留在链表上，由调用方收回。
fn write_chain(
    dev: &dyn BlockDevice,
    sb: &SuperBlock,
    fat: &mut FatTable,
    head: ClusterId,
    start: usize,
    buf: &[u8],
) -> Result<usize> {
    let end = start + buf.len(); // exclusive

    // 游标恰在块边界上的文件末尾时，这一步就要接上新块
    let mut current = head;
    for _ in 0..start / BLOCK_SIZE {
        match next_or_extend(fat, current)? {
            Some(next) => current = next,
            None => return Ok(0),
        }
    }

    let mut block = vec![0; BLOCK_SIZE];
    let mut pos = start;

    loop {
        let inner = pos % BLOCK_SIZE;
        let len = (BLOCK_SIZE - inner).min(end - pos);
        let src = &buf[pos - start..pos - start + len];
        let block_id: usize = sb.cluster_block(current).into();

        if len == BLOCK_SIZE {
            dev.write_block(block_id, src)?;
        } else {
            dev.read_block(block_id, &mut block)?;
            block[inner..inner + len].copy_from_slice(src);
            dev.write_block(block_id, &block)?;
        }
        log::trace!("Wrote {len} bytes to {current:?}+{inner}");

        pos += len;
        if pos == end {
            break;
        }
        match next_or_extend(fat, current)? {
            Some(next) => current = next,
            None => break,
        }
    }

    Ok(pos - start)
}

/// 前进到下一块，已是末尾则接上新块；空间耗尽时返回`None`
fn next_or_extend(fat: &mut FatTable, current: ClusterId) -> Result<Option<ClusterId>> {
    match fat.next(current)? {
        Some(next) => Ok(Some(next)),
        None => match fat.extend(current) {
            Ok(next) => Ok(Some(next)),
            Err(Error::OutOfSpace) => Ok(None),
            Err(err) => Err(err),
        },
    }
}
