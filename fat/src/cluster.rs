//! 簇编号，即FAT表项的索引。
//!
//! 此卷一簇恰为一个数据块，所以簇编号同时也是数据块在数据区内的序号。

use binrw::binrw;

#[binrw]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ClusterId(u16);

#[derive(Debug, PartialEq, Eq)]
pub enum ClusterError {
    /// 指向了未分配的簇
    Free,
    /// 指向了保留的0号簇
    Reserved,
    /// 超出数据区
    OutOfRange,
}

impl From<u16> for ClusterId {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl From<ClusterId> for u16 {
    fn from(id: ClusterId) -> Self {
        id.0
    }
}

impl From<ClusterId> for usize {
    fn from(id: ClusterId) -> Self {
        id.0 as usize
    }
}

impl ClusterId {
    pub const FREE: Self = Self(0);

    /// 链表结束标记；作为目录项的首簇时表示空文件
    pub const EOC: Self = Self(0xFFFF);

    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn is_eoc(self) -> bool {
        self.0 == Self::EOC.0
    }

    /// 校验`self`能否作为链表上的一环，`data_blocks`为数据区块数
    pub fn validate(self, data_blocks: usize) -> Result<Self, ClusterError> {
        match self {
            Self::FREE => Err(ClusterError::Reserved),
            id if usize::from(id) >= data_blocks => Err(ClusterError::OutOfRange),
            id => Ok(id),
        }
    }
}
