use derive_more::{Add, Display, From, Into};

/// 设备上的绝对块号
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Add, From, Into)]
#[repr(transparent)]
pub struct BlockId(usize);

impl core::ops::Add<usize> for BlockId {
    type Output = Self;

    fn add(self, rhs: usize) -> Self::Output {
        self + Self(rhs)
    }
}

impl BlockId {
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }
}
