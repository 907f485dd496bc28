use block_dev::DeviceError;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("block device unavailable: {0}")]
    DeviceUnavailable(#[from] DeviceError),
    #[error("not a valid volume")]
    InvalidFormat,
    #[error("no volume mounted")]
    NotMounted,
    #[error("a volume is already mounted")]
    AlreadyMounted,
    #[error("volume still has open files")]
    VolumeBusy,
    #[error("no such file")]
    NotFound,
    #[error("file already exists")]
    AlreadyExists,
    #[error("invalid or too long file name")]
    NameTooLong,
    #[error("root directory is full")]
    DirectoryFull,
    #[error("file is open")]
    FileOpen,
    #[error("too many open files")]
    TooManyOpen,
    #[error("bad file descriptor")]
    InvalidHandle,
    #[error("offset past end of file")]
    OffsetOutOfRange,
    #[error("no free data block")]
    OutOfSpace,
    #[error("corrupted cluster chain at block {block}")]
    CorruptedChain { block: u16 },
}
