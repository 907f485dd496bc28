use std::sync::Arc;

use block_dev::{BLOCK_SIZE, RamDisk};
use flatfat::{Error, FatFileSystem};

fn mounted(data_blocks: usize) -> FatFileSystem {
    let disk = Arc::new(RamDisk::new(FatFileSystem::total_blocks_for(data_blocks)));
    FatFileSystem::format(disk.as_ref()).unwrap();
    let mut fs = FatFileSystem::new();
    fs.mount(disk).unwrap();
    fs
}

fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8 ^ seed).collect()
}

#[test]
fn round_trip() {
    let mut fs = mounted(64);

    for (i, len) in [0, 1, 100, BLOCK_SIZE - 1, BLOCK_SIZE, BLOCK_SIZE + 1, 3 * BLOCK_SIZE + 17]
        .into_iter()
        .enumerate()
    {
        let name = format!("file{i}");
        fs.create(&name).unwrap();
        let fd = fs.open(&name).unwrap();
        let data = pattern(len, i as u8);

        assert_eq!(len, fs.write(fd, &data).unwrap());
        assert_eq!(len, fs.stat(fd).unwrap());

        fs.seek(fd, 0).unwrap();
        let mut buf = vec![0; len];
        assert_eq!(len, fs.read(fd, &mut buf).unwrap());
        assert_eq!(data, buf);
        fs.close(fd).unwrap();
    }
}

#[test]
fn unaligned_ranges() {
    let mut fs = mounted(64);
    fs.create("a").unwrap();
    let fd = fs.open("a").unwrap();
    let data = pattern(5 * BLOCK_SIZE, 1);
    fs.write(fd, &data).unwrap();

    for (offset, len) in [(1, 10), (BLOCK_SIZE - 3, 6), (100, 3 * BLOCK_SIZE), (4 * BLOCK_SIZE, BLOCK_SIZE)] {
        fs.seek(fd, offset).unwrap();
        let mut buf = vec![0; len];
        assert_eq!(len, fs.read(fd, &mut buf).unwrap());
        assert_eq!(&data[offset..offset + len], &buf[..]);
    }
}

#[test]
fn append() {
    let mut fs = mounted(64);
    fs.create("log").unwrap();
    let fd = fs.open("log").unwrap();

    let head = pattern(BLOCK_SIZE, 1);
    let tail = pattern(1000, 2);
    fs.write(fd, &head).unwrap();
    assert_eq!(BLOCK_SIZE, fs.stat(fd).unwrap());

    // 游标恰在块边界的末尾
    fs.seek(fd, BLOCK_SIZE).unwrap();
    assert_eq!(1000, fs.write(fd, &tail).unwrap());
    assert_eq!(BLOCK_SIZE + 1000, fs.stat(fd).unwrap());

    // 写入后游标位于末尾，可以继续追加
    assert_eq!(1000, fs.write(fd, &tail).unwrap());
    assert_eq!(BLOCK_SIZE + 2000, fs.stat(fd).unwrap());
    assert_eq!(Err(Error::OffsetOutOfRange), fs.seek(fd, BLOCK_SIZE + 2001));

    fs.seek(fd, 0).unwrap();
    let mut buf = vec![0; BLOCK_SIZE + 2000];
    fs.read(fd, &mut buf).unwrap();
    assert_eq!(head, buf[..BLOCK_SIZE]);
    assert_eq!(tail, buf[BLOCK_SIZE..BLOCK_SIZE + 1000]);
    assert_eq!(tail, buf[BLOCK_SIZE + 1000..]);
}

#[test]
fn overwrite_in_middle() {
    let mut fs = mounted(64);
    fs.create("a").unwrap();
    let fd = fs.open("a").unwrap();
    let mut expected = pattern(3 * BLOCK_SIZE, 5);
    fs.write(fd, &expected).unwrap();
    let free = fs.info().unwrap().free_data_blocks;

    let patch = vec![0xEE; BLOCK_SIZE + 10];
    let at = BLOCK_SIZE - 5;
    fs.seek(fd, at).unwrap();
    assert_eq!(patch.len(), fs.write(fd, &patch).unwrap());
    expected[at..at + patch.len()].copy_from_slice(&patch);

    assert_eq!(3 * BLOCK_SIZE, fs.stat(fd).unwrap());
    assert_eq!(free, fs.info().unwrap().free_data_blocks);

    fs.seek(fd, 0).unwrap();
    let mut buf = vec![0; 3 * BLOCK_SIZE];
    fs.read(fd, &mut buf).unwrap();
    assert_eq!(expected, buf);
}

#[test]
fn overwrite_past_end() {
    let mut fs = mounted(64);
    fs.create("a").unwrap();
    let fd = fs.open("a").unwrap();
    fs.write(fd, &pattern(100, 0)).unwrap();

    fs.seek(fd, 50).unwrap();
    fs.write(fd, &pattern(BLOCK_SIZE, 9)).unwrap();
    assert_eq!(50 + BLOCK_SIZE, fs.stat(fd).unwrap());
    assert_eq!(64 - 1 - 2, fs.info().unwrap().free_data_blocks);

    fs.seek(fd, 0).unwrap();
    let mut buf = vec![0; 50 + BLOCK_SIZE];
    fs.read(fd, &mut buf).unwrap();
    assert_eq!(pattern(100, 0)[..50], buf[..50]);
    assert_eq!(pattern(BLOCK_SIZE, 9), buf[50..]);
}

#[test]
fn read_at_end() {
    let mut fs = mounted(16);
    fs.create("a").unwrap();
    let fd = fs.open("a").unwrap();

    let mut buf = [0; 64];
    assert_eq!(0, fs.read(fd, &mut buf).unwrap());

    fs.write(fd, &pattern(10, 3)).unwrap();
    assert_eq!(0, fs.read(fd, &mut buf).unwrap());

    fs.seek(fd, 4).unwrap();
    assert_eq!(6, fs.read(fd, &mut buf).unwrap());
    assert_eq!(pattern(10, 3)[4..], buf[..6]);
    assert_eq!(0, fs.read(fd, &mut buf).unwrap());
}

#[test]
fn independent_cursors() {
    let mut fs = mounted(16);
    fs.create("a").unwrap();
    let writer = fs.open("a").unwrap();
    let reader = fs.open("a").unwrap();

    fs.write(writer, b"hello, world").unwrap();
    let mut buf = [0; 5];
    assert_eq!(5, fs.read(reader, &mut buf).unwrap());
    assert_eq!(b"hello", &buf);
    assert_eq!(5, fs.read(reader, &mut buf).unwrap());
    assert_eq!(b", wor", &buf);

    fs.write(writer, b"!").unwrap();
    assert_eq!(13, fs.stat(reader).unwrap());
    assert_eq!(3, fs.read(reader, &mut buf).unwrap());
    assert_eq!(b"ld!", &buf[..3]);
}

#[test]
fn short_write_when_full() {
    // 7个数据块，0号保留，可用6块
    let mut fs = mounted(7);
    fs.create("big").unwrap();
    fs.create("late").unwrap();
    let fd = fs.open("big").unwrap();

    let data = pattern(7 * BLOCK_SIZE, 4);
    assert_eq!(6 * BLOCK_SIZE, fs.write(fd, &data).unwrap());
    assert_eq!(6 * BLOCK_SIZE, fs.stat(fd).unwrap());
    assert_eq!(0, fs.info().unwrap().free_data_blocks);
    assert_eq!(0, fs.write(fd, &data).unwrap());

    let late = fs.open("late").unwrap();
    assert_eq!(0, fs.write(late, b"x").unwrap());
    assert_eq!(0, fs.stat(late).unwrap());

    fs.seek(fd, 0).unwrap();
    let mut buf = vec![0; 6 * BLOCK_SIZE];
    fs.read(fd, &mut buf).unwrap();
    assert_eq!(data[..6 * BLOCK_SIZE], buf[..]);

    fs.close(fd).unwrap();
    fs.delete("big").unwrap();
    assert_eq!(1, fs.write(late, b"x").unwrap());
}

#[test]
fn recreated_file_is_empty() {
    let mut fs = mounted(16);
    fs.create("a").unwrap();
    let fd = fs.open("a").unwrap();
    fs.write(fd, &pattern(2 * BLOCK_SIZE, 0)).unwrap();
    fs.close(fd).unwrap();
    fs.delete("a").unwrap();

    fs.create("a").unwrap();
    let fd = fs.open("a").unwrap();
    assert_eq!(0, fs.stat(fd).unwrap());
    assert_eq!(15, fs.info().unwrap().free_data_blocks);
}

#[test]
fn scenario() {
    let mut fs = mounted(8192);
    let free = fs.info().unwrap().free_data_blocks;
    assert_eq!(8191, free);

    fs.create("a").unwrap();
    let fd = fs.open("a").unwrap();
    let data: Vec<u8> = b"0123456789".iter().copied().cycle().take(5000).collect();
    assert_eq!(5000, fs.write(fd, &data).unwrap());
    assert_eq!(5000, fs.stat(fd).unwrap());

    fs.seek(fd, 0).unwrap();
    let mut buf = vec![0; 5000];
    assert_eq!(5000, fs.read(fd, &mut buf).unwrap());
    assert_eq!(data, buf);

    assert_eq!(
        free - 5000usize.div_ceil(BLOCK_SIZE),
        fs.info().unwrap().free_data_blocks
    );
}
