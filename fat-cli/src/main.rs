mod block_file;
mod cli;

use std::error::Error;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use block_dev::DeviceError;
use clap::Parser;
use flatfat::{FatFileSystem, FsInfo};

pub use self::{
    block_file::BlockFile,
    cli::{Cli, Command, VolumeCommand},
};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Format { data_blocks } => {
            let total = FatFileSystem::total_blocks_for(data_blocks);
            let dev = BlockFile::create(&cli.disk, total)?;
            FatFileSystem::format(&dev)?;
            log::info!("Formatted {:?}: {total} blocks", cli.disk);
        }
        Command::Volume(command) => {
            let mut fs = mount(&cli.disk)?;
            run(&mut fs, command)?;
            fs.unmount()?;
        }
    }

    Ok(())
}

fn run(fs: &mut FatFileSystem, command: VolumeCommand) -> Result<(), Box<dyn Error>> {
    match command {
        VolumeCommand::Info => print_info(&fs.info()?),
        VolumeCommand::Ls => {
            println!("FS Ls:");
            for dirent in fs.list()? {
                println!(
                    "file: {}, size: {}, data_blk: {}",
                    dirent.name(),
                    dirent.size(),
                    u16::from(dirent.first_cluster())
                );
            }
        }
        VolumeCommand::Add { file } => {
            let data = std::fs::read(&file)?;
            let name = file
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or("host file name isn't valid UTF-8")?;

            fs.create(name)?;
            let fd = fs.open(name)?;
            let written = fs.write(fd, &data)?;
            fs.close(fd)?;
            if written < data.len() {
                println!("Wrote file '{name}' ({written}/{} bytes)", data.len());
            }
        }
        VolumeCommand::Rm { name } => fs.delete(&name)?,
        VolumeCommand::Cat { name } => {
            let fd = fs.open(&name)?;
            let mut data = vec![0; fs.stat(fd)?];
            let read = fs.read(fd, &mut data)?;
            fs.close(fd)?;
            io::stdout().write_all(&data[..read])?;
        }
        VolumeCommand::Stat { name } => {
            let fd = fs.open(&name)?;
            let size = fs.stat(fd)?;
            fs.close(fd)?;
            println!("Size of file '{name}' is {size} bytes");
        }
    }
    Ok(())
}

fn mount(disk: &Path) -> Result<FatFileSystem, flatfat::Error> {
    let dev = BlockFile::open(disk).map_err(|err| {
        log::error!("Cannot open {disk:?}: {err}");
        DeviceError::Unavailable
    })?;

    let mut fs = FatFileSystem::new();
    fs.mount(Arc::new(dev))?;
    Ok(fs)
}

fn print_info(info: &FsInfo) {
    println!("FS Info:");
    println!("total_blk_count={}", info.total_blocks);
    println!("fat_blk_count={}", info.fat_blocks);
    println!("rdir_blk={}", info.root_dir_block);
    println!("data_blk={}", info.data_start);
    println!("data_blk_count={}", info.data_blocks);
    println!("fat_free_ratio={}/{}", info.free_data_blocks, info.data_blocks);
    println!(
        "rdir_free_ratio={}/{}",
        info.free_dir_entries,
        FsInfo::DIR_ENTRIES
    );
}
