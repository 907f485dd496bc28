use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(version, about = "Inspect and edit a flat FAT volume image")]
pub struct Cli {
    /// Virtual disk image
    pub disk: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the image and lay out an empty volume
    Format {
        /// Number of data blocks
        #[arg(long, short, default_value_t = 8192)]
        data_blocks: usize,
    },
    #[command(flatten)]
    Volume(VolumeCommand),
}

// 需要先挂载卷的子命令
#[derive(Subcommand)]
pub enum VolumeCommand {
    /// Show volume statistics
    Info,
    /// List files
    Ls,
    /// Copy a host file into the volume
    Add { file: PathBuf },
    /// Delete a file
    Rm { name: String },
    /// Print a file's content
    Cat { name: String },
    /// Print a file's size
    Stat { name: String },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse() {
        let cli = Cli::try_parse_from(["flatfat", "disk.img", "format", "-d", "16"]).unwrap();
        assert!(matches!(cli.command, Command::Format { data_blocks: 16 }));

        let cli = Cli::try_parse_from(["flatfat", "disk.img", "cat", "a"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Volume(VolumeCommand::Cat { name }) if name == "a"
        ));

        assert!(Cli::try_parse_from(["flatfat", "disk.img", "volume"]).is_err());
    }
}
