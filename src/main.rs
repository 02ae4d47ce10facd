use clap::{ArgGroup, Parser, Subcommand};
use env_logger::{Builder, Env};
use log::error;
use m4k::config::{self, Config};
use m4k::imaging::Encoding;
use m4k::{output, pipeline};
use std::path::PathBuf;
use std::sync::mpsc;
use std::{process, thread};

#[derive(Parser)]
#[command(name = "m4k")]
#[command(about = "Merge manga chapters, convert them for an e-reader and send them over")]
#[command(long_about = "\
Merge manga chapters, convert them for an e-reader and send them over

Chapter archives are read from one directory, in file-name order:

  downloads/
  ├── 0001_[1] Romance_Dawn.cbz      # index_[chapter number] Chapter_name
  ├── 0002_[2] Straw_Hat_Luffy.cbz
  └── 0003_[2.5] Omake.cbz

Every image entry must be named by its page number (1.jpg, 002.png, ...).
Pages are merged in order, converted to grayscale at the device size, and
written as one archive grouped by chapter:

  One Piece.cbz
  └── Volume 1/
      ├── Chapter 1.0 - Romance Dawn/000001.jpg ...
      └── Chapter 2.0 - Straw Hat Luffy/000054.jpg ...

Landscape pages become double-wide pages unless --rotate is given.
Upload sends the result to m4k-receiver on the device.

Run 'm4k gen-config' to generate a documented m4k.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = config::CONFIG_FILE_NAME, global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Merge, convert, then save and/or upload
    Build(BuildArgs),
    /// Print a stock m4k.toml with all options documented
    GenConfig,
}

#[derive(clap::Args)]
#[command(group(
    ArgGroup::new("action")
        .required(true)
        .multiple(true)
        .args(["save", "upload"])
))]
struct BuildArgs {
    /// Directory with the chapter archives
    #[arg(long)]
    src: PathBuf,

    /// Name of the merged book
    #[arg(long)]
    name: String,

    /// Where --save writes the archive (defaults to --src)
    #[arg(long)]
    dst: Option<PathBuf>,

    /// Rotate landscape pages instead of making them double-wide
    #[arg(long)]
    rotate: bool,

    /// Save the merged archive to --dst
    #[arg(long)]
    save: bool,

    /// Send the merged archive to --addr
    #[arg(long, requires = "addr")]
    upload: bool,

    /// Receiver address, host[:port]
    #[arg(long)]
    addr: Option<String>,

    /// Delete the chapter archives after a successful build
    #[arg(long)]
    cleanup: bool,

    /// Page width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Page height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Page encoding: jpeg or png
    #[arg(long)]
    encoding: Option<Encoding>,

    /// JPEG quality, 1-100
    #[arg(long)]
    quality: Option<u8>,
}

impl BuildArgs {
    /// Flags override the config file.
    fn apply(&self, config: &mut Config) {
        let device = &mut config.device;
        device.width = self.width.unwrap_or(device.width);
        device.height = self.height.unwrap_or(device.height);
        device.encoding = self.encoding.unwrap_or(device.encoding);
        device.quality = self.quality.unwrap_or(device.quality);
        device.rotate |= self.rotate;
    }

    fn request(&self, config: &Config) -> pipeline::BuildRequest {
        pipeline::BuildRequest {
            source: self.src.clone(),
            name: self.name.clone(),
            destination: self.dst.clone().unwrap_or_else(|| self.src.clone()),
            rotate: config.device.rotate,
            save: self.save,
            upload: if self.upload { self.addr.clone() } else { None },
            cleanup: self.cleanup,
        }
    }
}

fn main() {
    Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        error!("{e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Build(args) => {
            let mut config = config::load_config(&cli.config)?;
            args.apply(&mut config);
            config.validate()?;
            let request = args.request(&config);

            println!("==> Building {} from {}", request.name, request.source.display());
            let (tx, rx) = mpsc::channel();
            let printer = thread::spawn(move || {
                for event in rx {
                    output::print_pipeline_event(&event);
                }
            });
            let result = pipeline::build(&request, &config, Some(tx));
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;

            println!("{}", output::format_build_report(&result?));
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
