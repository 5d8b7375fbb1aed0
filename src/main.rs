//! # asset-probe — 资源诊断工具
//!
//! 对某个资源目录运行加载流水线，每个资源键输出一行：尺寸与命中的策略。
//! 日志级别由 `RUST_LOG` 控制，默认 `info`。

use clap::Parser;
use std::path::PathBuf;

use greenfarm_assets::asset_loader::{AssetLoader, DirectorySource, LoaderConfig, decorate};
use greenfarm_assets::AppError;

#[derive(Parser)]
#[command(name = "asset-probe")]
#[command(
    about = "Probe legacy Green Farm assets with the multi-strategy loader",
    long_about = None
)]
#[command(version)]
struct Args {
    /// Asset root directory
    #[arg(value_name = "ROOT")]
    root: PathBuf,

    /// Asset keys relative to ROOT
    #[arg(value_name = "KEYS")]
    keys: Vec<String>,

    /// JSON loader configuration
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Run the configured preload before probing keys
    #[arg(long, default_value_t)]
    preload: bool,

    /// Probe numbered assets 0..N
    #[arg(long, value_name = "N")]
    numbers: Option<u32>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run(Args::parse()) {
        log::error!("❌ {}", err);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), AppError> {
    if !args.root.is_dir() {
        return Err(AppError::Usage(format!("资源目录不存在：{}", args.root.display())));
    }

    let config = match &args.config {
        Some(path) => LoaderConfig::from_json_file(path)?,
        None => LoaderConfig::default(),
    };
    let source = DirectorySource::new(args.root.clone(), config.max_blob_size);
    let mut loader = AssetLoader::new(source, config);

    if args.preload {
        let summary = loader.preload();
        println!(
            "preload: loaded={} skipped={} cached={}",
            summary.loaded, summary.skipped, summary.cached
        );
    }

    for key in &args.keys {
        report(&mut loader, key);
    }

    if let Some(count) = args.numbers {
        for number in 0..count {
            let key = loader.config().numbered_key(number);
            match loader.load_by_number(number) {
                Some(image) => println!("#{:<4} {}x{}", number, image.width(), image.height()),
                None => println!("#{:<4} -  ({})", number, key),
            }
        }
    }

    println!("cache={} skipped={}", loader.size(), loader.skipped_len());
    Ok(())
}

fn report(loader: &mut AssetLoader<DirectorySource>, key: &str) {
    match loader.load(key) {
        Some(image) => {
            let label = loader
                .origin(key)
                .map(|origin| decorate(key, &origin))
                .unwrap_or_else(|| key.to_string());
            println!("{:<40} {}x{}", label, image.width(), image.height());
        }
        None if loader.is_skipped(key) => println!("{:<40} skipped", key),
        None => println!("{:<40} absent", key),
    }
}
