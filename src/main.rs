//! i18n-harvest 命令行入口

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand};
use markup5ever_rcdom::RcDom;
use tracing::{info, Level};

use i18n_harvest::core::{harvest_document, read_document, source_url_for_path, HarvestOptions};
use i18n_harvest::error::{HarvestError, HarvestResult};
use i18n_harvest::extraction::config::{ConfigManager, HarvestConfig};
use i18n_harvest::extraction::export::{export_files, write_to_dir};
use i18n_harvest::extraction::language::LanguageSet;
use i18n_harvest::extraction::pipeline::keys::KeyDialect;
use i18n_harvest::extraction::storage::{RedbStorage, Storage};
use i18n_harvest::extraction::store::TranslationStore;
use i18n_harvest::extraction::translate::{translate_page, GoogleTranslator};
use i18n_harvest::extraction::{ExtractionContext, HighlightOverlay, PageAgent};
use i18n_harvest::parsers::html::serialize_document;

#[derive(Debug, Parser)]
#[command(name = "i18n-harvest", author, version, about, long_about = None)]
struct Cli {
    /// 配置文件路径（默认搜索 i18n-harvest.toml 等位置）
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// 翻译库存储文件（覆盖配置）
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// 读取文档时的公共参数
#[derive(Debug, Clone, Args)]
struct DocumentArgs {
    /// HTML 文件
    file: PathBuf,

    /// 输入编码（默认按文档声明）
    #[arg(short, long)]
    encoding: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 从文档中提取文本并合并到翻译库
    Extract {
        #[command(flatten)]
        document: DocumentArgs,

        /// 请求的语言，可重复（ko / en / ja）
        #[arg(short, long = "language")]
        languages: Vec<String>,

        /// 新条目的来源地址（默认为文件的 file:// 地址）
        #[arg(long)]
        source_url: Option<String>,

        /// 键生成规则
        #[arg(long, default_value = "extraction", value_parser = KeyDialect::from_str)]
        key_dialect: KeyDialect,
    },
    /// 输出文档相对于翻译库的进度统计
    Stats {
        #[command(flatten)]
        document: DocumentArgs,
    },
    /// 按语言导出翻译库
    Export {
        /// 输出目录（默认使用配置中的 export_dir）
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// 导出的语言，可重复
        #[arg(short, long = "language")]
        languages: Vec<String>,
    },
    /// 提取韩文并补全英文与日文翻译
    Translate {
        #[command(flatten)]
        document: DocumentArgs,

        #[arg(long)]
        source_url: Option<String>,
    },
    /// 输出带高亮包裹的文档
    Highlight {
        #[command(flatten)]
        document: DocumentArgs,

        /// 输出文件（默认写到标准输出）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 标注指定键的高亮，可重复
        #[arg(long = "annotate")]
        annotate: Vec<String>,
    },
    /// 删除翻译库
    Clear {
        /// 同时删除高亮层的占位条目
        #[arg(long)]
        overlay: bool,
    },
    /// 从标准输入读取一条 JSON 消息并输出应答
    Message {
        #[command(flatten)]
        document: DocumentArgs,
    },
    /// 生成示例配置文件
    InitConfig {
        #[arg(default_value = "i18n-harvest.toml")]
        path: String,
    },
    /// 列出支持的环境变量
    EnvDocs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("错误: {}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.log_level);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("错误: 无法创建运行时: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli.command, config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("错误: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> HarvestResult<HarvestConfig> {
    // init-config 与 env-docs 不依赖现有配置
    if matches!(cli.command, Command::InitConfig { .. } | Command::EnvDocs) {
        return Ok(HarvestConfig::default());
    }

    let manager = match &cli.config {
        Some(path) => ConfigManager::from_path(path)?,
        None => ConfigManager::new()?,
    };
    let mut config = manager.into_config();
    if let Some(store) = &cli.store {
        config.store_path = store.display().to_string();
    }
    Ok(config)
}

fn init_logging(level: &str) {
    let level = Level::from_str(level).unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();
}

async fn run(command: Command, config: HarvestConfig) -> HarvestResult<()> {
    match command {
        Command::Extract {
            document,
            languages,
            source_url,
            key_dialect,
        } => {
            let dom = load(&document)?;
            let mut options = HarvestOptions::from_config(&config);
            options.encoding = document.encoding.clone();
            options.key_dialect = key_dialect;
            options.source_url = source_url
                .or(options.source_url)
                .or_else(|| source_url_for_path(&document.file));
            if !languages.is_empty() {
                options.languages = LanguageSet::parse_codes(&languages)?;
            }

            let (_, report) = harvest_document(&dom, open_storage(&config)?, &options).await?;
            if let Some(e) = report.error {
                return Err(e);
            }
            info!(
                "新建条目 {}，写入字段 {}，跳过 {}",
                report.entries_created, report.fields_written, report.skipped_invalid
            );
            print_json(&report.stats)
        }
        Command::Stats { document } => {
            let dom = load(&document)?;
            let mut context = extraction_context(&dom, &config, None)?;
            let stats = context.reload().await?;
            print_json(&stats)
        }
        Command::Export { out, languages } => {
            let languages = if languages.is_empty() {
                config.languages()
            } else {
                LanguageSet::parse_codes(&languages)?
            };
            let storage = open_storage(&config)?;
            let store = TranslationStore::from_value(storage.get(&config.storage_key).await?)?;
            let files = export_files(&store, languages)?;

            let dir = out.unwrap_or_else(|| PathBuf::from(config.expanded_export_dir()));
            for path in write_to_dir(&dir, &files)? {
                println!("{}", path.display());
            }
            Ok(())
        }
        Command::Translate {
            document,
            source_url,
        } => {
            if !config.translate_enabled {
                return Err(HarvestError::Config("翻译功能已禁用".to_string()));
            }
            let translator =
                GoogleTranslator::new(&config.translate_api_url, config.translate_timeout())?;

            let dom = load(&document)?;
            let source_url = source_url
                .or_else(|| config.source_url.clone())
                .or_else(|| source_url_for_path(&document.file));
            let mut context = extraction_context(&dom, &config, source_url)?;

            let (_, report) = translate_page(&mut context, &translator).await?;
            print_json(&report)
        }
        Command::Highlight {
            document,
            output,
            annotate,
        } => {
            let dom = load(&document)?;
            let mut overlay = HighlightOverlay::for_document(&dom.document, open_storage(&config)?)?
                .with_storage_key(config.overlay_storage_key.clone());
            overlay.start();
            for key in &annotate {
                overlay.click_key(key).await?;
            }

            let html = serialize_document(&dom.document)?;
            match output {
                Some(path) => fs::write(&path, html)
                    .map_err(|e| HarvestError::Io(format!("无法写入 {}: {}", path.display(), e))),
                None => io::stdout().write_all(&html).map_err(HarvestError::from),
            }
        }
        Command::Clear { overlay } => {
            let storage = open_storage(&config)?;
            let mut keys = vec![config.storage_key.as_str()];
            if overlay {
                keys.push(config.overlay_storage_key.as_str());
            }
            storage.remove(&keys).await?;
            info!("已清除: {}", keys.join(", "));
            Ok(())
        }
        Command::Message { document } => {
            let mut raw = String::new();
            io::stdin().read_to_string(&mut raw)?;

            let dom = load(&document)?;
            let source_url = config
                .source_url
                .clone()
                .or_else(|| source_url_for_path(&document.file));
            let context = extraction_context(&dom, &config, source_url)?;
            let overlay = HighlightOverlay::for_document(&dom.document, context.storage())?
                .with_storage_key(config.overlay_storage_key.clone());

            let mut agent = PageAgent::from_parts(context, overlay);
            agent.load_existing().await?;
            println!("{}", agent.handle_json(&raw).await);
            Ok(())
        }
        Command::InitConfig { path } => {
            ConfigManager::generate_example_config(&path)?;
            println!("{}", path);
            Ok(())
        }
        Command::EnvDocs => {
            print!("{}", i18n_harvest::env::generate_env_docs());
            Ok(())
        }
    }
}

fn load(document: &DocumentArgs) -> HarvestResult<RcDom> {
    read_document(&document.file, document.encoding.as_deref())
}

fn open_storage(config: &HarvestConfig) -> HarvestResult<Rc<dyn Storage>> {
    let path = config.expanded_store_path();
    Ok(Rc::new(RedbStorage::open(Path::new(&path))?))
}

fn extraction_context(
    dom: &RcDom,
    config: &HarvestConfig,
    source_url: Option<String>,
) -> HarvestResult<ExtractionContext> {
    let context = ExtractionContext::for_document(&dom.document, open_storage(config)?)?
        .with_storage_key(config.storage_key.clone());
    Ok(match source_url {
        Some(source_url) => context.with_source_url(source_url),
        None => context,
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> HarvestResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
