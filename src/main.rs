use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use nread::{
    cli::Cli,
    config::Config,
    logging::{self, LogLevel},
    models::Block,
    position::{MemoryStore, PositionStore, SharedStore},
    segment::segment_raw,
    source::{self, Novel},
    state::State,
    surface::chapter_blocks,
    ui::reader::{Library, Reader},
};

use clap::Parser;
use eyre::{Result, WrapErr};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(LogLevel::from_flags(cli.verbose, cli.debug));

    if cli.history {
        return print_history();
    }
    if cli.dump {
        // Dumping reads the configured novels but never writes the defaults.
        let config = load_config(&cli, Config::read_existing);
        return dump_content(&cli, &config);
    }
    let config = load_config(&cli, Config::new);
    run_tui(&cli, config)
}

fn load_config(cli: &Cli, default_location: fn() -> Result<Config>) -> Config {
    let loaded = match &cli.config {
        Some(path) => Config::load_from(path.clone()),
        None => default_location(),
    };
    match loaded {
        Ok(config) => config,
        Err(err) => {
            logging::warn(format!("could not load configuration: {}", err));
            logging::warn("starting with default settings");
            Config::with_defaults(std::env::temp_dir().join("nread-configuration.json"))
        }
    }
}

fn print_history() -> Result<()> {
    let state = State::new().wrap_err("could not open reading history")?;
    let history = state.get_from_history()?;
    if history.is_empty() {
        println!("No reading history.");
        return Ok(());
    }
    for (n, item) in history.iter().enumerate() {
        println!(
            "{:>3}  {}  {:<20} {} (row {})",
            n + 1,
            item.last_read.format("%Y-%m-%d %H:%M"),
            item.context,
            item.title.as_deref().unwrap_or("-"),
            item.offset
        );
    }
    Ok(())
}

/// Print the segmented blocks of the selected text. Storage is left alone.
fn dump_content(cli: &Cli, config: &Config) -> Result<()> {
    let blocks = if let Some(dir) = &cli.chapters {
        let id = match &cli.chapter {
            Some(id) => id.clone(),
            None => source::list_chapter_ids(dir)?
                .into_iter()
                .next()
                .ok_or_else(|| eyre::eyre!("no chapters in {}", dir.display()))?,
        };
        chapter_blocks(&source::read_chapter(dir, &id)?)
    } else {
        let catalog = source::catalog_from(&config.settings.novels, &cli.files);
        let novel = cli
            .novel
            .as_deref()
            .and_then(|key| catalog.iter().find(|n| n.key == key))
            .or_else(|| catalog.first())
            .ok_or_else(|| eyre::eyre!("no novel to dump"))?;
        segment_raw(&source::load_novel_text(&novel.file))
    };
    print!("{}", render_dump(&blocks));
    Ok(())
}

fn render_dump(blocks: &[Block]) -> String {
    let rendered: Vec<String> = blocks
        .iter()
        .map(|block| match block {
            Block::Heading(heading) => format!("# {}", heading.title),
            Block::Paragraph(text) => text.clone(),
        })
        .collect();
    let mut out = rendered.join("\n\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

/// Durable tier backed by the state database, or memory when it cannot open.
fn open_storage() -> (SharedStore, Option<Rc<RefCell<State>>>) {
    match State::new() {
        Ok(state) => {
            let state = Rc::new(RefCell::new(state));
            let durable: SharedStore = state.clone();
            (durable, Some(state))
        }
        Err(err) => {
            logging::warn(format!(
                "could not open state database, positions will not persist: {}",
                err
            ));
            let durable: SharedStore = MemoryStore::shared();
            (durable, None)
        }
    }
}

fn run_tui(cli: &Cli, config: Config) -> Result<()> {
    let (durable, history) = open_storage();
    let positions = PositionStore::new(durable, MemoryStore::shared());

    let library = match &cli.chapters {
        Some(dir) => chapter_library(dir, cli.chapter.as_deref())?,
        None => {
            let catalog = source::catalog_from(&config.settings.novels, &cli.files);
            let key = source::resolve_novel(cli.novel.as_deref(), &positions, &catalog)
                .map(|novel: &Novel| novel.key.clone())
                .ok_or_else(|| {
                    eyre::eyre!("no novels to read: pass a text file or configure \"novels\"")
                })?;
            let current = catalog.iter().position(|n| n.key == key).unwrap_or(0);
            Library::Novels { catalog, current }
        }
    };

    let mut reader = Reader::new(config, positions, history, library)?;
    reader.run()
}

fn chapter_library(dir: &Path, requested: Option<&str>) -> Result<Library> {
    let ids = source::list_chapter_ids(dir)?;
    if ids.is_empty() {
        eyre::bail!("no chapters in {}", dir.display());
    }
    let current = match requested {
        Some(id) => ids
            .iter()
            .position(|i| i == id)
            .ok_or_else(|| eyre::eyre!("no chapter {} in {}", id, dir.display()))?,
        None => 0,
    };
    Ok(Library::Chapters {
        dir: dir.to_path_buf(),
        ids,
        current,
    })
}
