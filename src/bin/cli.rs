use clap::Parser;
use shoreline::{GeneratorConfig, MapGenerator};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

/// Генерация водных зон по шаблону карты
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Путь к шаблону в формате TOML
    #[arg(short, long)]
    config: PathBuf,

    /// Куда сохранить отчёт в JSON
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Куда сохранить отладочную картинку
    #[arg(short, long)]
    png: Option<PathBuf>,

    /// Пикселей на тайл
    #[arg(long, default_value_t = 8)]
    scale: u32,

    /// Напечатать текстовый дамп карты
    #[arg(short, long)]
    dump: bool,

    /// Переопределить сид из шаблона
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("shoreline=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    log::info!("Загрузка шаблона {}", cli.config.display());
    let mut config = GeneratorConfig::from_toml_file(&cli.config)?;
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    let mut generator = MapGenerator::new(config)?;
    let report = generator.generate()?;
    log::info!(
        "Озёр: {}, маршрутов: {}, объектов: {}",
        report.lakes.len(),
        report.routes.values().filter(|r| r.is_valid()).count(),
        report.objects.len()
    );

    if let Some(path) = &cli.report {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, report)?;
        log::info!("Отчёт сохранён в {}", path.display());
    }

    if cli.dump {
        print!("{}", generator.text_dump());
    }

    if let Some(path) = &cli.png {
        generator.render(cli.scale).save_as_png(path)?;
        log::info!("Картинка сохранена в {}", path.display());
    }

    Ok(())
}
