use anyhow::Context;
use clap::Parser;
use kicad_zip::config::args::{Command, ExportArgs, LinkArgs, ListArgs};
use kicad_zip::config::toml_config::FileConfig;
use kicad_zip::config::skip_prefixes;
use kicad_zip::core::collector::{CollectOptions, ProjectCollector};
use kicad_zip::core::installer::Replaced;
use kicad_zip::domain::model::DEFAULT_EXTERNAL_DIR;
use kicad_zip::utils::error::ErrorSeverity;
use kicad_zip::utils::validation::{resolve_board_path, Validate};
use kicad_zip::utils::logger;
use kicad_zip::{
    link_plugin, CliConfig, ExportEngine, ExportError, ExportSettings, LinkSettings,
    LocalStorage, ZipExportPipeline,
};

fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::debug!("CLI config: {:?}", cli);

    let outcome = FileConfig::load(cli.config.as_deref())
        .and_then(|file| file.validate().map(|_| file))
        .map_err(anyhow::Error::from)
        .and_then(|file| match &cli.command {
            Command::Export(args) => run_export(args, &file),
            Command::List(args) => run_list(args, &file),
            Command::Link(args) => run_link(args, &file),
        });

    if let Err(e) = outcome {
        fail(e);
    }
    Ok(())
}

fn run_export(args: &ExportArgs, file: &FileConfig) -> anyhow::Result<()> {
    let settings = ExportSettings::resolve(&args.board, &args.overrides(), file)?;
    tracing::info!("Exporting {}", settings.board_path.display());

    let pipeline = ZipExportPipeline::new(LocalStorage::default(), settings);
    let engine = ExportEngine::new(pipeline);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - nothing will be written");
        let plan = engine.preview()?;
        println!("Would write {}:", plan.output_path.display());
        for entry in &plan.entries {
            println!("  {}", entry.archive_path);
        }
        for excluded in &plan.excluded {
            println!("  (excluded) {}", excluded);
        }
        println!(
            "{} files, {} from external libraries",
            plan.entries.len(),
            plan.external_count()
        );
        print_warnings(&plan.warnings);
        return Ok(());
    }

    let summary = engine.run()?;
    tracing::info!("✅ Export completed");
    println!("✅ {}", summary.message());

    if let Some(report_path) = &args.report {
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(report_path, json)
            .with_context(|| format!("writing report to {}", report_path.display()))?;
        tracing::info!("Report saved to {}", report_path.display());
    }
    Ok(())
}

fn run_list(args: &ListArgs, file: &FileConfig) -> anyhow::Result<()> {
    let board_path = resolve_board_path(&args.board)?;
    let options = CollectOptions {
        skip_prefixes: skip_prefixes(file),
        include_footprints: !args.no_footprints
            && file.export.include_footprints.unwrap_or(true),
    };
    let mut collector = ProjectCollector::with_options(&board_path, options);
    let closure = collector.collect_all();
    let external_dir = file
        .export
        .external_dir
        .as_deref()
        .unwrap_or(DEFAULT_EXTERNAL_DIR);
    let groups = closure.files_by_category(external_dir);

    if args.json {
        let listing: Vec<_> = groups
            .iter()
            .map(|(category, files)| {
                serde_json::json!({ "category": category.label(), "files": files })
            })
            .collect();
        let output = serde_json::json!({
            "project": closure.project_name,
            "categories": listing,
            "warnings": closure.warnings,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", closure.project_name);
    for (category, files) in &groups {
        println!("  {} ({})", category.label(), files.len());
        for name in files {
            println!("    {}", name);
        }
    }
    print_warnings(&closure.warnings);
    Ok(())
}

fn run_link(args: &LinkArgs, file: &FileConfig) -> anyhow::Result<()> {
    let settings = LinkSettings::resolve(&args.overrides(), file)?;
    let outcome = link_plugin(&settings.source, &settings.target)?;

    let action = match outcome.replaced {
        Some(Replaced::Symlink) => "Relinked",
        Some(Replaced::File | Replaced::Directory) => "Replaced and linked",
        None => "Linked",
    };
    println!(
        "{} {} -> {}",
        action,
        outcome.target.display(),
        outcome.source.display()
    );
    Ok(())
}

fn print_warnings(warnings: &[String]) {
    if warnings.is_empty() {
        return;
    }
    println!("\nWarnings: {}", warnings.len());
    for warning in warnings {
        println!("  - {}", warning);
    }
}

fn fail(error: anyhow::Error) -> ! {
    let Some(e) = error.downcast_ref::<ExportError>() else {
        tracing::error!("❌ {:#}", error);
        eprintln!("❌ {:#}", error);
        std::process::exit(1);
    };

    tracing::error!(
        "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
