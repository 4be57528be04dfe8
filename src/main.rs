use clap::Parser;
use litreview_rust::{cli, config, error, logging, pipeline, scanner};
use cli::{Cli, CombineArgs, Commands};
use config::{Config, LOCAL_CONFIG_FILE};
use error::{LitReviewError, Result};
use litreview_common::{is_normalized, KeywordGrid};
use pipeline::Workspace;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\n❌ {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone();
    let mut config = match &config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(dir) = cli.searches {
        config.searches_dir = dir;
    }
    if let Some(dir) = cli.output {
        config.output_dir = dir;
    }
    let workspace = Workspace::new(config.searches_dir.clone(), config.output_dir.clone());

    // 引数なしは統合のみ（正規化済みファイルに対する繰り返し実行）
    let command = cli.command.unwrap_or(Commands::Combine {
        source: Vec::new(),
        options: CombineArgs::default(),
    });

    match command {
        Commands::Combine { source, options } => {
            println!("📚 litreview - 検索結果の統合\n");
            apply_combine_args(&mut config, &options)?;
            let grid = pipeline::load_keywords(&workspace)?;
            run_combine(&config, &workspace, &grid, &source)?;
            println!("\n✅ 統合完了");
        }

        Commands::Format { source, min_pages } => {
            println!("📚 litreview - 検索結果の正規化\n");
            if let Some(n) = min_pages {
                config.min_pages = n;
            }
            let grid = pipeline::load_keywords(&workspace)?;
            run_format(&config, &workspace, &grid, &source)?;
            println!("\n✅ 正規化完了");
        }

        Commands::Original { source } => {
            println!("📚 litreview - 生データの連結\n");
            let grid = pipeline::load_keywords(&workspace)?;
            run_original(&config, &workspace, &grid, &source)?;
            println!("\n✅ 連結完了");
        }

        Commands::Run { source, min_pages, options } => {
            println!("🚀 litreview - 一括処理\n");
            if let Some(n) = min_pages {
                config.min_pages = n;
            }
            apply_combine_args(&mut config, &options)?;
            let grid = pipeline::load_keywords(&workspace)?;
            run_batch(&config, &workspace, &grid, &source)?;
            println!("\n✅ 完了");
        }

        Commands::Check { source } => {
            run_check(&config, &workspace, &source)?;
        }

        Commands::Config { show, init } => {
            if init {
                let path = config_path.unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG_FILE));
                if path.exists() {
                    return Err(LitReviewError::Config(format!(
                        "設定ファイルが既に存在します: {}",
                        path.display()
                    )));
                }
                Config::default().save(&path)?;
                println!("✔ 設定ファイルを作成しました: {}", path.display());
            }

            if show || !init {
                println!("設定:");
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}

fn apply_combine_args(config: &mut Config, args: &CombineArgs) -> Result<()> {
    if let Some(audit) = args.duplicate_audit {
        config.duplicate_audit = audit;
    }
    if let Some(policy) = args.cap_policy {
        config.cap_policy = policy;
    }
    if let Some(cap) = args.relevance_cap {
        config.relevance_cap = cap;
    }
    config.validate()
}

/// グリッドファイルが揃っているか確認
fn preflight(config: &Config, workspace: &Workspace, source: &str) -> Result<()> {
    let ids: Vec<&str> = config.sources.iter().map(|s| s.id.as_str()).collect();
    scanner::scan_searches(&workspace.searches_dir, &ids)?.require_complete(source)
}

fn run_format(config: &Config, workspace: &Workspace, grid: &KeywordGrid, ids: &[String]) -> Result<()> {
    for profile in config.select_sources(ids)? {
        preflight(config, workspace, &profile.id)?;
        println!("- {}: 正規化中...", profile.id);
        let report = pipeline::format_searches(workspace, profile, grid, config.min_pages)?;
        println!(
            "✔ {}: {}ファイルを正規化（{}ファイルは処理済み）",
            profile.id, report.files_normalized, report.files_skipped
        );
        println!(
            "  残り {}件 / 除外: ページ数不足 {}件, ページ番号不正 {}件",
            report.kept_rows, report.short_rows, report.invalid_rows
        );
    }
    Ok(())
}

fn run_original(config: &Config, workspace: &Workspace, grid: &KeywordGrid, ids: &[String]) -> Result<()> {
    for profile in config.select_sources(ids)? {
        preflight(config, workspace, &profile.id)?;
        let table = pipeline::combine_original(workspace, &profile.id, grid)?;
        println!(
            "✔ {}: {}件 → {}",
            profile.id,
            table.len(),
            workspace.original_path(&profile.id).display()
        );
    }
    Ok(())
}

fn run_combine(config: &Config, workspace: &Workspace, grid: &KeywordGrid, ids: &[String]) -> Result<()> {
    let options = config.aggregate_options();
    println!(
        "- 上限: キーワードあたり{}件 ({}) / 重複監査: {}",
        options.relevance_cap, options.cap_policy, options.duplicate_audit
    );

    for profile in config.select_sources(ids)? {
        preflight(config, workspace, &profile.id)?;
        println!("- {}: 統合中...", profile.id);
        let report = pipeline::combine_csv(workspace, profile, grid, &options)?;
        let s = &report.summary;
        println!(
            "✔ {}: 入力 {}件 → 統合 {}件（重複 {}件, 上限超過 {}件）",
            profile.id, s.input_rows, s.combined_rows, s.duplicate_rows, s.over_cap_rows
        );
        println!("  出力: {}", workspace.combined_path(&profile.id).display());
    }
    Ok(())
}

fn run_batch(config: &Config, workspace: &Workspace, grid: &KeywordGrid, ids: &[String]) -> Result<()> {
    let options = config.aggregate_options();

    for profile in config.select_sources(ids)? {
        preflight(config, workspace, &profile.id)?;
        println!("- {}: 生データ連結 → 正規化 → 統合", profile.id);
        let report = pipeline::run_source(workspace, profile, grid, config.min_pages, &options)?;

        match report.original_rows {
            Some(n) => println!(
                "  [1/3] 生データ {}件 → {}",
                n,
                workspace.original_path(&profile.id).display()
            ),
            None => println!("  [1/3] 生データ: 既存のスナップショットを保持"),
        }
        let f = &report.format;
        println!(
            "  [2/3] 正規化 {}ファイル（処理済み {}）/ 除外: ページ数不足 {}件, ページ番号不正 {}件",
            f.files_normalized, f.files_skipped, f.short_rows, f.invalid_rows
        );
        let s = &report.combine.summary;
        println!(
            "  [3/3] 統合 {}件（重複 {}件, 上限超過 {}件）→ {}",
            s.combined_rows,
            s.duplicate_rows,
            s.over_cap_rows,
            workspace.combined_path(&profile.id).display()
        );
    }
    Ok(())
}

fn run_check(config: &Config, workspace: &Workspace, ids: &[String]) -> Result<()> {
    println!("🔍 litreview - 入力チェック\n");

    let profiles = config.select_sources(ids)?;
    let all_ids: Vec<&str> = config.sources.iter().map(|s| s.id.as_str()).collect();
    let report = scanner::scan_searches(&workspace.searches_dir, &all_ids)?;
    let mut first_error = None;

    match pipeline::load_keywords(workspace) {
        Ok(_) => println!("✔ キーワードグリッド: {}", workspace.keywords_path().display()),
        Err(e) => {
            println!("✖ キーワードグリッド: {}", e);
            first_error = Some(e);
        }
    }

    for profile in profiles {
        let missing = report.missing(&profile.id);
        let found: Vec<_> = report.found.iter().filter(|f| f.source == profile.id).collect();

        let mut normalized = 0;
        for file in &found {
            match pipeline::read_table(&file.path) {
                Ok(loaded) if is_normalized(&loaded.table) => normalized += 1,
                Ok(_) => {}
                Err(e) => println!("  ✖ {}: {}", file.path.display(), e),
            }
        }

        println!(
            "{} {}: {}/16ファイル（正規化済み {}）",
            if missing.is_empty() { "✔" } else { "✖" },
            profile.id,
            found.len(),
            normalized
        );
        if !missing.is_empty() {
            println!("  不足: {}", missing.join(", "));
            if first_error.is_none() {
                first_error = Some(LitReviewError::MissingGridFiles {
                    source_id: profile.id.clone(),
                    files: missing,
                });
            }
        }
    }

    for path in &report.unexpected {
        println!("  ? 対象外のCSV: {}", path.display());
    }

    match first_error {
        Some(e) => Err(e),
        None => {
            println!("\n✅ チェック完了");
            Ok(())
        }
    }
}
