//! パイプライン統合テスト
//!
//! 一時フォルダに keywords.csv と16ファイル分の検索結果を作り、
//! original → format → combine の出力を検証する。

use litreview_common::{
    columns, AggregateOptions, CapPolicy, DuplicateAudit, KeywordGrid, ResultTable, SourceProfile,
};
use litreview_rust::error::LitReviewError;
use litreview_rust::pipeline::{self, RemovedKind, Workspace};
use std::collections::HashSet;
use std::fs;
use tempfile::{tempdir, TempDir};

const KEYWORDS: &str = "\
c1,c2,c3,c4
k11,k12,k13,k14
k21,k22,k23,k24
k31,k32,k33,k34
k41,k42,k43,k44
";

fn setup() -> (TempDir, Workspace, KeywordGrid) {
    let dir = tempdir().expect("Failed to create temp dir");
    let searches = dir.path().join("searches");
    fs::create_dir_all(&searches).unwrap();
    fs::write(searches.join("keywords.csv"), KEYWORDS).unwrap();

    let ws = Workspace::new(searches, dir.path().join("output"));
    let grid = pipeline::load_keywords(&ws).expect("キーワード読み込み失敗");
    (dir, ws, grid)
}

/// ACM形式: (title, author, num_pages)
fn acm_csv(rows: &[(String, String, String)]) -> String {
    let mut out = String::from("id,title,author,num_pages\n");
    for (i, (title, author, pages)) in rows.iter().enumerate() {
        out.push_str(&format!("{},{},{},{}\n", i + 1, title, author, pages));
    }
    out
}

/// IEEE形式: (title, author, start, end)
fn ieee_csv(rows: &[(&str, &str, &str, &str)]) -> String {
    let mut out = String::from("Document Title,Authors,Start Page,End Page,PDF Link\n");
    for (title, author, start, end) in rows {
        out.push_str(&format!("{},{},{},{},https://example.org/{}\n", title, author, start, end, title));
    }
    out
}

/// ACMの1行（10ページ）
fn paper(title: &str) -> (String, String, String) {
    (title.to_string(), "Author".to_string(), "10".to_string())
}

fn write_search(ws: &Workspace, name: &str, content: &str) {
    fs::write(ws.searches_dir.join(name), content).unwrap();
}

/// 全セルに、セル固有のタイトルを持つACM行を `n` 件ずつ書く
fn fill_acm(ws: &Workspace, n: usize) {
    for r in 1..=4 {
        for c in 1..=4 {
            let rows: Vec<_> = (0..n)
                .map(|i| (format!("ACM {}-{} paper {}", r, c, i), "Author".to_string(), "10".to_string()))
                .collect();
            write_search(ws, &format!("ACM0{}-{}.csv", r, c), &acm_csv(&rows));
        }
    }
}

fn read(path: &std::path::Path) -> ResultTable {
    pipeline::read_table(path).expect("出力CSVの読み込み失敗").table
}

fn count_status(table: &ResultTable, status: &str) -> usize {
    (0..table.len())
        .filter(|&i| table.get(i, columns::DEDUPE_STATUS) == Some(status))
        .count()
}

#[test]
fn test_ieee_format_removes_short_and_invalid_rows() {
    let (_dir, ws, grid) = setup();
    for r in 1..=4 {
        for c in 1..=4 {
            let title = format!("IEEE{}{}", r, c);
            write_search(&ws, &format!("IEEE0{}-{}.csv", r, c), &ieee_csv(&[(title.as_str(), "A", "1", "30")]));
        }
    }
    write_search(
        &ws,
        "IEEE01-1.csv",
        &ieee_csv(&[("Short", "A", "10", "12"), ("Broken", "B", "abc", "5"), ("Long", "C", "1", "20")]),
    );

    let report = pipeline::format_searches(&ws, &SourceProfile::ieee(), &grid, 5).unwrap();
    assert_eq!(report.files_normalized, 16);
    assert_eq!(report.short_rows, 1);
    assert_eq!(report.invalid_rows, 1);

    let formatted = read(&ws.searches_dir.join("IEEE01-1.csv"));
    assert_eq!(formatted.len(), 1);
    assert_eq!(formatted.get(0, "title"), Some("Long"));
    assert_eq!(formatted.get(0, "author"), Some("C"));
    assert_eq!(formatted.get(0, "num_pages"), Some("19"));
    assert_eq!(formatted.get(0, "keyword"), Some("k11"));
    assert!(!formatted.has_column("Document Title"));

    let short = read(&ws.removed_path("IEEE", RemovedKind::Short));
    assert_eq!(short.len(), 1);
    assert_eq!(short.get(0, "title"), Some("Short"));

    let invalid = read(&ws.removed_path("IEEE", RemovedKind::Invalid));
    assert_eq!(invalid.len(), 1);
    assert_eq!(invalid.get(0, "title"), Some("Broken"));
}

#[test]
fn test_format_twice_is_noop() {
    let (_dir, ws, grid) = setup();
    fill_acm(&ws, 3);
    write_search(
        &ws,
        "ACM02-2.csv",
        &acm_csv(&[
            ("Tiny".to_string(), "X".to_string(), "2".to_string()),
            ("Full".to_string(), "Y".to_string(), "12".to_string()),
        ]),
    );

    pipeline::format_searches(&ws, &SourceProfile::acm(), &grid, 5).unwrap();
    let file_before = fs::read(ws.searches_dir.join("ACM02-2.csv")).unwrap();
    let short_before = fs::read(ws.removed_path("ACM", RemovedKind::Short)).unwrap();

    let report = pipeline::format_searches(&ws, &SourceProfile::acm(), &grid, 5).unwrap();
    assert_eq!(report.files_normalized, 0);
    assert_eq!(report.files_skipped, 16);
    assert_eq!(fs::read(ws.searches_dir.join("ACM02-2.csv")).unwrap(), file_before);
    assert_eq!(fs::read(ws.removed_path("ACM", RemovedKind::Short)).unwrap(), short_before);
}

#[test]
fn test_reformat_after_new_export_keeps_previous_audit() {
    let (_dir, ws, grid) = setup();
    fill_acm(&ws, 1);
    write_search(&ws, "ACM01-1.csv", &acm_csv(&[("Old short".to_string(), "X".to_string(), "1".to_string())]));
    pipeline::format_searches(&ws, &SourceProfile::acm(), &grid, 5).unwrap();

    // 1ファイルだけ新しいエクスポートで置き換える
    write_search(&ws, "ACM03-3.csv", &acm_csv(&[("New short".to_string(), "Y".to_string(), "2".to_string())]));
    let report = pipeline::format_searches(&ws, &SourceProfile::acm(), &grid, 5).unwrap();
    assert_eq!(report.files_normalized, 1);
    assert_eq!(report.files_skipped, 15);

    let short = read(&ws.removed_path("ACM", RemovedKind::Short));
    let titles: Vec<_> = (0..short.len()).filter_map(|i| short.get(i, "title")).collect();
    assert_eq!(titles, ["Old short", "New short"]);
}

#[test]
fn test_duplicate_across_keyword_files() {
    let (_dir, ws, grid) = setup();
    fill_acm(&ws, 2);
    let foo = ("Foo".to_string(), "Bar".to_string(), "10".to_string());
    write_search(&ws, "ACM01-1.csv", &acm_csv(&[foo.clone(), ("Only 11".to_string(), "Z".to_string(), "9".to_string())]));
    write_search(&ws, "ACM02-3.csv", &acm_csv(&[("Only 23".to_string(), "Z".to_string(), "9".to_string()), foo]));

    pipeline::format_searches(&ws, &SourceProfile::acm(), &grid, 5).unwrap();
    let report = pipeline::combine_csv(&ws, &SourceProfile::acm(), &grid, &AggregateOptions::default()).unwrap();

    let combined = read(&ws.combined_path("ACM"));
    assert_eq!(combined, report.combined);
    let foo_rows: Vec<usize> = (0..combined.len())
        .filter(|&i| combined.get(i, "title") == Some("Foo"))
        .collect();
    assert_eq!(foo_rows.len(), 1);
    assert_eq!(combined.get(foo_rows[0], "keyword"), Some("k11"));

    let duplicates = read(&ws.removed_path("ACM", RemovedKind::Duplicate));
    assert_eq!(duplicates.len(), 2);
    assert!((0..2).all(|i| duplicates.get(i, "title") == Some("Foo")));
    assert_eq!(count_status(&duplicates, "kept"), 1);
    assert_eq!(count_status(&duplicates, "dropped"), 1);
    assert_eq!(duplicates.get(1, "keyword"), Some("k23"));
    assert_eq!(report.summary.duplicate_rows, 1);
}

#[test]
fn test_relevance_cap_per_keyword() {
    let (_dir, ws, grid) = setup();
    fill_acm(&ws, 1);
    let many: Vec<_> = (0..60)
        .map(|i| (format!("Ranked {}", i), "Author".to_string(), "8".to_string()))
        .collect();
    write_search(&ws, "ACM01-1.csv", &acm_csv(&many));

    pipeline::format_searches(&ws, &SourceProfile::acm(), &grid, 5).unwrap();
    let report = pipeline::combine_csv(&ws, &SourceProfile::acm(), &grid, &AggregateOptions::default()).unwrap();

    let combined = read(&ws.combined_path("ACM"));
    let k11 = (0..combined.len())
        .filter(|&i| combined.get(i, "keyword") == Some("k11"))
        .count();
    assert_eq!(k11, 50);
    assert_eq!(combined.get(49, "title"), Some("Ranked 49"));

    let relevant = read(&ws.removed_path("ACM", RemovedKind::Relevant));
    assert_eq!(relevant.len(), 10);
    assert_eq!(relevant.get(0, "title"), Some("Ranked 50"));
    assert!((0..10).all(|i| relevant.get(i, "keyword") == Some("k11")));

    assert_eq!(report.summary.keywords[0].over_cap, 10);
    assert_eq!(report.summary.combined_rows, 50 + 15);
}

#[test]
fn test_invariants_and_partition() {
    let (_dir, ws, grid) = setup();
    let mut raw_rows = 0;
    for r in 1..=4usize {
        for c in 1..=4usize {
            let n = r * 17 + c * 5;
            let rows: Vec<_> = (0..n)
                .map(|i| {
                    let pages = if i % 11 == 0 { "n/a".to_string() } else { ((i % 9) + 1).to_string() };
                    (format!("Paper {}", (i * (r + 1) + c) % 70), format!("Author {}", i % 3), pages)
                })
                .collect();
            raw_rows += rows.len();
            write_search(&ws, &format!("ACM0{}-{}.csv", r, c), &acm_csv(&rows));
        }
    }

    let format = pipeline::format_searches(&ws, &SourceProfile::acm(), &grid, 5).unwrap();
    assert_eq!(format.kept_rows + format.short_rows + format.invalid_rows, raw_rows);

    let normalized_rows: usize = grid
        .cells()
        .map(|cell| read(&ws.search_file("ACM", &cell)).len())
        .sum();
    assert_eq!(normalized_rows, format.kept_rows);

    let options = AggregateOptions {
        relevance_cap: 20,
        ..Default::default()
    };
    let report = pipeline::combine_csv(&ws, &SourceProfile::acm(), &grid, &options).unwrap();

    let combined = read(&ws.combined_path("ACM"));
    let duplicates = read(&ws.removed_path("ACM", RemovedKind::Duplicate));
    let relevant = read(&ws.removed_path("ACM", RemovedKind::Relevant));

    // ページ数 ≥ 5
    for i in 0..combined.len() {
        let pages: i64 = combined.get(i, "num_pages").unwrap().parse().unwrap();
        assert!(pages >= 5, "row {} has {} pages", i, pages);
    }

    // (title, author) が一意
    let mut keys = HashSet::new();
    for i in 0..combined.len() {
        let key = (combined.get(i, "title").unwrap(), combined.get(i, "author").unwrap());
        assert!(keys.insert(key), "duplicate key {:?}", key);
    }

    // キーワードあたり上限以下
    for cell in grid.cells() {
        let n = (0..combined.len())
            .filter(|&i| combined.get(i, "keyword") == Some(cell.keyword))
            .count();
        assert!(n <= 20, "{} contributes {}", cell.keyword, n);
    }

    // 各行は統合結果・重複(削除)・上限超過のいずれか1つだけに入る
    assert_eq!(
        combined.len() + count_status(&duplicates, "dropped") + relevant.len(),
        normalized_rows
    );
    assert_eq!(report.summary.input_rows, normalized_rows);
}

#[test]
fn test_combine_is_idempotent() {
    let (_dir, ws, grid) = setup();
    fill_acm(&ws, 30);
    // 先頭30件は ACM01-1 と重複、残りは上限で切られる
    let rows: Vec<(String, String, String)> = (0..90)
        .map(|i| (format!("ACM 1-1 paper {}", i), "Author".to_string(), "7".to_string()))
        .collect();
    write_search(&ws, "ACM04-4.csv", &acm_csv(&rows));
    pipeline::format_searches(&ws, &SourceProfile::acm(), &grid, 5).unwrap();

    let paths = [
        ws.combined_path("ACM"),
        ws.removed_path("ACM", RemovedKind::Duplicate),
        ws.removed_path("ACM", RemovedKind::Relevant),
    ];

    pipeline::combine_csv(&ws, &SourceProfile::acm(), &grid, &AggregateOptions::default()).unwrap();
    let first: Vec<Vec<u8>> = paths.iter().map(|p| fs::read(p).unwrap()).collect();

    pipeline::combine_csv(&ws, &SourceProfile::acm(), &grid, &AggregateOptions::default()).unwrap();
    let second: Vec<Vec<u8>> = paths.iter().map(|p| fs::read(p).unwrap()).collect();

    assert_eq!(first, second);
}

#[test]
fn test_combine_original_snapshot() {
    let (_dir, ws, grid) = setup();
    fill_acm(&ws, 3);

    let original = pipeline::combine_original(&ws, "ACM", &grid).unwrap();
    assert_eq!(original.len(), 48);
    assert_eq!(original.get(0, "keyword"), Some("k11"));
    assert_eq!(original.get(47, "keyword"), Some("k44"));
    assert_eq!(read(&ws.original_path("ACM")), original);
}

#[test]
fn test_malformed_lines_are_skipped() {
    let (_dir, ws, grid) = setup();
    fill_acm(&ws, 1);
    write_search(
        &ws,
        "ACM01-1.csv",
        "id,title,author,num_pages\n1,Good,A,10\n2,Bad,B,10,extra,fields\n3,Also good,C,10\n",
    );

    let original = pipeline::combine_original(&ws, "ACM", &grid).unwrap();
    assert_eq!(original.len(), 2 + 15);
}

#[test]
fn test_missing_search_file_is_fatal() {
    let (_dir, ws, grid) = setup();
    fill_acm(&ws, 1);
    pipeline::format_searches(&ws, &SourceProfile::acm(), &grid, 5).unwrap();
    fs::remove_file(ws.searches_dir.join("ACM03-2.csv")).unwrap();

    let err = pipeline::combine_csv(&ws, &SourceProfile::acm(), &grid, &AggregateOptions::default()).unwrap_err();
    assert!(matches!(err, LitReviewError::FileNotFound(ref p) if p.ends_with("ACM03-2.csv")));
}

#[test]
fn test_combine_rejects_unformatted_acm() {
    let (_dir, ws, grid) = setup();
    for r in 1..=4 {
        for c in 1..=4 {
            let rows = [
                (format!("Long {}-{}", r, c), "A".to_string(), "10".to_string()),
                (format!("Short {}-{}", r, c), "B".to_string(), "2".to_string()),
            ];
            write_search(&ws, &format!("ACM0{}-{}.csv", r, c), &acm_csv(&rows));
        }
    }

    let err = pipeline::combine_csv(&ws, &SourceProfile::acm(), &grid, &AggregateOptions::default()).unwrap_err();
    assert!(matches!(err, LitReviewError::NotNormalized { ref path } if path.ends_with("ACM01-1.csv")));
    assert!(!ws.combined_path("ACM").exists());
}

#[test]
fn test_combine_unformatted_ieee_is_rejected() {
    let (_dir, ws, grid) = setup();
    for r in 1..=4 {
        for c in 1..=4 {
            write_search(&ws, &format!("IEEE0{}-{}.csv", r, c), &ieee_csv(&[("T", "A", "1", "30")]));
        }
    }

    let err = pipeline::combine_csv(&ws, &SourceProfile::ieee(), &grid, &AggregateOptions::default()).unwrap_err();
    assert!(matches!(err, LitReviewError::NotNormalized { .. }));
}

#[test]
fn test_combine_normalized_file_without_author_fails_on_missing_column() {
    let (_dir, ws, grid) = setup();
    fill_acm(&ws, 1);
    pipeline::format_searches(&ws, &SourceProfile::acm(), &grid, 5).unwrap();
    write_search(&ws, "ACM02-1.csv", "title,num_pages,normalized
No author,10,1
");

    let err = pipeline::combine_csv(&ws, &SourceProfile::acm(), &grid, &AggregateOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        LitReviewError::Table {
            source: litreview_common::Error::MissingColumn(_),
            ..
        }
    ));
}

#[test]
fn test_run_source_snapshots_raw_data_before_formatting() {
    let (_dir, ws, grid) = setup();
    for r in 1..=4 {
        for c in 1..=4 {
            let rows = [
                (format!("Long {}-{}", r, c), "A".to_string(), "10".to_string()),
                (format!("Short {}-{}", r, c), "B".to_string(), "2".to_string()),
            ];
            write_search(&ws, &format!("ACM0{}-{}.csv", r, c), &acm_csv(&rows));
        }
    }

    let profile = SourceProfile::acm();
    let options = AggregateOptions::default();
    let report = pipeline::run_source(&ws, &profile, &grid, 5, &options).unwrap();
    assert_eq!(report.original_rows, Some(32));
    assert_eq!(report.format.short_rows, 16);
    assert_eq!(report.combine.summary.combined_rows, 16);

    let original = read(&ws.original_path("ACM"));
    assert_eq!(original.len(), 32);
    assert!(!original.has_column(columns::NORMALIZED));
    assert_eq!(original.get(1, "title"), Some("Short 1-1"));
    assert_eq!(original.get(1, "num_pages"), Some("2"));

    // 2回目は入力が正規化済みなので、最初のスナップショットを残す
    let snapshot = fs::read(ws.original_path("ACM")).unwrap();
    let again = pipeline::run_source(&ws, &profile, &grid, 5, &options).unwrap();
    assert_eq!(again.original_rows, None);
    assert_eq!(again.format.files_skipped, 16);
    assert_eq!(fs::read(ws.original_path("ACM")).unwrap(), snapshot);
}

#[test]
fn test_combine_ignores_unreadable_previous_summary() {
    let (_dir, ws, grid) = setup();
    fill_acm(&ws, 2);
    pipeline::format_searches(&ws, &SourceProfile::acm(), &grid, 5).unwrap();
    fs::create_dir_all(&ws.output_dir).unwrap();
    fs::write(ws.summary_path("ACM"), "{ not json").unwrap();

    let report = pipeline::combine_csv(&ws, &SourceProfile::acm(), &grid, &AggregateOptions::default()).unwrap();
    assert_eq!(report.summary.combined_rows, 32);

    let saved: serde_json::Value = serde_json::from_slice(&fs::read(ws.summary_path("ACM")).unwrap()).unwrap();
    assert_eq!(saved["combined_rows"], 32);
    assert_eq!(saved["dedupe_key"], serde_json::json!(["title", "author"]));
}

#[test]
fn test_combine_with_legacy_policies() {
    let (_dir, ws, grid) = setup();
    fill_acm(&ws, 1);
    write_search(&ws, "ACM01-1.csv", &acm_csv(&[paper("A")]));
    write_search(&ws, "ACM01-2.csv", &acm_csv(&[paper("B"), paper("A"), paper("C"), paper("D")]));
    write_search(&ws, "ACM01-3.csv", &acm_csv(&[paper("E"), paper("F"), paper("G")]));
    write_search(&ws, "ACM04-4.csv", &acm_csv(&[paper("A"), paper("Last")]));
    pipeline::format_searches(&ws, &SourceProfile::acm(), &grid, 5).unwrap();

    let options = AggregateOptions {
        relevance_cap: 2,
        duplicate_audit: DuplicateAudit::LastSnapshot,
        cap_policy: CapPolicy::Cumulative,
    };
    let report = pipeline::combine_csv(&ws, &SourceProfile::acm(), &grid, &options).unwrap();

    // k11 の空き枠を k12 が使うので B, C, D すべて残る
    let combined = read(&ws.combined_path("ACM"));
    let k12: Vec<_> = (0..combined.len())
        .filter(|&i| combined.get(i, "keyword") == Some("k12"))
        .filter_map(|i| combined.get(i, "title"))
        .collect();
    assert_eq!(k12, ["B", "C", "D"]);

    let relevant = read(&ws.removed_path("ACM", RemovedKind::Relevant));
    assert_eq!(relevant.len(), 1);
    assert_eq!(relevant.get(0, "title"), Some("G"));

    // k12 での A の重複は最後のキーワードで上書きされる
    let duplicates = read(&ws.removed_path("ACM", RemovedKind::Duplicate));
    assert_eq!(duplicates.len(), 2);
    assert_eq!(duplicates.get(0, "keyword"), Some("k11"));
    assert_eq!(duplicates.get(0, columns::DEDUPE_STATUS), Some("kept"));
    assert_eq!(duplicates.get(1, "keyword"), Some("k44"));
    assert_eq!(duplicates.get(1, columns::DEDUPE_STATUS), Some("dropped"));

    assert_eq!(report.summary.duplicate_rows, 2);
    assert_eq!(report.summary.duplicate_audit, DuplicateAudit::LastSnapshot);
    assert_eq!(report.summary.cap_policy, CapPolicy::Cumulative);
}

#[test]
fn test_combine_with_profile_dedupe_key() {
    let (_dir, ws, grid) = setup();
    for r in 1..=4 {
        for c in 1..=4 {
            let title = format!("IEEE{}{}", r, c);
            write_search(&ws, &format!("IEEE0{}-{}.csv", r, c), &ieee_csv(&[(title.as_str(), "A", "1", "30")]));
        }
    }
    // 同じ PDF Link を持つ別表記のタイトル
    write_search(
        &ws,
        "IEEE02-2.csv",
        "Document Title,Authors,Start Page,End Page,PDF Link
IEEE 1 1,A,1,30,https://example.org/IEEE11
",
    );

    let mut profile = SourceProfile::ieee();
    profile.dedupe_key = vec!["PDF Link".to_string()];
    pipeline::format_searches(&ws, &profile, &grid, 5).unwrap();
    let report = pipeline::combine_csv(&ws, &profile, &grid, &AggregateOptions::default()).unwrap();

    assert_eq!(report.summary.combined_rows, 15);
    let duplicates = read(&ws.removed_path("IEEE", RemovedKind::Duplicate));
    assert_eq!(duplicates.get(1, "title"), Some("IEEE 1 1"));
    assert_eq!(duplicates.get(1, "keyword"), Some("k22"));

    // 既定キーではタイトルが違うので重複にならない
    let report = pipeline::combine_csv(&ws, &SourceProfile::ieee(), &grid, &AggregateOptions::default()).unwrap();
    assert_eq!(report.summary.combined_rows, 16);
}
