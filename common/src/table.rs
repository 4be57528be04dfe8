//! 検索結果テーブル
//!
//! デジタルライブラリのCSVエクスポートはソースごとにカラム構成が異なるため、
//! 固定の構造体ではなく「ヘッダ + 文字列セルの行」で保持する。
//!
//! - 行の順序は検索時の関連度順として扱い、並べ替えない
//! - 連結時はカラム名で揃え、片方に無いカラムは空文字で埋める

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::io::{Read, Write};

/// 1行分のセル
pub type Row = Vec<String>;

/// 読み込み時にスキップした行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 入力ファイル上の行番号（1始まり）
    pub line: u64,
    pub reason: String,
}

/// CSV読み込みの結果レポート
#[derive(Debug, Clone, Default)]
pub struct ReadReport {
    pub skipped: Vec<SkippedLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultTable {
    headers: Vec<String>,
    rows: Vec<Row>,
}

impl ResultTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// ヘッダと行から作成。行の長さはヘッダに合わせる
    pub fn from_rows(headers: Vec<String>, rows: Vec<Row>) -> Self {
        let mut table = Self::new(headers);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    /// 同じヘッダを持つ空テーブル
    pub fn empty_like(&self) -> Self {
        Self::new(self.headers.clone())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| Error::MissingColumn(name.to_string()))
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| r[idx].as_str())
    }

    /// 1セルを書き換える。行またはカラムが無ければ `false`
    pub fn set(&mut self, row: usize, column: &str, value: &str) -> bool {
        let Some(idx) = self.column_index(column) else {
            return false;
        };
        match self.rows.get_mut(row) {
            Some(r) => {
                r[idx] = value.to_string();
                true
            }
            None => false,
        }
    }

    /// 行を追加。ヘッダより短ければ空文字で埋め、長ければ切り詰める
    pub fn push_row(&mut self, mut row: Row) {
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    /// カラムが無ければ右端に追加し、そのインデックスを返す
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            return idx;
        }
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.push(String::new());
        }
        self.headers.len() - 1
    }

    /// 全行に同じ値をセット（カラムが無ければ追加）
    pub fn set_column(&mut self, name: &str, value: &str) {
        let idx = self.ensure_column(name);
        for row in &mut self.rows {
            row[idx] = value.to_string();
        }
    }

    /// カラム名を変更する
    ///
    /// 変更元が無ければ `Ok(false)`。変更先が既に存在する場合は
    /// 二重変換を防ぐため [`Error::ColumnConflict`]。
    pub fn rename_column(&mut self, from: &str, to: &str) -> Result<bool> {
        let Some(idx) = self.column_index(from) else {
            return Ok(false);
        };
        if from == to {
            return Ok(true);
        }
        if self.has_column(to) {
            return Err(Error::ColumnConflict {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        self.headers[idx] = to.to_string();
        Ok(true)
    }

    /// 別テーブルの行を末尾に連結（カラム名で位置合わせ）
    pub fn append(&mut self, other: ResultTable) {
        if self.headers.is_empty() && self.rows.is_empty() {
            *self = other;
            return;
        }

        let mapping: Vec<usize> = other
            .headers
            .iter()
            .map(|h| self.ensure_column(h))
            .collect();
        let width = self.headers.len();

        for row in other.rows {
            let mut aligned = vec![String::new(); width];
            for (cell, &idx) in row.into_iter().zip(&mapping) {
                aligned[idx] = cell;
            }
            self.rows.push(aligned);
        }
    }

    /// `at` 行目以降を切り出して返す
    pub fn split_off(&mut self, at: usize) -> ResultTable {
        let at = at.min(self.rows.len());
        ResultTable {
            headers: self.headers.clone(),
            rows: self.rows.split_off(at),
        }
    }

    /// 条件を満たす行と満たさない行に分割（順序は保持）
    pub fn partition<F>(self, mut keep: F) -> (ResultTable, ResultTable)
    where
        F: FnMut(&[String]) -> bool,
    {
        let mut kept = ResultTable::new(self.headers.clone());
        let mut rest = ResultTable::new(self.headers);
        for row in self.rows {
            if keep(row.as_slice()) {
                kept.rows.push(row);
            } else {
                rest.rows.push(row);
            }
        }
        (kept, rest)
    }

    /// CSVから読み込み
    ///
    /// 1行目をヘッダとして扱う。フィールド数がヘッダより多い行と
    /// デコードできない行はスキップしてレポートに記録する。
    /// I/Oエラーのみ失敗として返す。
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<(Self, ReadReport)> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let raw_headers: Vec<String> = rdr
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, h)| {
                if i == 0 {
                    h.trim_start_matches('\u{feff}').to_string()
                } else {
                    h.to_string()
                }
            })
            .collect();

        let mut table = ResultTable::new(unique_headers(raw_headers));
        let mut report = ReadReport::default();
        let mut record = csv::StringRecord::new();

        loop {
            match rdr.read_record(&mut record) {
                Ok(true) => {
                    if record.len() > table.headers.len() {
                        report.skipped.push(SkippedLine {
                            line: record.position().map(|p| p.line()).unwrap_or(0),
                            reason: format!(
                                "expected {} fields, saw {}",
                                table.headers.len(),
                                record.len()
                            ),
                        });
                        continue;
                    }
                    table.push_row(record.iter().map(str::to_string).collect());
                }
                Ok(false) => break,
                Err(err) => {
                    if matches!(err.kind(), csv::ErrorKind::Io(_)) {
                        return Err(err.into());
                    }
                    report.skipped.push(SkippedLine {
                        line: err.position().map(|p| p.line()).unwrap_or(0),
                        reason: err.to_string(),
                    });
                }
            }
        }

        Ok((table, report))
    }

    /// CSVとして書き出し（インデックス列なし）
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        if !self.headers.is_empty() {
            wtr.write_record(&self.headers)?;
        }
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// 重複したヘッダ名に `.1`, `.2` ... を付けて一意にする
fn unique_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut result = Vec::with_capacity(headers.len());

    for header in headers {
        let name = match seen.get(&header).copied() {
            Some(mut n) => {
                while seen.contains_key(&format!("{}.{}", header, n)) {
                    n += 1;
                }
                seen.insert(header.clone(), n + 1);
                format!("{}.{}", header, n)
            }
            None => header,
        };
        seen.entry(name.clone()).or_insert(1);
        result.push(name);
    }

    result
}
