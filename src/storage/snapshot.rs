//! CSV snapshot file for the in-memory store
//!
//! One record per line: `id,url,owner_id,deleted`. Rows written by older
//! versions carry only the first three fields and load as not deleted.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use parking_lot::Mutex;
use tracing::{debug, info};

use super::models::UrlRecord;
use crate::errors::{Result, ShortenerError};

pub struct FileSnapshot {
    path: PathBuf,
    /// 文件读写锁，与内存 map 的分片锁相互独立
    lock: Mutex<()>,
}

impl FileSnapshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取快照文件，文件不存在时返回空集合
    pub fn load(&self) -> Result<Vec<UrlRecord>> {
        let _guard = self.lock.lock();

        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(
                    "Snapshot file {} not found, starting empty",
                    self.path.display()
                );
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(ShortenerError::file_operation(format!(
                    "无法打开快照文件 {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(BufReader::new(file));

        let mut records = Vec::new();
        for (index, row) in reader.records().enumerate() {
            let row = row.map_err(|e| {
                ShortenerError::serialization(format!("快照第 {} 行读取失败: {}", index + 1, e))
            })?;
            records.push(parse_row(&row, index + 1)?);
        }

        info!(
            "Loaded {} records from snapshot {}",
            records.len(),
            self.path.display()
        );
        Ok(records)
    }

    /// 覆盖写入快照（先写临时文件再 rename）
    pub fn persist(&self, records: &[UrlRecord]) -> Result<()> {
        let _guard = self.lock.lock();
        self.write_locked(records)
    }

    /// 在文件锁内收集并写入，保证快照顺序与写入顺序一致
    pub fn persist_with<F>(&self, collect: F) -> Result<usize>
    where
        F: FnOnce() -> Vec<UrlRecord>,
    {
        let _guard = self.lock.lock();
        let records = collect();
        self.write_locked(&records)?;
        Ok(records.len())
    }

    /// 调用方必须持有 lock
    fn write_locked(&self, records: &[UrlRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.tmp_path();
        {
            let file = File::create(&tmp_path).map_err(|e| {
                ShortenerError::file_operation(format!(
                    "无法创建临时快照文件 {}: {}",
                    tmp_path.display(),
                    e
                ))
            })?;
            let mut writer = WriterBuilder::new()
                .has_headers(false)
                .from_writer(BufWriter::new(file));

            for record in records {
                writer.write_record([
                    record.id.as_str(),
                    record.original_url.as_str(),
                    record.owner_id.as_str(),
                    if record.deleted { "true" } else { "false" },
                ])?;
            }
            writer.flush()?;
        }

        fs::rename(&tmp_path, &self.path).map_err(|e| {
            ShortenerError::file_operation(format!(
                "无法替换快照文件 {}: {}",
                self.path.display(),
                e
            ))
        })?;

        debug!(
            "Persisted {} records to snapshot {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

fn parse_row(row: &StringRecord, line: usize) -> Result<UrlRecord> {
    if row.len() != 3 && row.len() != 4 {
        return Err(ShortenerError::serialization(format!(
            "快照第 {} 行字段数错误: 期望 3 或 4，实际 {}",
            line,
            row.len()
        )));
    }

    let deleted = match row.get(3) {
        None => false,
        Some(flag) => flag.parse::<bool>().map_err(|_| {
            ShortenerError::serialization(format!(
                "快照第 {} 行删除标记无效: '{}'",
                line, flag
            ))
        })?,
    };

    Ok(UrlRecord {
        id: row[0].to_string(),
        original_url: row[1].to_string(),
        owner_id: row[2].to_string(),
        deleted,
    })
}
