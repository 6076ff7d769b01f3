use crate::error::{AppError, AppResult, FileError};
use crate::models::species::{RawRow, SpeciesRow, COL_REFERENCE_URL, SPECIES_COLUMNS};
use std::path::Path;
use tokio::fs;

/// 读取原始 CSV，每行按表头转换为 `RawRow`
pub async fn load_raw_rows(csv_file_path: &Path) -> AppResult<Vec<RawRow>> {
    let content = read_csv_file(csv_file_path).await?;
    parse_raw_rows(&content).map_err(|e| AppError::file_read_failed(display(csv_file_path), e))
}

/// 从 CSV 文本解析原始行
pub fn parse_raw_rows(content: &str) -> Result<Vec<RawRow>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.to_string(), value.to_string()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// 读取卡片 CSV，只保留五个标准列，丢弃任一列为空的行
pub async fn load_species_rows(csv_file_path: &Path) -> AppResult<Vec<SpeciesRow>> {
    let path = display(csv_file_path);
    let content = read_csv_file(csv_file_path).await?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(content.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| AppError::file_read_failed(&path, e))?
        .clone();

    let mut indices = [0usize; 5];
    for (slot, column) in indices.iter_mut().zip(SPECIES_COLUMNS) {
        let aliases: &[&str] = if column == COL_REFERENCE_URL[0] {
            COL_REFERENCE_URL
        } else {
            std::slice::from_ref(&column)
        };
        *slot = aliases
            .iter()
            .find_map(|alias| headers.iter().position(|h| h == *alias))
            .ok_or_else(|| FileError::MissingColumn {
                path: path.clone(),
                column: column.to_string(),
            })?;
    }

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for record in reader.records() {
        let record = record.map_err(|e| AppError::file_read_failed(&path, e))?;
        let field = |i: usize| record.get(indices[i]).unwrap_or_default().to_string();
        let row = SpeciesRow {
            scientific_name: field(0),
            common_name: field(1),
            image_url: field(2),
            reference_url: field(3),
            attribution: field(4),
        };
        if row.is_complete() {
            rows.push(row);
        } else {
            dropped += 1;
        }
    }

    if dropped > 0 {
        tracing::debug!("{}: 丢弃 {} 行不完整的卡片", path, dropped);
    }
    Ok(rows)
}

/// 写入卡片 CSV（表头 + 每行五列）
pub async fn save_species_rows(csv_file_path: &Path, rows: &[SpeciesRow]) -> AppResult<()> {
    let path = display(csv_file_path);
    let bytes = species_rows_to_csv(rows).map_err(|e| AppError::file_write_failed(&path, e))?;

    if let Some(parent) = csv_file_path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| AppError::file_write_failed(&path, e.into()))?;
    }
    fs::write(csv_file_path, bytes)
        .await
        .map_err(|e| AppError::file_write_failed(&path, e.into()))?;

    tracing::info!("已保存 {} 张卡片到 {}", rows.len(), path);
    Ok(())
}

fn species_rows_to_csv(rows: &[SpeciesRow]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    // 空列表也要写出表头
    if rows.is_empty() {
        writer.write_record(SPECIES_COLUMNS)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

/// 列出目录中的 CSV 文件名（不区分大小写排序）
pub async fn list_csv_files(folder_path: &Path) -> Vec<String> {
    let mut entries = match fs::read_dir(folder_path).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!("无法读取文件夹 {}: {}", folder_path.display(), e);
            return Vec::new();
        }
    };

    let mut csv_files = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let name = entry.file_name().to_string_lossy().to_string();
                if name.ends_with(".csv") {
                    csv_files.push(name);
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("读取文件夹条目失败 {}: {}", folder_path.display(), e);
                break;
            }
        }
    }

    csv_files.sort_by_key(|name| name.to_lowercase());
    csv_files
}

async fn read_csv_file(csv_file_path: &Path) -> AppResult<String> {
    if !fs::try_exists(csv_file_path).await.unwrap_or(false) {
        return Err(FileError::NotFound {
            path: display(csv_file_path),
        }
        .into());
    }
    fs::read_to_string(csv_file_path)
        .await
        .map_err(|e| AppError::file_read_failed(display(csv_file_path), e.into()))
}

fn display(path: &Path) -> String {
    path.display().to_string()
}
