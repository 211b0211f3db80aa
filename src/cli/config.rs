use anyhow::Result;

use crate::settings::{load_settings, save_settings, settings_path, shellexpand_path};

pub fn show() -> Result<()> {
    let settings = load_settings();
    println!("# {}", settings_path().display());
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

pub fn set(
    tolerance: Option<u32>,
    ignore_dates: bool,
    scan_rows: Option<usize>,
    permissive_header: Option<bool>,
    export_dir: Option<String>,
) -> Result<()> {
    let mut settings = load_settings();
    if ignore_dates {
        settings.date_tolerance_days = None;
    } else if let Some(days) = tolerance {
        settings.date_tolerance_days = Some(days);
    }
    if let Some(rows) = scan_rows {
        settings.header_scan_rows = rows;
    }
    if let Some(permissive) = permissive_header {
        settings.permissive_header = permissive;
    }
    if let Some(dir) = export_dir {
        settings.export_dir = shellexpand_path(&dir);
    }
    save_settings(&settings)?;
    println!("Saved {}", settings_path().display());
    Ok(())
}
