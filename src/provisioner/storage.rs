use anyhow::{anyhow, Result};
use std::fs;
use std::path::Path;
use super::models::ProvisionReport;

/// Save a provisioning report to a JSON file
pub fn save_report_to_json(report: &ProvisionReport, path: &Path) -> Result<()> {
    let json_string = serde_json::to_string_pretty(report)
        .map_err(|e| anyhow!("Failed to serialize report to JSON: {}", e))?;

    fs::write(path, json_string)
        .map_err(|e| anyhow!("Failed to write JSON file to {}: {}", path.display(), e))?;

    Ok(())
}

/// Load a provisioning report from a JSON file
pub fn load_report_from_json(path: &Path) -> Result<ProvisionReport> {
    if !path.exists() {
        return Err(anyhow!("File not found: {}", path.display()));
    }

    let json_string = fs::read_to_string(path)
        .map_err(|e| anyhow!("Failed to read JSON file from {}: {}", path.display(), e))?;

    let report: ProvisionReport = serde_json::from_str(&json_string)
        .map_err(|e| anyhow!("Failed to deserialize JSON: {}", e))?;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provisioner::models::AccountInfo;
    use tempfile::NamedTempFile;

    #[test]
    fn test_save_and_load_report() -> Result<()> {
        let temp_file = NamedTempFile::new()?;
        let path = temp_file.path();

        let mut report = ProvisionReport::new("test-chain".to_string());
        report.stats.requested = 2;
        report.stats.resolved = 1;
        report.accounts.push(AccountInfo {
            local_name: "mock_account_1".into(),
            address: "sim1abc".into(),
            password: "1234567890".into(),
            account_number: Some(4),
            sequence: Some(0),
        });
        report.mark_completed();

        save_report_to_json(&report, path)?;

        let loaded = load_report_from_json(path)?;
        assert_eq!(loaded.run_id, report.run_id);
        assert_eq!(loaded.stats, report.stats);
        assert_eq!(loaded.accounts, report.accounts);

        Ok(())
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_report_from_json(&dir.path().join("absent.json")).is_err());
    }
}
