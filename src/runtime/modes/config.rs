//! Config mode
//!
//! Renders a sample configuration containing every default.

use anyhow::{Result, anyhow};
use colored::Colorize;

use crate::config::StaticConfig;

/// Print the sample configuration, or write it to `output`
pub fn generate_config(output: Option<&str>) -> Result<()> {
    match output {
        None => {
            print!("{}", StaticConfig::generate_sample_config());
            Ok(())
        }
        Some(path) => {
            StaticConfig::default()
                .save_to_file(path)
                .map_err(|e| anyhow!("failed to write {}: {}", path, e))?;
            println!("{} {}", "Sample configuration written to".green(), path);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_config_to_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let path_str = path.to_string_lossy().into_owned();

        generate_config(Some(&path_str)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: StaticConfig = toml::from_str(&content).unwrap();
        assert_eq!(parsed.server.port, 8080);
        assert_eq!(parsed.geoip.data_dir, "data");
    }
}
