// crates/txnsim-config/tests/load_validation.rs
// =============================================================================
// Module: Config Load Validation Tests
// Description: Validate config loading guards (path, size, encoding).
// Purpose: Ensure config input handling is strict and fail-closed.
// =============================================================================

//! Config load validation tests for txnsim-config.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use txnsim_config::ConfigError;
use txnsim_config::TxnSimConfig;

type TestResult = Result<(), String>;

fn assert_invalid(result: Result<TxnSimConfig, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config load".to_string()),
    }
}

#[test]
fn load_rejects_path_too_long() -> TestResult {
    let long_path = "a".repeat(5_000);
    let path = Path::new(&long_path);
    assert_invalid(TxnSimConfig::load(Some(path)), "config path exceeds max length")?;
    Ok(())
}

#[test]
fn load_rejects_path_component_too_long() -> TestResult {
    let long_component = "a".repeat(300);
    let path = Path::new(&long_component);
    assert_invalid(TxnSimConfig::load(Some(path)), "config path component too long")?;
    Ok(())
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    let payload = vec![b'a'; 1_048_577];
    file.write_all(&payload).map_err(|err| err.to_string())?;
    assert_invalid(TxnSimConfig::load(Some(file.path())), "config file exceeds size limit")?;
    Ok(())
}

#[test]
fn load_rejects_non_utf8_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(&[0xFF, 0xFE, 0xFF]).map_err(|err| err.to_string())?;
    assert_invalid(TxnSimConfig::load(Some(file.path())), "config file must be utf-8")?;
    Ok(())
}

#[test]
fn load_rejects_unknown_fields() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(b"[driver]\nrounds = 3\nunknown_knob = true\n")
        .map_err(|err| err.to_string())?;
    match TxnSimConfig::load(Some(file.path())) {
        Err(ConfigError::Parse(_)) => Ok(()),
        Err(error) => Err(format!("expected parse error, got {error}")),
        Ok(_) => Err("expected parse error, got a loaded config".to_string()),
    }
}

#[test]
fn load_rejects_zero_rounds() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(b"[store]\npath = \"txnsim.db\"\n\n[driver]\nrounds = 0\n")
        .map_err(|err| err.to_string())?;
    assert_invalid(TxnSimConfig::load(Some(file.path())), "driver.rounds out of range")?;
    Ok(())
}

#[test]
fn load_accepts_minimal_config() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(b"[store]\npath = \"txnsim.db\"\n").map_err(|err| err.to_string())?;
    let config = TxnSimConfig::load(Some(file.path())).map_err(|err| err.to_string())?;
    if config.driver.rounds == 0 {
        return Err("expected defaulted rounds".to_string());
    }
    Ok(())
}
