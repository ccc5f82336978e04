// src/utils/error.rs
#![allow(dead_code)]
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Input file not found: {0}")]
    FileNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Workbook write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Conversion failed: {0}")]
    Conversion(#[from] ConvertError),

    #[error("Data processing failed: {0}")]
    Processing(String),
}
