pub mod config;
pub mod converter;
pub mod history;
pub mod jobs;
pub mod metrics;
pub mod testing;

pub use config::{
    app_dir, load_config, load_config_from_str, Config, ConfigError, ConverterConfig,
    DatabaseConfig, HistoryConfig, ServerConfig,
};
pub use converter::{
    extension_of, output_formats_for_extension, AdvancedDocumentConverter, ArchiveConverter,
    ArchiveTools, Category, ConversionRequest, ConvertError, Converter, ConverterRegistry,
    DocumentConverter, ImageConverter, MediaConverter, Quality, SpreadsheetConverter,
};
pub use history::{
    export_csv, export_json, export_to_path, ConversionRecord, DailyStat, ExportFormat,
    FormatCount, HistoryError, HistoryStats, HistoryStore, NewConversionRecord,
    SqliteHistoryStore,
};
pub use jobs::{Job, JobError, JobRunner};
