pub mod config;
pub mod files;
pub mod records;
pub mod session;
pub mod snapshot;
pub mod transfer;

pub use config::{load_config, save_config, AppConfig, DEFAULT_TICK_MS};
pub use files::{
    atomic_write, backup_file, config_file, ensure_data_dir, export_file_name, get_data_dir,
    init_local_dir, read_file, resolve_data_dir, session_file, snapshot_file, DATA_DIR_ENV,
};
pub use records::{
    ExportDocument, ExportTask, RunningTimers, SubtaskRecord, TaskRecord, EXPORT_VERSION,
};
pub use session::{
    clear_session_lock, read_session_lock, running_timers_policy, write_session_lock,
    SessionLock, STALE_AFTER_SECS,
};
pub use snapshot::{decode_snapshot, encode_snapshot, load_snapshot, save_snapshot};
pub use transfer::{export_document, export_snapshot, import_snapshot, IdRegistry};
