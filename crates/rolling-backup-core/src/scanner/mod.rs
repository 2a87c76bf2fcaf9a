pub mod inventory;
pub mod size;

pub use inventory::{
    format_backup_date, parse_backup_date, scan, sort_oldest_first, take_inventory, BackupEntry,
    Inventory, StrayDirectory,
};
pub use size::directory_size;
