use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "pg-dropbox-backup",
    version,
    about = "Backup a PostgreSQL database and upload it to Dropbox"
)]
pub struct Cli {
    /// Verbose output
    #[arg(short = 'v', long, env = "BACKUP_VERBOSE")]
    pub verbose: bool,

    /// Database host
    #[arg(short = 'H', long, env = "BACKUP_DB_HOST", default_value = "localhost")]
    pub db_host: String,

    /// Database user
    #[arg(short = 'U', long, env = "BACKUP_DB_USER")]
    pub db_user: Option<String>,

    /// Database password. Visible in the process list when passed as a flag; prefer
    /// BACKUP_DB_PASSWORD or a .env file
    #[arg(short = 'W', long, env = "BACKUP_DB_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,

    /// Database port
    #[arg(short = 'p', long, env = "BACKUP_DB_PORT", default_value_t = 5432)]
    pub db_port: u16,

    /// Database name
    #[arg(short = 'd', long, env = "BACKUP_DB_NAME")]
    pub db_name: Option<String>,

    /// Output folder for the dump
    #[arg(short = 'o', long, env = "BACKUP_OUTPUT_FOLDER", default_value = ".")]
    pub output_folder: PathBuf,

    /// Compress the dump with gzip
    #[arg(short = 'c', long, env = "BACKUP_COMPRESS")]
    pub compress: bool,

    /// Dropbox application key (token generation only)
    #[arg(short = 'k', long, env = "BACKUP_APP_KEY")]
    pub app_key: Option<String>,

    /// Dropbox application secret (token generation only)
    #[arg(short = 's', long, env = "BACKUP_APP_SECRET", hide_env_values = true)]
    pub app_secret: Option<String>,

    /// Remove the uncompressed dump after a successful compressed upload
    #[arg(short = 'r', long, env = "BACKUP_REMOVE_UNCOMPRESSED")]
    pub remove_uncompressed: bool,

    /// Run the interactive refresh token generation instead of a backup
    #[arg(short = 'g', long, env = "BACKUP_GENERATE_TOKEN")]
    pub generate_token: bool,

    /// Dropbox folder the backup is uploaded into
    #[arg(long, env = "BACKUP_REMOTE_FOLDER", default_value = "/")]
    pub remote_folder: String,

    /// Directory holding app.key, app.secret and refresh.token
    #[arg(long, env = "BACKUP_CREDENTIALS_DIR", default_value = ".")]
    pub credentials_dir: PathBuf,

    /// pg_dump executable
    #[arg(long, env = "BACKUP_PG_DUMP_PATH", default_value = "pg_dump")]
    pub pg_dump_path: String,

    /// Directory for JSON log files
    #[arg(long, env = "BACKUP_LOG_DIR", default_value = "./logs")]
    pub log_dir: PathBuf,

    /// Seconds to wait for pg_dump
    #[arg(long, env = "BACKUP_DUMP_TIMEOUT", default_value_t = 3600)]
    pub dump_timeout: u64,

    /// Seconds to wait for the operator to paste the authorization code
    #[arg(long, env = "BACKUP_PROMPT_TIMEOUT", default_value_t = 600)]
    pub prompt_timeout: u64,

    /// Seconds to wait for token and account requests
    #[arg(long, env = "BACKUP_HTTP_TIMEOUT", default_value_t = 60)]
    pub http_timeout: u64,

    /// Seconds to wait for the upload request
    #[arg(long, env = "BACKUP_UPLOAD_TIMEOUT", default_value_t = 1800)]
    pub upload_timeout: u64,
}
