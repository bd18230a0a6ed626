use clap::{Arg, ArgAction, Command, ValueHint};
use kinship::config::{LogLevel, StorageEngine};
use std::path::PathBuf;

/// CLI arguments for kinship-server
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub port: Option<u16>,
    pub enable_auth: Option<bool>,
    pub jwt_secret: Option<String>,
    pub identity_header: Option<String>,
    pub config_file: Option<PathBuf>,
    pub max_request_size: Option<usize>,
    pub log_level: Option<LogLevel>,
    pub storage: Option<StorageEngine>,
    pub data_dir: Option<PathBuf>,
}

impl CliArgs {
    /// Parse command line arguments
    pub fn parse() -> Self {
        let matches = Command::new("kinship-server")
            .version(kinship::VERSION)
            .about("HTTP API server for the Kinship friend-relationship engine")
            .long_about(
                r#"Kinship Server exposes friend requests, friend lists and profile
relationship flags over a REST API, with a WebSocket stream of relationship
events for connected users.

The server can be configured through command line arguments, environment
variables or a configuration file. Command line arguments take precedence
over environment variables.

Examples:
  kinship-server --port 8080 --enable-auth
  kinship-server --no-auth --identity-header x-forwarded-user
  kinship-server --storage memory --log-level debug"#,
            )
            .arg(
                Arg::new("port")
                    .short('p')
                    .long("port")
                    .value_name("PORT")
                    .help("Port to listen on")
                    .long_help(
                        "Port number for the HTTP server to listen on.
Environment variable: KINSHIP_PORT",
                    )
                    .value_hint(ValueHint::Other)
                    .value_parser(clap::value_parser!(u16)),
            )
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path")
                    .long_help(
                        "Path to a TOML, YAML or JSON configuration file. It is merged
over the default locations and under environment variables.
Environment variable: KINSHIP_CONFIG_FILE",
                    )
                    .value_hint(ValueHint::FilePath)
                    .value_parser(clap::value_parser!(PathBuf)),
            )
            .arg(
                Arg::new("enable_auth")
                    .long("enable-auth")
                    .help("Require a JWT on every request")
                    .long_help(
                        "Verify JWTs from the Authorization header or the token
cookie. Tokens are issued by the surrounding system with the shared secret.
Environment variable: KINSHIP_ENABLE_AUTH",
                    )
                    .action(ArgAction::SetTrue),
            )
            .arg(
                Arg::new("no_auth")
                    .long("no-auth")
                    .help("Trust the identity header instead of verifying JWTs")
                    .long_help(
                        "Take the acting user from the trusted identity header.
WARNING: Only use this behind a gateway that sets the header itself.",
                    )
                    .action(ArgAction::SetTrue)
                    .conflicts_with("enable_auth"),
            )
            .arg(
                Arg::new("jwt_secret")
                    .long("jwt-secret")
                    .value_name("SECRET")
                    .help("JWT verification secret")
                    .long_help(
                        "Secret key shared with the token issuer. If not
provided, one will be generated and no externally issued token will verify.
Environment variable: KINSHIP_JWT_SECRET",
                    )
                    .value_hint(ValueHint::Other),
            )
            .arg(
                Arg::new("identity_header")
                    .long("identity-header")
                    .value_name("HEADER")
                    .help("Header carrying the user id when auth is disabled")
                    .long_help(
                        "Name of the request header holding the acting user's id.
Default is x-kinship-user.
Environment variable: KINSHIP_IDENTITY_HEADER",
                    ),
            )
            .arg(
                Arg::new("max_request_size")
                    .long("max-request-size")
                    .value_name("BYTES")
                    .help("Maximum request body size in bytes")
                    .long_help(
                        "Maximum size allowed for HTTP request bodies.
Larger requests will be rejected.
Environment variable: KINSHIP_MAX_REQUEST_SIZE",
                    )
                    .value_parser(clap::value_parser!(usize)),
            )
            .arg(
                Arg::new("log_level")
                    .long("log-level")
                    .value_name("LEVEL")
                    .help("Logging level")
                    .long_help(
                        "Set the logging level. Valid values: error, warn, info, debug, trace
Environment variable: KINSHIP_LOGGING__LEVEL or RUST_LOG",
                    )
                    .value_parser(["error", "warn", "info", "debug", "trace"]),
            )
            .arg(
                Arg::new("storage")
                    .long("storage")
                    .value_name("ENGINE")
                    .help("Storage engine")
                    .long_help(
                        "Storage engine for user records: memory, surreal_memory or rocksdb.
Environment variable: KINSHIP_STORAGE__ENGINE",
                    )
                    .value_parser(["memory", "surreal_memory", "rocksdb"]),
            )
            .arg(
                Arg::new("data_dir")
                    .long("data-dir")
                    .value_name("DIR")
                    .help("Data directory for persistent storage")
                    .long_help(
                        "Directory holding the RocksDB files.
Environment variable: KINSHIP_STORAGE__DATA_DIR",
                    )
                    .value_hint(ValueHint::DirPath)
                    .value_parser(clap::value_parser!(PathBuf)),
            )
            .get_matches();

        Self {
            port: matches.get_one::<u16>("port").copied(),
            enable_auth: if matches.get_flag("enable_auth") {
                Some(true)
            } else if matches.get_flag("no_auth") {
                Some(false)
            } else {
                None
            },
            jwt_secret: matches.get_one::<String>("jwt_secret").cloned(),
            identity_header: matches.get_one::<String>("identity_header").cloned(),
            config_file: matches.get_one::<PathBuf>("config").cloned(),
            max_request_size: matches.get_one::<usize>("max_request_size").copied(),
            // Values are restricted by the parsers above
            log_level: matches
                .get_one::<String>("log_level")
                .and_then(|level| level.parse().ok()),
            storage: matches
                .get_one::<String>("storage")
                .and_then(|engine| engine.parse().ok()),
            data_dir: matches.get_one::<PathBuf>("data_dir").cloned(),
        }
    }
}
