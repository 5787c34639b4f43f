//! Server configuration resolved from CLI flags and environment variables.
//! Precedence: CLI flag, then environment variable, then built-in default.

use std::env;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8000;
pub const DEFAULT_DB_FOLDER: &str = "dbs";

pub const USAGE: &str = "medrec server\n\nUSAGE:\n  medrec_server [--host ADDR] [--http-port N] [--db-folder PATH] [--no-seed]\n\nOPTIONS:\n  --host ADDR         Bind address (env: MEDREC_HOST, default 127.0.0.1)\n  --http-port N       HTTP port (env: MEDREC_HTTP_PORT, default 8000)\n  --db-folder PATH    Data folder holding medrec.json (env: MEDREC_DB_FOLDER, default dbs)\n  --no-seed           Do not create default users and example patients on an empty store (env: MEDREC_SEED=false)\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub http_port: u16,
    pub db_folder: String,
    pub seed: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            db_folder: DEFAULT_DB_FOLDER.to_string(),
            seed: true,
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        i += 1;
    }
    None
}

pub fn has_flag(args: &[String], flag: &str) -> bool { args.iter().any(|a| a == flag) }

impl ServerConfig {
    /// Resolve from `args` and a variable lookup. Unparseable values fall back
    /// to the next source rather than failing startup.
    pub fn resolve<F>(args: &[String], var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let host = arg_value(args, "--host").or_else(|| var("MEDREC_HOST")).unwrap_or(d.host);
        let http_port = arg_value(args, "--http-port")
            .and_then(|v| v.parse::<u16>().ok())
            .or_else(|| var("MEDREC_HTTP_PORT").and_then(|v| v.parse::<u16>().ok()))
            .unwrap_or(d.http_port);
        let db_folder = arg_value(args, "--db-folder").or_else(|| var("MEDREC_DB_FOLDER")).unwrap_or(d.db_folder);
        let seed = if has_flag(args, "--no-seed") {
            false
        } else {
            var("MEDREC_SEED").as_deref().and_then(parse_bool).unwrap_or(d.seed)
        };
        Self { host, http_port, db_folder, seed }
    }

    pub fn from_env_and_args(args: &[String]) -> Self { Self::resolve(args, |name| env::var(name).ok()) }

    pub fn bind_addr(&self) -> String { format!("{}:{}", self.host, self.http_port) }
}
