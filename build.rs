// build.rs

use clap::{Arg, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: database path
fn db_path_arg() -> Arg {
    Arg::new("db_path")
        .short('d')
        .long("db-path")
        .value_name("PATH")
        .default_value("./parcel.db")
        .help("Database path")
}

fn build_cli() -> Command {
    Command::new("parcel")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Parcel Contributors")
        .about("Package lifecycle server with background Nix builds")
        .subcommand_required(false)
        .subcommand(
            Command::new("init")
                .about("Create the database and apply migrations")
                .arg(db_path_arg()),
        )
        .subcommand(
            Command::new("serve")
                .about("Run the HTTP server")
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .value_name("FILE")
                        .help("Configuration file (defaults to $PARCEL_CONFIG)"),
                )
                .arg(
                    Arg::new("bind")
                        .short('b')
                        .long("bind")
                        .value_name("ADDR")
                        .help("Bind address, overriding the config file"),
                )
                .arg(
                    Arg::new("db_path")
                        .short('d')
                        .long("db-path")
                        .value_name("PATH")
                        .help("Database path, overriding the config file"),
                ),
        )
        .subcommand(
            Command::new("token")
                .about("Administer API tokens directly in the database")
                .subcommand(Command::new("list").about("List all tokens").arg(db_path_arg()))
                .subcommand(Command::new("issue").about("Issue a new token").arg(db_path_arg()))
                .subcommand(
                    Command::new("revoke")
                        .about("Revoke a single token")
                        .arg(Arg::new("id").required(true).help("Token ID"))
                        .arg(db_path_arg()),
                )
                .subcommand(
                    Command::new("revoke-all-except")
                        .about("Revoke every token except the given value")
                        .arg(Arg::new("token").required(true).help("Token value to keep"))
                        .arg(db_path_arg()),
                )
                .subcommand(
                    Command::new("rotate")
                        .about("Replace a token's value with a fresh one")
                        .arg(Arg::new("id").required(true).help("Token ID"))
                        .arg(db_path_arg()),
                ),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "elvish", "fish", "powershell", "zsh"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("parcel.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
