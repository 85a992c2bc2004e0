//! Git LFS custom-transfer-agent entry point.
//!
//! Invoked by `git-lfs` itself, with no address on the command line — the
//! remote is carried in the `init` request's `remote` field. Register it
//! in `.lfsconfig` or local git config:
//!
//! ```text
//! [lfs "customtransfer.git-oci-helper"]
//!     path = git-lfs-oci
//! [lfs]
//!     customtransfer.activity = git-oci-helper
//! ```

use std::io;

use git_oci_helper::config::Config;
use git_oci_helper::Error;

fn run() -> Result<(), Error> {
    if std::env::args().nth(1).as_deref() == Some("--version") {
        println!("git-lfs-oci {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = Config::from_env();
    git_oci_helper::logger::init(config.default_level.unwrap_or(log::Level::Error))
        .expect("logger is only initialized once");

    let stdin = io::stdin();
    let stdout = io::stdout();
    git_oci_helper::driver::run_lfs(stdin.lock(), stdout.lock(), &config)
}

fn main() {
    if let Err(err) = run() {
        eprintln!("fatal: {err}");
        std::process::exit(1);
    }
}
