//! Git remote-helper entry point. Invoked by git as
//! `git-remote-oci <remote-name> <url>` with `GIT_DIR` set to the local
//! repository being fetched into or pushed from.

use std::io;
use std::path::PathBuf;

use git_oci_helper::config::Config;
use git_oci_helper::url::OciUrl;
use git_oci_helper::Error;
use oci_store::GitRepository;

fn parse_args() -> Result<OciUrl, Error> {
    let args: Vec<String> = std::env::args().skip(1).take(2).collect();
    let url = match args.as_slice() {
        [url] => url,
        [_, url] => url,
        _ => return Err(Error::InvalidArguments(args)),
    };
    Ok(url.parse()?)
}

fn run() -> Result<(), Error> {
    if std::env::args().nth(1).as_deref() == Some("--version") {
        println!("git-remote-oci {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = Config::from_env();
    git_oci_helper::logger::init(config.default_level.unwrap_or(log::Level::Error))
        .expect("logger is only initialized once");

    let remote = parse_args()?;
    let git_dir = std::env::var("GIT_DIR")
        .map(PathBuf::from)
        .map_err(|_| Error::InvalidArguments(vec!["GIT_DIR".to_string()]))?;
    let repo = GitRepository::open(&git_dir)?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    git_oci_helper::driver::run(stdin.lock(), stdout.lock(), &repo, &remote, &config)
}

fn main() {
    if let Err(err) = run() {
        eprintln!("fatal: {err}");
        std::process::exit(1);
    }
}
