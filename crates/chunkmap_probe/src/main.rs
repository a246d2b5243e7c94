use std::env;
use std::io;
use std::process::ExitCode;

use chunkmap_probe::{parse_args, run, ASSET_ROOT_ENV_VAR};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    init_tracing();
    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::from(1)
        }
    }
}

fn run_cli() -> Result<(), String> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        return Err(usage_text());
    }
    if args[0] == "-h" || args[0] == "--help" {
        println!("{}", usage_text());
        return Ok(());
    }
    let options = parse_args(&args).map_err(|error| format!("{error}\n\n{}", usage_text()))?;
    info!(map = %options.map.display(), tiled = options.tiled, "probe_started");
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(&options, &mut out)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn usage_text() -> String {
    format!(
        "usage: chunkmap_probe --map PATH [options]\n\
         \n\
         options:\n\
         \x20 --tiles PATH             tile properties document\n\
         \x20 --tiled                  read --map/--tiles as Tiled JSON exports\n\
         \x20 --tileset PATH           grid tileset image (tile id -> cell)\n\
         \x20 --atlas PATH             named atlas image\n\
         \x20 --atlas-json PATH        atlas regions (default: image path with .json)\n\
         \x20 --colorkey R,G,B         background and transparent color\n\
         \x20 --set CX,CY,LAYER,X,Y,ID edit one tile after the initial render\n\
         \x20 --ticks N                animation ticks to run\n\
         \x20 --query X,Y,W,H          corner query (repeatable)\n\
         \x20 --layer N                layer for queries (default 0)\n\
         \x20 --property NAME          required truthy property (repeatable)\n\
         \n\
         relative paths resolve against ${ASSET_ROOT_ENV_VAR} when set"
    )
}
