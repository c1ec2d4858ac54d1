#[cfg(not(feature = "cli"))]
compile_error!("The `probtree` binary requires the `cli` feature. Build with `--features cli`.");

use std::io::{self, BufRead, Write};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;

use probtree::cli::app::{Cli, ColorMode};
use probtree::cli::dispatch::{dispatch_line, DispatchOptions, Outcome};
use probtree::session::Session;

fn main() {
    let cli = Cli::parse();

    match cli.color {
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Auto => {}
    }
    let colored = !matches!(cli.color, ColorMode::Never);

    let opts = DispatchOptions {
        json: cli.json,
        colored,
        node_cache: cli.node_cache,
        page_cache: cli.page_cache,
        d: cli.d,
        print_counters: !cli.quiet_counters,
    };

    let exit_code = match &cli.script {
        Some(path) => run_batch(path, &opts),
        None => run_repl(&opts),
    };
    process::exit(exit_code);
}

fn run_batch(path: &str, opts: &DispatchOptions) -> i32 {
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error: cannot open script {path}: {e}");
            return 1;
        }
    };
    let reader = io::BufReader::new(file);
    let mut session: Option<Session> = None;
    let stdout = io::stdout();
    let mut writer = stdout.lock();

    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Error: {e}");
                return 1;
            }
        };
        if matches!(dispatch_line(&line, &mut session, opts, &mut writer), Outcome::Exit) {
            return 0;
        }
    }
    if let Some(session) = session.as_mut() {
        let _ = session.flush();
    }
    0
}

fn run_repl(opts: &DispatchOptions) -> i32 {
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = interrupted.clone();
    let _ = ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    });

    let mut session: Option<Session> = None;
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut writer = stdout.lock();

    loop {
        if interrupted.load(Ordering::SeqCst) {
            if let Some(session) = session.as_mut() {
                let _ = session.flush();
            }
            return 0;
        }
        let _ = write!(writer, "probtree> ");
        let _ = writer.flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => {
                if let Some(session) = session.as_mut() {
                    let _ = session.flush();
                }
                return 0;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("Error: {e}");
                return 1;
            }
        }

        if matches!(dispatch_line(&line, &mut session, opts, &mut writer), Outcome::Exit) {
            return 0;
        }
    }
}
