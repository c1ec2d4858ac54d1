//! Tokenizes one line of the operation vocabulary and runs it against a
//! [`Session`]. Shared by the REPL and the batch script runner so a recorded
//! REPL transcript is a valid batch script.

use std::io::Write;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::session::Session;

pub struct DispatchOptions {
    pub json: bool,
    pub colored: bool,
    pub node_cache: usize,
    pub page_cache: usize,
    pub d: usize,
    pub print_counters: bool,
}

pub enum Outcome {
    Continue,
    Exit,
}

fn ok(writer: &mut dyn Write, opts: &DispatchOptions) {
    if opts.colored {
        let _ = writeln!(writer, "{}", "OK".green());
    } else {
        let _ = writeln!(writer, "OK");
    }
}

fn fail(writer: &mut dyn Write, opts: &DispatchOptions, message: impl std::fmt::Display) {
    if opts.colored {
        let _ = writeln!(writer, "{}", format!("Error: {message}").red());
    } else {
        let _ = writeln!(writer, "Error: {message}");
    }
}

fn print_counters(writer: &mut dyn Write, opts: &DispatchOptions, session: &Session) {
    let counters = session.counters();
    if opts.json {
        if let Ok(text) = serde_json::to_string(&counters) {
            let _ = writeln!(writer, "{text}");
        }
        return;
    }
    let line = format!(
        "nodes[saved={} disk={} cache={}] pages[saved={} disk={} cache={}] metadata[loaded={} saved={}]",
        counters.nodes_saved_to_disk,
        counters.nodes_loaded_from_disk,
        counters.nodes_loaded_from_cache,
        counters.pages_saved_to_disk,
        counters.pages_loaded_from_disk,
        counters.pages_loaded_from_cache,
        counters.metadata_loaded,
        counters.metadata_saved,
    );
    if opts.colored {
        let _ = writeln!(writer, "{}", line.dimmed());
    } else {
        let _ = writeln!(writer, "{line}");
    }
}

fn parse_f64(tok: Option<&str>, label: &str) -> Result<f64, String> {
    tok.ok_or_else(|| format!("missing {label}"))?
        .parse::<f64>()
        .map_err(|_| format!("{label} must be a number"))
}

fn parse_i32(tok: Option<&str>, label: &str) -> Result<i32, String> {
    tok.ok_or_else(|| format!("missing {label}"))?
        .parse::<i32>()
        .map_err(|_| format!("{label} must be an integer"))
}

/// Executes one line. Returns [`Outcome::Exit`] on `EXIT` or a fatal startup error.
pub fn dispatch_line(
    line: &str,
    session: &mut Option<Session>,
    opts: &DispatchOptions,
    writer: &mut dyn Write,
) -> Outcome {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Outcome::Continue;
    }
    let mut tokens = line.split_whitespace();
    let command = tokens.next().unwrap_or_default().to_ascii_uppercase();

    let result: Result<Option<String>, String> = (|| match command.as_str() {
        "CREATE" => {
            let base = tokens.next().ok_or("missing database name")?;
            *session = Some(
                Session::create(base, opts.node_cache, opts.page_cache, opts.d).map_err(|e| e.to_string())?,
            );
            Ok(None)
        }
        "LOAD" => {
            let base = tokens.next().ok_or("missing database name")?;
            *session = Some(
                Session::load(base, opts.node_cache, opts.page_cache, opts.d).map_err(|e| e.to_string())?,
            );
            Ok(None)
        }
        "INSERT" => {
            let session = session.as_mut().ok_or("no database loaded")?;
            let key = parse_i32(tokens.next(), "key")?;
            let p_a = parse_f64(tokens.next(), "pA")?;
            let p_b = parse_f64(tokens.next(), "pB")?;
            let p_aub = parse_f64(tokens.next(), "pAuB")?;
            session
                .insert(crate::storage::Record::new(key, p_a, p_b, p_aub))
                .map_err(|e| e.to_string())?;
            Ok(None)
        }
        "DELETE" => {
            let session = session.as_mut().ok_or("no database loaded")?;
            let key = parse_i32(tokens.next(), "key")?;
            session.delete(key).map_err(|e| e.to_string())?;
            Ok(None)
        }
        "UPDATE" => {
            let session = session.as_mut().ok_or("no database loaded")?;
            let key = parse_i32(tokens.next(), "key")?;
            let p_a = parse_f64(tokens.next(), "pA")?;
            let p_b = parse_f64(tokens.next(), "pB")?;
            let p_aub = parse_f64(tokens.next(), "pAuB")?;
            session.update(key, p_a, p_b, p_aub).map_err(|e| e.to_string())?;
            Ok(None)
        }
        "SEARCH" => {
            let session = session.as_mut().ok_or("no database loaded")?;
            let key = parse_i32(tokens.next(), "key")?;
            match session.search(key).map_err(|e| e.to_string())? {
                Some(found) => Ok(Some(format!("node={} heap_page={}", found.node_id, found.heap_page))),
                None => Ok(Some("not found".to_string())),
            }
        }
        "PRINT" => {
            let session = session.as_mut().ok_or("no database loaded")?;
            let records = session.print_all().map_err(|e| e.to_string())?;
            if opts.json {
                let text = serde_json::to_string(&records).map_err(|e| e.to_string())?;
                Ok(Some(text))
            } else {
                let mut out = String::new();
                for (page, record) in records {
                    out.push_str(&format!(
                        "page={page} key={} pA={} pB={} pAuB={}\n",
                        record.key, record.p_a, record.p_b, record.p_aub
                    ));
                }
                Ok(Some(out.trim_end().to_string()))
            }
        }
        "ADDRANDOM" => {
            let session = session.as_mut().ok_or("no database loaded")?;
            let n: usize = tokens
                .next()
                .ok_or("missing count")?
                .parse()
                .map_err(|_| "count must be a non-negative integer".to_string())?;
            let bar = ProgressBar::new(n as u64);
            bar.set_style(
                ProgressStyle::with_template("{bar:40} {pos}/{len} inserted")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            let inserted = session
                .add_random(n, |done, _total| bar.set_position(done as u64))
                .map_err(|e| e.to_string())?;
            bar.finish_and_clear();
            Ok(Some(format!("inserted {inserted} of {n} requested")))
        }
        "FLUSH" => {
            let session = session.as_mut().ok_or("no database loaded")?;
            session.flush().map_err(|e| e.to_string())?;
            Ok(None)
        }
        "COUNTERS" => {
            let session = session.as_ref().ok_or("no database loaded")?;
            print_counters(writer, opts, session);
            Ok(None)
        }
        "EXIT" => Ok(None),
        other => Err(format!("unknown command: {other}")),
    })();

    match result {
        Ok(Some(text)) => {
            let _ = writeln!(writer, "{text}");
        }
        Ok(None) if command != "COUNTERS" => ok(writer, opts),
        Ok(None) => {}
        Err(message) => fail(writer, opts, message),
    }

    if command != "COUNTERS" && opts.print_counters {
        if let Some(session) = session.as_ref() {
            print_counters(writer, opts, session);
        }
    }

    if command == "EXIT" {
        if let Some(session) = session.as_mut() {
            let _ = session.flush();
        }
        return Outcome::Exit;
    }
    Outcome::Continue
}
