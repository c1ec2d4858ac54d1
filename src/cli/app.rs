use clap::{Parser, ValueEnum};

#[derive(Parser)]
#[command(name = "probtree")]
#[command(about = "Paged B-tree index over a paged heap file")]
#[command(version)]
pub struct Cli {
    /// Run a batch script instead of an interactive REPL (one command per line).
    #[arg(short, long)]
    pub script: Option<String>,

    /// Control colored output.
    #[arg(long, default_value = "auto")]
    pub color: ColorMode,

    /// Emit SEARCH/PRINT/COUNTERS output as JSON instead of colored text.
    #[arg(long)]
    pub json: bool,

    /// Node cache capacity (0 disables node caching).
    #[arg(long = "node-cache", default_value_t = 16)]
    pub node_cache: usize,

    /// Heap page cache capacity (0 disables page caching).
    #[arg(long = "page-cache", default_value_t = 16)]
    pub page_cache: usize,

    /// B-tree branching factor d (k_max = 2d, k_min = d).
    #[arg(long, default_value_t = 2)]
    pub d: usize,

    /// Suppress the automatic counters printout after every command.
    #[arg(long = "quiet-counters")]
    pub quiet_counters: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}
