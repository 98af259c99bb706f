use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, clap::ValueEnum)]
enum EmitStage {
    C,
    BuildInfo,
}

#[derive(Parser, Debug)]
#[command(
    name = "nncc",
    version,
    about = "nncc — compiles neural-network graph descriptions to standalone C inference code"
)]
struct Cli {
    /// Input graph description (.json)
    source: PathBuf,

    /// Output file path
    #[arg(short, long, default_value = "model.c")]
    output: PathBuf,

    /// Output stage
    #[arg(long, value_enum, default_value_t = EmitStage::C)]
    emit: EmitStage,

    /// Print compiler phases
    #[arg(long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    // ── Operator registry ──
    let registry = nncc::registry::OpRegistry::with_builtin_ops();
    if cli.verbose {
        eprintln!("nncc: {} operators registered", registry.len());
    }

    // ── Read and load the graph document ──
    let source = match std::fs::read_to_string(&cli.source) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("nncc: error: {}: {}", cli.source.display(), e);
            std::process::exit(2);
        }
    };

    let mut graph = match nncc::loader::load(&source, &registry) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("nncc: {}", e);
            std::process::exit(1);
        }
    };
    if cli.verbose {
        eprintln!(
            "nncc: loaded graph '{}': {} tensors, {} nodes",
            graph.name,
            graph.tensors.len(),
            graph.nodes.len()
        );
    }

    if matches!(cli.emit, EmitStage::BuildInfo) {
        print!("{}", graph.provenance.to_json());
        return;
    }

    // ── Compile ──
    let generated = match nncc::codegen::codegen(&mut graph) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("nncc: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = std::fs::write(&cli.output, &generated.c_source) {
        eprintln!("nncc: error: {}: {}", cli.output.display(), e);
        std::process::exit(2);
    }
    if cli.verbose {
        eprintln!("nncc: wrote {}", cli.output.display());
    }
}
